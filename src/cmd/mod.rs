//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled                  |
//! |-----------|-----------------------------------|
//! | `catalog` | `Workflows`, `Phases`, `Guidance` |
//! | `config`  | `Config`                          |

pub mod catalog;
pub mod config;

pub use catalog::{cmd_guidance, cmd_phases, cmd_workflows};
pub use config::cmd_config;
