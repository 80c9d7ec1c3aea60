//! Quality assessment of in-flight work.
//!
//! An advisor scores the current state of a phase from its execution
//! context. The score feeds the completion check: below the configured
//! floor, completion is refused with a `QualityStandardsViolation` even if
//! every criterion is met. Assessments can be expensive, so a caching
//! wrapper reuses recent results per phase.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::phase::Phase;

/// How long a cached assessment stays valid.
pub const QUALITY_CACHE_TTL: Duration = Duration::from_secs(600);

/// Score floor below which completion is refused.
pub const DEFAULT_QUALITY_FLOOR: u8 = 40;

/// What the advisor sees about the phase being assessed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub phase: Phase,
    pub task: String,
    pub iteration_count: u32,
    pub files_modified: u64,
    /// Most recent failure descriptions, newest last
    pub recent_failures: Vec<String>,
}

/// A quality verdict: score from 0 (hopeless) to 100 (clean).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub score: u8,
    pub risks: Vec<String>,
}

impl QualityAssessment {
    pub fn meets_floor(&self, floor: u8) -> bool {
        self.score >= floor
    }
}

/// Abstraction over quality assessment for pluggable advisors.
/// Real implementation: `HeuristicAdvisor`. Wrap with `CachedAdvisor` to
/// reuse recent assessments.
pub trait QualityAdvisor: Send + Sync {
    fn assess(&self, context: &ExecutionContext) -> QualityAssessment;
}

/// Scores by counting what has gone wrong so far.
///
/// Starts at 100, subtracts 10 per recent failure and 5 per iteration
/// beyond the first, floored at 0. No I/O, deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAdvisor;

impl HeuristicAdvisor {
    pub fn new() -> Self {
        Self
    }
}

impl QualityAdvisor for HeuristicAdvisor {
    fn assess(&self, context: &ExecutionContext) -> QualityAssessment {
        let failure_penalty = 10u32.saturating_mul(context.recent_failures.len() as u32);
        let extra_iterations = context.iteration_count.saturating_sub(1);
        let iteration_penalty = 5u32.saturating_mul(extra_iterations);
        let score = 100u32
            .saturating_sub(failure_penalty)
            .saturating_sub(iteration_penalty) as u8;

        let mut risks = Vec::new();
        if !context.recent_failures.is_empty() {
            risks.push(format!(
                "{} recent failure(s) in {}",
                context.recent_failures.len(),
                context.phase
            ));
        }
        if extra_iterations > 0 {
            risks.push(format!(
                "{} retried this phase {} time(s)",
                context.phase, extra_iterations
            ));
        }
        if context.files_modified > 20 {
            risks.push(format!(
                "Large change surface: {} files modified",
                context.files_modified
            ));
        }

        QualityAssessment { score, risks }
    }
}

struct CachedAssessment {
    assessment: QualityAssessment,
    assessed_at: Instant,
}

/// Caches an advisor's assessments per phase with a TTL.
pub struct CachedAdvisor<A> {
    inner: A,
    ttl: Duration,
    cache: Mutex<HashMap<Phase, CachedAssessment>>,
}

impl<A: QualityAdvisor> CachedAdvisor<A> {
    pub fn new(inner: A) -> Self {
        Self::with_ttl(inner, QUALITY_CACHE_TTL)
    }

    pub fn with_ttl(inner: A, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Drop all cached assessments.
    pub fn invalidate(&self) {
        self.lock_cache().clear();
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<Phase, CachedAssessment>> {
        // the cache only holds score snapshots; keep it on poison
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<A: QualityAdvisor> QualityAdvisor for CachedAdvisor<A> {
    fn assess(&self, context: &ExecutionContext) -> QualityAssessment {
        let mut cache = self.lock_cache();
        if let Some(entry) = cache.get(&context.phase) {
            if entry.assessed_at.elapsed() < self.ttl {
                return entry.assessment.clone();
            }
        }
        let assessment = self.inner.assess(context);
        cache.insert(
            context.phase,
            CachedAssessment {
                assessment: assessment.clone(),
                assessed_at: Instant::now(),
            },
        );
        assessment
    }
}
