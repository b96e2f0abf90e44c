//! Verdict providers.
//!
//! A provider turns one audit request into a verdict or a provider error.
//! The orchestrator treats providers as opaque: the simulated provider and
//! any live integration are interchangeable behind [`VerdictProvider`].

use std::fmt;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use adaudit_config::DEFAULT_PASS_PROBABILITY;
use adaudit_utils::error::ProviderError;
use adaudit_utils::ids::{MaterialId, TaskId};
use adaudit_utils::types::{Verdict, ViolationTag};

/// Reason stamped on a `passed` verdict by the built-in providers.
pub const PASSED_REASON: &str = "Material approved: meets advertising standards";
/// Reason stamped on a `failed` verdict by the built-in providers.
pub const FAILED_REASON: &str = "Material rejected: content violates advertising policy";

/// What the provider is asked to evaluate.
#[derive(Debug, Clone, Copy)]
pub struct AuditRequest<'a> {
    pub task_id: TaskId,
    pub account_id: &'a str,
    pub material_id: &'a MaterialId,
    /// 1-based provider attempt for this task.
    pub attempt: u32,
}

/// A provider's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictDecision {
    pub verdict: Verdict,
    pub reason: String,
    /// Non-empty exactly when `verdict` is `failed`.
    pub violations: Vec<ViolationTag>,
}

impl VerdictDecision {
    #[must_use]
    pub fn passed() -> Self {
        Self {
            verdict: Verdict::Passed,
            reason: PASSED_REASON.to_string(),
            violations: Vec::new(),
        }
    }

    #[must_use]
    pub fn failed(violations: Vec<ViolationTag>) -> Self {
        Self {
            verdict: Verdict::Failed,
            reason: FAILED_REASON.to_string(),
            violations,
        }
    }
}

/// Source of verdicts.
///
/// Implementations must be callable from any thread. `evaluate` may block;
/// the orchestrator never calls it while holding its state lock.
pub trait VerdictProvider: Send + Sync + fmt::Debug {
    /// Evaluate one material for one task attempt.
    ///
    /// # Errors
    ///
    /// [`ProviderError::Transient`] when the call may succeed later,
    /// [`ProviderError::Permanent`] when it never will.
    fn evaluate(&self, request: &AuditRequest<'_>) -> Result<VerdictDecision, ProviderError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Weighted coin flip: `passed` with probability `pass_probability`,
/// otherwise `failed` carrying the configured violation tags.
pub struct SimulatedVerdictProvider {
    pass_probability: f64,
    violation_tags: Vec<ViolationTag>,
    rng: Mutex<StdRng>,
}

impl SimulatedVerdictProvider {
    /// `seed` makes the verdict sequence reproducible; `None` seeds from
    /// the OS. A non-finite probability falls back to the default.
    #[must_use]
    pub fn new(pass_probability: f64, violation_tags: Vec<ViolationTag>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let violation_tags = if violation_tags.is_empty() {
            vec![ViolationTag::ContentViolation, ViolationTag::PolicyBreach]
        } else {
            violation_tags
        };
        let pass_probability = if pass_probability.is_finite() {
            pass_probability.clamp(0.0, 1.0)
        } else {
            DEFAULT_PASS_PROBABILITY
        };
        Self {
            pass_probability,
            violation_tags,
            rng: Mutex::new(rng),
        }
    }

    #[must_use]
    pub fn pass_probability(&self) -> f64 {
        self.pass_probability
    }
}

impl fmt::Debug for SimulatedVerdictProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedVerdictProvider")
            .field("pass_probability", &self.pass_probability)
            .field("violation_tags", &self.violation_tags)
            .finish_non_exhaustive()
    }
}

impl VerdictProvider for SimulatedVerdictProvider {
    fn evaluate(&self, _request: &AuditRequest<'_>) -> Result<VerdictDecision, ProviderError> {
        let passed = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| ProviderError::Permanent("simulator rng poisoned".to_string()))?;
            rng.gen_bool(self.pass_probability)
        };
        Ok(if passed {
            VerdictDecision::passed()
        } else {
            VerdictDecision::failed(self.violation_tags.clone())
        })
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

/// Always returns the same verdict. Used for demos and tests that care
/// about lifecycle rather than distribution.
#[derive(Debug, Clone)]
pub struct FixedVerdictProvider {
    decision: VerdictDecision,
}

impl FixedVerdictProvider {
    /// A `failed` verdict carries the default violation tags.
    #[must_use]
    pub fn new(verdict: Verdict) -> Self {
        let decision = match verdict {
            Verdict::Passed => VerdictDecision::passed(),
            Verdict::Failed => VerdictDecision::failed(vec![
                ViolationTag::ContentViolation,
                ViolationTag::PolicyBreach,
            ]),
        };
        Self { decision }
    }

    #[must_use]
    pub fn with_decision(decision: VerdictDecision) -> Self {
        Self { decision }
    }
}

impl VerdictProvider for FixedVerdictProvider {
    fn evaluate(&self, _request: &AuditRequest<'_>) -> Result<VerdictDecision, ProviderError> {
        Ok(self.decision.clone())
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(material: &MaterialId) -> AuditRequest<'_> {
        AuditRequest {
            task_id: TaskId::new(1),
            account_id: "acct-1",
            material_id: material,
            attempt: 1,
        }
    }

    #[test]
    fn test_simulated_extremes_are_deterministic() {
        let material = MaterialId::parse("42").unwrap();
        let always = SimulatedVerdictProvider::new(1.0, vec![], Some(1));
        let never = SimulatedVerdictProvider::new(0.0, vec![ViolationTag::CopyrightIssue], Some(1));
        for _ in 0..50 {
            assert_eq!(always.evaluate(&request(&material)).unwrap().verdict, Verdict::Passed);
            let failed = never.evaluate(&request(&material)).unwrap();
            assert_eq!(failed.verdict, Verdict::Failed);
            assert_eq!(failed.violations, [ViolationTag::CopyrightIssue]);
        }
    }

    #[test]
    fn test_simulated_non_finite_probability_uses_default() {
        let material = MaterialId::parse("7").unwrap();
        for raw in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let provider = SimulatedVerdictProvider::new(raw, vec![], Some(3));
            assert_eq!(provider.pass_probability(), DEFAULT_PASS_PROBABILITY);
            assert!(provider.evaluate(&request(&material)).is_ok());
        }
        assert_eq!(SimulatedVerdictProvider::new(4.0, vec![], Some(3)).pass_probability(), 1.0);
    }

    #[test]
    fn test_simulated_same_seed_same_sequence() {
        let material = MaterialId::parse("42").unwrap();
        let a = SimulatedVerdictProvider::new(0.5, vec![], Some(99));
        let b = SimulatedVerdictProvider::new(0.5, vec![], Some(99));
        let run = |p: &SimulatedVerdictProvider| -> Vec<Verdict> {
            (0..32)
                .map(|_| p.evaluate(&request(&material)).unwrap().verdict)
                .collect()
        };
        assert_eq!(run(&a), run(&b));
    }

    #[test]
    fn test_simulated_failed_always_has_tags() {
        let material = MaterialId::parse("7").unwrap();
        let provider = SimulatedVerdictProvider::new(0.3, vec![], Some(5));
        for _ in 0..100 {
            let decision = provider.evaluate(&request(&material)).unwrap();
            assert_eq!(
                decision.verdict == Verdict::Failed,
                !decision.violations.is_empty()
            );
        }
    }

    #[test]
    fn test_simulated_distribution_tracks_probability() {
        let material = MaterialId::parse("7").unwrap();
        let provider = SimulatedVerdictProvider::new(0.7, vec![], Some(2024));
        let passed = (0..2_000)
            .filter(|_| provider.evaluate(&request(&material)).unwrap().verdict == Verdict::Passed)
            .count();
        assert!((1_250..=1_550).contains(&passed), "passed = {passed}");
    }

    #[test]
    fn test_probability_is_clamped() {
        assert!((SimulatedVerdictProvider::new(3.0, vec![], None).pass_probability() - 1.0).abs() < f64::EPSILON);
    }
}
