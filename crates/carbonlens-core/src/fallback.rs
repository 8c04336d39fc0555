//! # Fallback Controller State
//!
//! Per-invocation bookkeeping for the enhanced pipeline.
//!
//! ```text
//! Normal ──(dependency fails)──► Degraded
//! ```
//!
//! Degraded is terminal for the invocation. The result still completes, with
//! each failed dependency replaced by its local default and listed in
//! [`CalculationResult::degraded`].

use crate::aggregator::RegionalFactor;
use crate::classifier::Classification;
use crate::confidence;
use crate::types::{ActivityCategory, Breakdown, CalculationResult, Dependency, EmissionUnit};
use serde::{Deserialize, Serialize};

pub const LAST_RESORT_EMISSIONS_G: f64 = 3.5;
pub const LAST_RESORT_INSIGHT: &str = "Basic calculation used due to AI service unavailability";
pub const LAST_RESORT_RECOMMENDATION: &str = "Enable AI features for personalized recommendations";

/// Pipeline health for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    #[default]
    Normal,
    Degraded,
}

/// Records which dependencies fell back during one invocation.
#[derive(Debug, Clone, Default)]
pub struct DegradationTracker {
    degraded: Vec<Dependency>,
}

impl DegradationTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a dependency as failed. Repeats are ignored.
    pub fn record(&mut self, dependency: Dependency) {
        if !self.degraded.contains(&dependency) {
            self.degraded.push(dependency);
        }
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        if self.degraded.is_empty() {
            PipelineState::Normal
        } else {
            PipelineState::Degraded
        }
    }

    /// Take a classification outcome, falling back to domain rules.
    pub fn classification<E>(
        &mut self,
        outcome: Result<Classification, E>,
        domain: &str,
    ) -> Classification {
        outcome.unwrap_or_else(|_| {
            self.record(Dependency::Classification);
            Classification::deterministic(domain)
        })
    }

    /// Take a regional-factor outcome, falling back to the reference grid.
    pub fn regional<E>(&mut self, outcome: Result<RegionalFactor, E>) -> RegionalFactor {
        outcome.unwrap_or_else(|_| {
            self.record(Dependency::RegionalFactor);
            RegionalFactor::reference()
        })
    }

    /// Stamp the failed dependencies onto a finished result.
    pub fn finish(self, result: &mut CalculationResult) {
        result.degraded = self.degraded;
    }

    #[must_use]
    pub fn dependencies(&self) -> &[Dependency] {
        &self.degraded
    }
}

/// The result returned when the pipeline itself fails.
#[must_use]
pub fn last_resort_result() -> CalculationResult {
    CalculationResult {
        emissions: LAST_RESORT_EMISSIONS_G,
        unit: EmissionUnit::G,
        confidence: confidence::LAST_RESORT.value(),
        factors: Vec::new(),
        recommendations: vec![LAST_RESORT_RECOMMENDATION.to_string()],
        breakdown: Some(Breakdown {
            device_energy: 1.5,
            network_transfer: 1.0,
            server_processing: 1.0,
            ai_processing: None,
        }),
        activity_type: Some(ActivityCategory::Other),
        insights: vec![LAST_RESORT_INSIGHT.to_string()],
        degraded: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_normal_and_degrades_once() {
        let mut tracker = DegradationTracker::new();
        assert_eq!(tracker.state(), PipelineState::Normal);

        tracker.record(Dependency::Insights);
        tracker.record(Dependency::Insights);
        assert_eq!(tracker.state(), PipelineState::Degraded);
        assert_eq!(tracker.dependencies(), &[Dependency::Insights]);
    }

    #[test]
    fn failed_outcomes_use_local_defaults() {
        let mut tracker = DegradationTracker::new();

        let classification = tracker.classification(Err::<Classification, _>("down"), "youtube.com");
        assert_eq!(classification.category, ActivityCategory::Streaming);

        let regional = tracker.regional(Err::<RegionalFactor, _>("timeout"));
        assert_eq!(regional, RegionalFactor::reference());

        assert_eq!(
            tracker.dependencies(),
            &[Dependency::Classification, Dependency::RegionalFactor]
        );
    }

    #[test]
    fn successful_outcomes_pass_through() {
        let mut tracker = DegradationTracker::new();
        let live = tracker.regional(Ok::<_, ()>(RegionalFactor::live(0.233)));
        assert!((live.factor - 0.233).abs() < f64::EPSILON);
        assert_eq!(tracker.state(), PipelineState::Normal);
    }

    #[test]
    fn last_resort_shape() {
        let result = last_resort_result();
        assert!((result.emissions - 3.5).abs() < f64::EPSILON);
        assert!((result.confidence - 0.3).abs() < f64::EPSILON);
        assert_eq!(result.activity_type, Some(ActivityCategory::Other));
        let breakdown = result.breakdown.expect("breakdown");
        assert!((breakdown.additive_total() - 3.5).abs() < f64::EPSILON);
        assert_eq!(result.insights.len(), 1);
        assert_eq!(result.recommendations.len(), 1);
    }
}
