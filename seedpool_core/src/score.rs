use crate::config::NegativeScorePolicy;
use crate::corpus::CorpusError;
use crate::input::{Fingerprint, Input};
use std::time::Duration;

/// Running sums over every input currently stored in a corpus.
///
/// They are kept in step with the sampling index after every upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Aggregates {
    /// Sum of committed scores; equals the last cumulative value of the sampling index.
    pub total_score: f64,
    /// Sum of stored inputs' runtimes.
    pub total_execution_time: Duration,
    /// Sum of stored inputs' coverage sizes.
    pub total_branch_coverage: u64,
    /// Number of stored inputs.
    pub entries: usize,
}

impl Aggregates {
    /// Mean runtime, dividing by `max(1, entries)`.
    pub fn average_runtime(&self) -> Duration {
        let divisor = u32::try_from(self.divisor()).unwrap_or(u32::MAX);
        self.total_execution_time / divisor
    }

    /// Mean coverage size, dividing by `max(1, entries)`.
    pub fn average_coverage(&self) -> f64 {
        self.total_branch_coverage as f64 / self.divisor() as f64
    }

    // The guard must be max(1, n): min(1, n) divides by 1 for any non-empty corpus
    // and by 0 for an empty one.
    fn divisor(&self) -> usize {
        self.entries.max(1)
    }

    /// The aggregates after adding one input, without modifying `self`.
    ///
    /// # Arguments
    /// * `fingerprint` - Identity of the input, reported on failure.
    /// * `total_score` - The sampling index total once the input is appended.
    /// * `runtime`, `coverage_size` - The input's execution summary.
    ///
    /// # Errors
    /// `CorpusError::InvalidInput` if the total score is not finite or a sum overflows.
    pub(crate) fn inserted(
        &self,
        fingerprint: Fingerprint,
        total_score: f64,
        runtime: Duration,
        coverage_size: usize,
    ) -> Result<Self, CorpusError> {
        Ok(Self {
            total_score: finite_total(fingerprint, total_score)?,
            total_execution_time: self
                .total_execution_time
                .checked_add(runtime)
                .ok_or_else(|| overflow(fingerprint, "total execution time"))?,
            total_branch_coverage: self
                .total_branch_coverage
                .checked_add(coverage_size as u64)
                .ok_or_else(|| overflow(fingerprint, "total branch coverage"))?,
            entries: self.entries + 1,
        })
    }

    /// The aggregates after swapping a stored input's summary `old` for `new`, without
    /// modifying `self`.
    ///
    /// # Errors
    /// `CorpusError::InvalidInput` if the total score is not finite or a sum overflows.
    pub(crate) fn replaced(
        &self,
        fingerprint: Fingerprint,
        total_score: f64,
        old: (Duration, usize),
        new: (Duration, usize),
    ) -> Result<Self, CorpusError> {
        let (old_runtime, old_coverage) = old;
        let (new_runtime, new_coverage) = new;
        Ok(Self {
            total_score: finite_total(fingerprint, total_score)?,
            total_execution_time: self
                .total_execution_time
                .saturating_sub(old_runtime)
                .checked_add(new_runtime)
                .ok_or_else(|| overflow(fingerprint, "total execution time"))?,
            total_branch_coverage: self
                .total_branch_coverage
                .saturating_sub(old_coverage as u64)
                .checked_add(new_coverage as u64)
                .ok_or_else(|| overflow(fingerprint, "total branch coverage"))?,
            entries: self.entries,
        })
    }
}

fn finite_total(fingerprint: Fingerprint, total_score: f64) -> Result<f64, CorpusError> {
    if total_score.is_finite() {
        Ok(total_score)
    } else {
        Err(overflow(fingerprint, "total score"))
    }
}

fn overflow(fingerprint: Fingerprint, what: &str) -> CorpusError {
    CorpusError::InvalidInput {
        fingerprint,
        reason: format!("{what} would overflow"),
    }
}

/// Turns an input plus the current aggregates into a validated score.
///
/// Pure: it never touches the aggregates, so it can be run against candidates
/// that have not been stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreEvaluator {
    negative_scores: NegativeScorePolicy,
}

impl ScoreEvaluator {
    /// Creates an evaluator applying `negative_scores` to scores below zero.
    pub fn new(negative_scores: NegativeScorePolicy) -> Self {
        Self { negative_scores }
    }

    /// The configured handling of negative scores.
    pub fn negative_scores(&self) -> NegativeScorePolicy {
        self.negative_scores
    }

    /// Scores `input` against the averages derived from `aggregates`.
    ///
    /// # Errors
    /// * `CorpusError::InvalidInput` if the input's score is NaN or infinite.
    /// * `CorpusError::NegativeScore` if the score is negative and the policy is
    ///   `NegativeScorePolicy::Reject`.
    pub fn evaluate<I: Input>(
        &self,
        input: &I,
        aggregates: &Aggregates,
    ) -> Result<f64, CorpusError> {
        let score = input.score(aggregates.average_runtime(), aggregates.average_coverage());
        if !score.is_finite() {
            return Err(CorpusError::InvalidInput {
                fingerprint: input.fingerprint(),
                reason: format!("score {score} is not finite"),
            });
        }
        if score < 0.0 {
            return match self.negative_scores {
                NegativeScorePolicy::Clamp => {
                    log::warn!(
                        "Clamping negative score {score} of input {} to zero",
                        input.fingerprint()
                    );
                    Ok(0.0)
                }
                NegativeScorePolicy::Reject => Err(CorpusError::NegativeScore {
                    fingerprint: input.fingerprint(),
                    score,
                }),
            };
        }
        Ok(score)
    }
}
