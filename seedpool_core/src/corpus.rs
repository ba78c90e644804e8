use crate::config::CorpusConfig;
use crate::input::{Fingerprint, Input};
use crate::literals::{LiteralRegistry, LiteralSink};
use crate::scheduler::{SamplingIndex, Scheduler};
use crate::score::{Aggregates, ScoreEvaluator};
use rand_core::RngCore;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Defines errors that can arise during corpus operations.
///
/// Every operation is total over well-formed inputs; these errors only surface
/// contract violations by the caller, and a failed call leaves the corpus untouched.
#[derive(Error, Debug)]
pub enum CorpusError {
    /// The input could not be committed: its score is NaN or infinite, or a corpus sum
    /// would overflow.
    #[error("Input {fingerprint} is invalid: {reason}")]
    InvalidInput {
        fingerprint: Fingerprint,
        reason: String,
    },

    /// The input scored below zero and the corpus is configured to reject such inputs.
    #[error("Input {fingerprint} has negative score {score}")]
    NegativeScore { fingerprint: Fingerprint, score: f64 },

    /// A writer panicked while holding the shared corpus lock.
    #[error("Corpus lock poisoned by a panicking writer")]
    LockPoisoned,
}

/// What `Corpus::upsert` did with an input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpsertOutcome {
    /// The fingerprint was new; the input was appended.
    Inserted,
    /// The fingerprint was known; the stored input was replaced in place.
    Replaced { previous_score: f64 },
}

/// Point-in-time figures for reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorpusStats {
    /// Number of stored inputs.
    pub entries: usize,
    /// Sum of committed scores.
    pub total_score: f64,
    /// Mean runtime over stored inputs (zero when empty).
    pub average_runtime: Duration,
    /// Mean coverage size over stored inputs (zero when empty).
    pub average_coverage: f64,
    /// Number of distinct literals recorded.
    pub literals: usize,
}

#[derive(Debug, Clone, Copy)]
struct CorpusEntry {
    /// Slot in the sampling index holding this fingerprint's input and its committed
    /// score.
    index_in_running: usize,
}

/// The set of inputs worth keeping, deduplicated by fingerprint and sampled by score.
///
/// Owns the dedup index, the weighted sampling index, the running aggregates the
/// score evaluator averages over, and the literal registry together with the sink the
/// new literals are forwarded to. All of it lives for one fuzzing run; nothing is
/// global.
///
/// Mutating operations take `&mut self`. Wrap the corpus in a
/// [`SharedCorpus`](crate::shared::SharedCorpus) to use it from several workers.
///
/// # Type Parameters
/// * `I`: The stored input type.
/// * `L`: The mutation engine's literal sink.
#[derive(Debug)]
pub struct Corpus<I: Input, L: LiteralSink = Vec<String>> {
    store: HashMap<Fingerprint, CorpusEntry>,
    running: SamplingIndex<I>,
    aggregates: Aggregates,
    evaluator: ScoreEvaluator,
    literals: LiteralRegistry,
    literal_sink: L,
    zero: I,
}

impl<I: Input, L: LiteralSink> Corpus<I, L> {
    /// Creates an empty corpus that forwards new literals to `literal_sink`.
    pub fn new(literal_sink: L) -> Self {
        Self::with_config(&CorpusConfig::default(), literal_sink)
    }

    /// Creates an empty corpus.
    ///
    /// # Arguments
    /// * `config` - Negative-score policy applied when scoring inputs.
    /// * `literal_sink` - Receives literals passed to `found_literals` that were not seen
    ///   before.
    pub fn with_config(config: &CorpusConfig, literal_sink: L) -> Self {
        Self {
            store: HashMap::new(),
            running: SamplingIndex::new(),
            aggregates: Aggregates::default(),
            evaluator: ScoreEvaluator::new(config.negative_scores),
            literals: LiteralRegistry::new(),
            literal_sink,
            zero: I::zero(),
        }
    }

    /// Scores `input` against the current corpus averages without storing it.
    pub fn score_input(&self, input: &I) -> Result<f64, CorpusError> {
        self.evaluator.evaluate(input, &self.aggregates)
    }

    /// Returns whether `candidate` would be worth storing.
    ///
    /// True if its fingerprint is unknown, or if it scores strictly higher than the
    /// stored input with the same fingerprint, both scored against the current
    /// averages. Has no side effects, so callers can run it before spending effort
    /// (e.g. minimization) on a candidate.
    pub fn is_interested_in(&self, candidate: &I) -> Result<bool, CorpusError> {
        let candidate_score = self.score_input(candidate)?;
        let interested = match self.get(&candidate.fingerprint()) {
            None => true,
            Some(existing) => candidate_score > self.score_input(existing)?,
        };
        log::trace!(
            "Admission check for {}: score {candidate_score}, interested = {interested}",
            candidate.fingerprint()
        );
        Ok(interested)
    }

    /// Commits `input`, replacing the stored input with the same fingerprint if any.
    ///
    /// On replace, the new score is committed to the input's slot and the cumulative
    /// values from that slot on are rebuilt; the runtime and coverage sums move by the
    /// differences between the two inputs. On insert, the input is appended and its
    /// figures added to the sums. Every new sum is computed before anything is
    /// written, so a failed upsert leaves the corpus as it was.
    ///
    /// # Errors
    /// * The input's score is unusable (see [`ScoreEvaluator::evaluate`]).
    /// * `CorpusError::InvalidInput` if the total score would stop being finite or the
    ///   runtime or coverage sum would overflow.
    pub fn upsert(&mut self, input: I) -> Result<UpsertOutcome, CorpusError> {
        let fingerprint = input.fingerprint();
        let score = self.score_input(&input)?;
        let runtime = input.runtime();
        let coverage_size = input.coverage_size();

        match self.store.get(&fingerprint).copied() {
            Some(CorpusEntry { index_in_running }) => {
                let (previous_score, old) = match (
                    self.running.score(index_in_running),
                    self.running.get(index_in_running),
                ) {
                    (Some(committed), Some(previous)) => {
                        (committed, (previous.runtime(), previous.coverage_size()))
                    }
                    _ => unreachable!("store points at slot {index_in_running} past the index"),
                };
                let total = self.running.total_after_replace(index_in_running, score);
                let aggregates =
                    self.aggregates
                        .replaced(fingerprint, total, old, (runtime, coverage_size))?;

                self.running.replace(index_in_running, input, score);
                self.aggregates = aggregates;
                log::debug!(
                    "Replaced input {fingerprint} in slot {index_in_running}: score {previous_score} -> {score}"
                );
                Ok(UpsertOutcome::Replaced { previous_score })
            }
            None => {
                let total = self.running.total() + score;
                let aggregates =
                    self.aggregates
                        .inserted(fingerprint, total, runtime, coverage_size)?;

                let index_in_running = self.running.push(input, score);
                self.aggregates = aggregates;
                self.store
                    .insert(fingerprint, CorpusEntry { index_in_running });
                log::debug!(
                    "Inserted input {fingerprint} in slot {index_in_running} with score {score}"
                );
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    /// Runs the admission check and commits `input` if it passes.
    ///
    /// # Returns
    /// `Some(outcome)` if the input was stored, `None` if it was not interesting.
    pub fn offer(&mut self, input: I) -> Result<Option<UpsertOutcome>, CorpusError> {
        if !self.is_interested_in(&input)? {
            return Ok(None);
        }
        self.upsert(input).map(Some)
    }

    /// Number of distinct fingerprints stored.
    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Returns whether an input with `fingerprint` is stored.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.store.contains_key(fingerprint)
    }

    /// The surviving input for `fingerprint`.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&I> {
        self.store
            .get(fingerprint)
            .and_then(|entry| self.running.get(entry.index_in_running))
    }

    /// All stored inputs in sampling-index order. Call again to restart.
    pub fn inputs(&self) -> impl ExactSizeIterator<Item = &I> + '_ {
        self.running.inputs()
    }

    /// Draws an input with probability proportional to its score.
    ///
    /// Returns the `I::zero()` sentinel when the corpus is empty; callers treat it as
    /// "no seed available".
    pub fn pick_weighted(&self, rng: &mut dyn RngCore) -> &I {
        self.try_pick_weighted(rng).unwrap_or(&self.zero)
    }

    /// Like [`Corpus::pick_weighted`], but returns `None` on an empty corpus.
    pub fn try_pick_weighted(&self, rng: &mut dyn RngCore) -> Option<&I> {
        self.running.sample(rng)
    }

    /// Selection for a fixed draw value in `[0, total_score)`.
    pub fn pick_at(&self, target: f64) -> Option<&I> {
        self.running.pick_at(target)
    }

    /// Asks `scheduler` for the next seed, falling back to the sentinel when empty.
    pub fn schedule(&self, scheduler: &mut dyn Scheduler<I>, rng: &mut dyn RngCore) -> &I {
        scheduler.next(&self.running, rng).unwrap_or(&self.zero)
    }

    /// Sum of the committed scores of every stored input.
    ///
    /// # Returns
    /// The last cumulative value of the sampling index, or `0.0` when empty.
    pub fn total_score(&self) -> f64 {
        self.aggregates.total_score
    }

    /// The running sums the score evaluator averages over.
    pub fn aggregates(&self) -> &Aggregates {
        &self.aggregates
    }

    /// Read access to the prefix sums, e.g. for a custom [`Scheduler`].
    pub fn sampling_index(&self) -> &SamplingIndex<I> {
        &self.running
    }

    /// Records constant values found during fuzzing and forwards the unseen ones to the
    /// literal sink.
    ///
    /// # Returns
    /// The number of literals forwarded.
    pub fn found_literals<S: AsRef<str>>(&mut self, literals: &[S]) -> usize {
        self.literals.forward(literals, &mut self.literal_sink)
    }

    /// Every literal recorded so far.
    pub fn literals(&self) -> &LiteralRegistry {
        &self.literals
    }

    pub fn literal_sink(&self) -> &L {
        &self.literal_sink
    }

    pub fn literal_sink_mut(&mut self) -> &mut L {
        &mut self.literal_sink
    }

    /// Snapshot of the corpus size, totals, averages and literal count.
    pub fn stats(&self) -> CorpusStats {
        CorpusStats {
            entries: self.len(),
            total_score: self.total_score(),
            average_runtime: self.aggregates.average_runtime(),
            average_coverage: self.aggregates.average_coverage(),
            literals: self.literals.len(),
        }
    }
}

impl<I: Input, L: LiteralSink + Default> Default for Corpus<I, L> {
    fn default() -> Self {
        Self::new(L::default())
    }
}
