use crate::input::Input;
use rand::Rng;
use rand_core::RngCore;

#[derive(Debug, Clone)]
struct Slot<I> {
    cumulative: f64,
    score: f64,
    input: I,
}

/// Prefix sums of scores over the stored inputs, in insertion order.
///
/// Slot `i` holds the sum of the scores of slots `0..=i`, so the sequence is
/// non-decreasing and the last value is the corpus total. A draw of `target` in
/// `[0, total)` selects the first slot whose cumulative value reaches `target`, which
/// makes every input's selection probability proportional to its score.
#[derive(Debug, Clone)]
pub struct SamplingIndex<I: Input> {
    slots: Vec<Slot<I>>,
}

impl<I: Input> SamplingIndex<I> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Cumulative score of the last slot, or zero when empty.
    pub fn total(&self) -> f64 {
        self.slots.last().map_or(0.0, |slot| slot.cumulative)
    }

    /// Input stored in slot `index`, if any.
    pub fn get(&self, index: usize) -> Option<&I> {
        self.slots.get(index).map(|slot| &slot.input)
    }

    /// Score committed for slot `index`, if any.
    pub fn score(&self, index: usize) -> Option<f64> {
        self.slots.get(index).map(|slot| slot.score)
    }

    /// Inputs in slot order. Each call starts a fresh pass.
    pub fn inputs(&self) -> impl ExactSizeIterator<Item = &I> + '_ {
        self.slots.iter().map(|slot| &slot.input)
    }

    /// Cumulative scores in slot order; non-decreasing.
    pub fn cumulative_scores(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.slots.iter().map(|slot| slot.cumulative)
    }

    /// Appends `input` with `score` and returns its slot index.
    pub(crate) fn push(&mut self, input: I, score: f64) -> usize {
        let index = self.slots.len();
        let cumulative = self.total() + score;
        self.slots.push(Slot {
            cumulative,
            score,
            input,
        });
        index
    }

    /// Cumulative value of the slot before `index`, or zero for the first slot.
    fn prefix_before(&self, index: usize) -> f64 {
        match index.checked_sub(1) {
            Some(prev) => self.slots[prev].cumulative,
            None => 0.0,
        }
    }

    /// Total the index would have if slot `index` were committed with `score`.
    ///
    /// Folds the same additions `replace` performs, so the result is bit-identical
    /// to `total()` after that replace.
    pub(crate) fn total_after_replace(&self, index: usize, score: f64) -> f64 {
        let start = self.prefix_before(index) + score;
        self.slots[index + 1..]
            .iter()
            .fold(start, |acc, slot| acc + slot.score)
    }

    /// Swaps the input at `index` for `input` committed with `score`, and rebuilds
    /// the cumulative values of that slot and every later one from their own scores.
    ///
    /// Later slots are recomputed, never shifted by a delta. O(n) in the number of
    /// slots after `index`.
    ///
    /// # Returns
    /// The input that was replaced.
    pub(crate) fn replace(&mut self, index: usize, input: I, score: f64) -> I {
        let mut cumulative = self.prefix_before(index);
        let slot = &mut self.slots[index];
        slot.score = score;
        let previous = std::mem::replace(&mut slot.input, input);
        for slot in &mut self.slots[index..] {
            cumulative += slot.score;
            slot.cumulative = cumulative;
        }
        previous
    }

    /// Index of the first slot whose cumulative score is `>= target`.
    ///
    /// Binary search over the non-decreasing sequence; picks the same slot a linear
    /// first-match scan would. A target past the end selects the last slot.
    pub fn position(&self, target: f64) -> Option<usize> {
        if self.slots.is_empty() {
            return None;
        }
        let index = self.slots.partition_point(|slot| slot.cumulative < target);
        Some(index.min(self.slots.len() - 1))
    }

    /// Deterministic selection for a fixed draw value.
    pub fn pick_at(&self, target: f64) -> Option<&I> {
        self.position(target).map(|index| &self.slots[index].input)
    }

    /// Draws `target` uniformly from `[0, total)` and selects the matching slot.
    pub fn sample(&self, rng: &mut dyn RngCore) -> Option<&I> {
        if self.slots.is_empty() {
            return None;
        }
        let total = self.total();
        let target = if total > 0.0 {
            rng.random::<f64>() * total
        } else {
            0.0
        };
        log::trace!("Weighted draw target {target} of total {total}");
        self.pick_at(target)
    }
}

impl<I: Input> Default for SamplingIndex<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// Chooses the next seed to mutate from the sampling index.
pub trait Scheduler<I: Input>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the selected input, or `None` if the index is empty.
    fn next<'a>(&mut self, index: &'a SamplingIndex<I>, rng: &mut dyn RngCore) -> Option<&'a I>;
}

/// Selects inputs with probability proportional to their score.
#[derive(Default, Debug)]
pub struct WeightedScheduler;

impl WeightedScheduler {
    pub fn new() -> Self {
        WeightedScheduler
    }
}

impl<I: Input> Scheduler<I> for WeightedScheduler {
    fn name(&self) -> &'static str {
        "WeightedScheduler"
    }

    fn next<'a>(&mut self, index: &'a SamplingIndex<I>, rng: &mut dyn RngCore) -> Option<&'a I> {
        index.sample(rng)
    }
}

/// Selects inputs uniformly, ignoring scores.
#[derive(Default, Debug)]
pub struct RandomScheduler;

impl RandomScheduler {
    pub fn new() -> Self {
        RandomScheduler
    }
}

impl<I: Input> Scheduler<I> for RandomScheduler {
    fn name(&self) -> &'static str {
        "RandomScheduler"
    }

    fn next<'a>(&mut self, index: &'a SamplingIndex<I>, rng: &mut dyn RngCore) -> Option<&'a I> {
        if index.is_empty() {
            return None;
        }
        let slot = rng.random_range(0..index.len());
        index.get(slot)
    }
}
