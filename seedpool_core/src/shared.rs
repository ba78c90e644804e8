use crate::corpus::{Corpus, CorpusError, CorpusStats, UpsertOutcome};
use crate::input::Input;
use crate::literals::LiteralSink;
use rand_core::RngCore;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A corpus shared between fuzzing workers.
///
/// The whole corpus sits behind one lock, so every accepted input is applied as a
/// single atomic update. Reads (`len`, sampling, snapshots) share the lock; `upsert`,
/// `offer` and `found_literals` take it exclusively. Cloning is cheap and yields a
/// handle to the same corpus.
#[derive(Debug)]
pub struct SharedCorpus<I: Input, L: LiteralSink = Vec<String>> {
    inner: Arc<RwLock<Corpus<I, L>>>,
}

impl<I: Input, L: LiteralSink> Clone for SharedCorpus<I, L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I: Input, L: LiteralSink> SharedCorpus<I, L> {
    /// Moves `corpus` behind a shared lock.
    pub fn new(corpus: Corpus<I, L>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(corpus)),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Corpus<I, L>>, CorpusError> {
        self.inner.read().map_err(|_| CorpusError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Corpus<I, L>>, CorpusError> {
        self.inner.write().map_err(|_| CorpusError::LockPoisoned)
    }

    /// Number of distinct fingerprints stored.
    ///
    /// # Errors
    /// `CorpusError::LockPoisoned` if a writer panicked; the same holds for every
    /// method below.
    pub fn len(&self) -> Result<usize, CorpusError> {
        Ok(self.read()?.len())
    }

    /// Returns whether nothing is stored.
    pub fn is_empty(&self) -> Result<bool, CorpusError> {
        Ok(self.read()?.is_empty())
    }

    /// Sum of the committed scores; see [`Corpus::total_score`].
    pub fn total_score(&self) -> Result<f64, CorpusError> {
        Ok(self.read()?.total_score())
    }

    /// Snapshot of the corpus figures; see [`Corpus::stats`].
    pub fn stats(&self) -> Result<CorpusStats, CorpusError> {
        Ok(self.read()?.stats())
    }

    /// Admission check under the read lock; see [`Corpus::is_interested_in`].
    ///
    /// Another worker may commit between this check and a later `upsert`; use
    /// [`SharedCorpus::offer`] when both must happen together.
    pub fn is_interested_in(&self, candidate: &I) -> Result<bool, CorpusError> {
        self.read()?.is_interested_in(candidate)
    }

    /// Commits `input` under the write lock; see [`Corpus::upsert`].
    ///
    /// # Returns
    /// Whether the input was inserted or replaced a stored one.
    pub fn upsert(&self, input: I) -> Result<UpsertOutcome, CorpusError> {
        self.write()?.upsert(input)
    }

    /// Admission check and commit under one write lock, so no other worker can slip a
    /// better input in between.
    pub fn offer(&self, input: I) -> Result<Option<UpsertOutcome>, CorpusError> {
        self.write()?.offer(input)
    }

    /// Records literals and forwards the unseen ones; see [`Corpus::found_literals`].
    ///
    /// # Returns
    /// The number of literals forwarded.
    pub fn found_literals<S: AsRef<str>>(&self, literals: &[S]) -> Result<usize, CorpusError> {
        Ok(self.write()?.found_literals(literals))
    }

    /// Weighted draw; returns a clone so the lock is released before mutation starts.
    pub fn pick_weighted(&self, rng: &mut dyn RngCore) -> Result<I, CorpusError> {
        Ok(self.read()?.pick_weighted(rng).clone())
    }

    /// Clones every stored input, in sampling-index order.
    pub fn snapshot(&self) -> Result<Vec<I>, CorpusError> {
        Ok(self.read()?.inputs().cloned().collect())
    }

    /// Runs `f` with shared access to the corpus.
    ///
    /// # Returns
    /// Whatever `f` returns.
    pub fn with_read<R>(&self, f: impl FnOnce(&Corpus<I, L>) -> R) -> Result<R, CorpusError> {
        let guard = self.read()?;
        Ok(f(&guard))
    }

    /// Runs `f` with exclusive access to the corpus. A panic inside `f` poisons the
    /// lock for every handle.
    pub fn with_write<R>(
        &self,
        f: impl FnOnce(&mut Corpus<I, L>) -> R,
    ) -> Result<R, CorpusError> {
        let mut guard = self.write()?;
        Ok(f(&mut guard))
    }
}

impl<I: Input, L: LiteralSink + Default> Default for SharedCorpus<I, L> {
    fn default() -> Self {
        Self::new(Corpus::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::test_utils::FixedScore;
    use crate::input::{Input, Testcase};
    use rand_chacha::ChaCha8Rng;
    use rand_core::SeedableRng;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn concurrent_workers_keep_prefix_sums_consistent() {
        let shared: SharedCorpus<FixedScore> = SharedCorpus::default();
        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let corpus = shared.clone();
                thread::spawn(move || {
                    let mut rng = ChaCha8Rng::seed_from_u64(worker);
                    for i in 0..250u32 {
                        let key = format!("input-{}", i % 50);
                        let score = f64::from((i + worker as u32) % 13);
                        corpus.upsert(FixedScore::new(key, score)).unwrap();
                        corpus.pick_weighted(&mut rng).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        shared
            .with_read(|corpus| {
                assert_eq!(corpus.len(), 50);
                let last = corpus
                    .sampling_index()
                    .cumulative_scores()
                    .last()
                    .unwrap();
                assert_eq!(last, corpus.total_score());
                let sum: f64 = corpus.inputs().map(|input| input.score).sum();
                assert_eq!(sum, corpus.total_score());
            })
            .unwrap();
    }

    #[test]
    fn offer_and_literals_through_shared_handle() {
        let shared: SharedCorpus<Testcase> = SharedCorpus::default();
        let input = Testcase::new(b"seed".to_vec(), 4, Duration::from_millis(2));

        assert!(shared.offer(input.clone()).unwrap().is_some());
        assert!(shared.offer(input.clone()).unwrap().is_none());
        assert_eq!(shared.len().unwrap(), 1);
        assert_eq!(shared.snapshot().unwrap(), vec![input]);

        assert_eq!(shared.found_literals(&["magic"]).unwrap(), 1);
        assert_eq!(shared.found_literals(&["magic"]).unwrap(), 0);
        assert_eq!(shared.stats().unwrap().literals, 1);
    }

    #[test]
    fn empty_shared_corpus_hands_out_sentinel() {
        let shared: SharedCorpus<Testcase> = SharedCorpus::default();
        let mut rng = ChaCha8Rng::from_seed([0; 32]);
        assert!(shared.is_empty().unwrap());
        assert_eq!(shared.pick_weighted(&mut rng).unwrap(), Testcase::zero());
        assert_eq!(shared.total_score().unwrap(), 0.0);
    }

    #[test]
    fn rejected_upsert_keeps_the_lock_usable() {
        let shared: SharedCorpus<Testcase> = SharedCorpus::default();
        shared
            .upsert(Testcase::new(b"a".to_vec(), 1, Duration::MAX))
            .unwrap();

        let err = shared
            .upsert(Testcase::new(b"b".to_vec(), 1, Duration::from_millis(1)))
            .unwrap_err();
        assert!(matches!(err, CorpusError::InvalidInput { .. }));

        assert_eq!(shared.len().unwrap(), 1);
        assert_eq!(shared.snapshot().unwrap().len(), 1);
    }

    #[test]
    fn poisoned_lock_is_reported() {
        let shared: SharedCorpus<Testcase> = SharedCorpus::default();
        let poisoner = shared.clone();
        let result = thread::spawn(move || {
            let _: Result<(), CorpusError> =
                poisoner.with_write(|_| panic!("worker crashed mid-update"));
        })
        .join();
        assert!(result.is_err());
        assert!(matches!(shared.len(), Err(CorpusError::LockPoisoned)));
    }
}
