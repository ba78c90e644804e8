use std::fmt;
use std::time::Duration;

/// Content-derived identity of a test input.
///
/// Two inputs with the same fingerprint are treated as the same input by the corpus,
/// even if their payloads differ (a digest collision).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Fingerprint(pub [u8; 16]);

impl Fingerprint {
    /// Computes the MD5 digest of `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        Fingerprint(md5::compute(bytes).0)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

/// An executed test input as seen by the corpus.
///
/// Implementors carry the payload together with the summary the execution layer
/// produced for it. The corpus never runs targets itself; it only reads these values.
pub trait Input: Clone + Send + Sync + fmt::Debug + 'static {
    /// The raw payload handed to the target.
    fn as_bytes(&self) -> &[u8];

    /// Identity used for deduplication.
    fn fingerprint(&self) -> Fingerprint;

    /// Number of distinct coverage features hit by this execution.
    fn coverage_size(&self) -> usize;

    /// Wall-clock duration of this execution.
    fn runtime(&self) -> Duration;

    /// Fitness of this input relative to the population.
    ///
    /// # Arguments
    /// * `avg_runtime`: Mean runtime over the inputs currently in the corpus.
    /// * `avg_coverage`: Mean coverage size over the inputs currently in the corpus.
    ///
    /// Both averages are zero for an empty corpus.
    fn score(&self, avg_runtime: Duration, avg_coverage: f64) -> f64;

    /// The sentinel returned when no seed is available: empty payload, zeroed summary.
    fn zero() -> Self;

    fn len(&self) -> usize {
        self.as_bytes().len()
    }

    fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// What the execution layer reports about one run of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionSummary {
    pub fingerprint: Fingerprint,
    pub coverage_size: usize,
    pub runtime: Duration,
}

/// A byte payload paired with its execution summary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Testcase {
    data: Vec<u8>,
    summary: ExecutionSummary,
}

impl Testcase {
    /// Builds a testcase whose fingerprint is the digest of `data`.
    pub fn new(data: Vec<u8>, coverage_size: usize, runtime: Duration) -> Self {
        let fingerprint = Fingerprint::of(&data);
        Self {
            data,
            summary: ExecutionSummary {
                fingerprint,
                coverage_size,
                runtime,
            },
        }
    }

    /// Builds a testcase from a summary produced elsewhere; the fingerprint is trusted as-is.
    pub fn with_summary(data: Vec<u8>, summary: ExecutionSummary) -> Self {
        Self { data, summary }
    }

    pub fn summary(&self) -> &ExecutionSummary {
        &self.summary
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl Input for Testcase {
    fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn fingerprint(&self) -> Fingerprint {
        self.summary.fingerprint
    }

    fn coverage_size(&self) -> usize {
        self.summary.coverage_size
    }

    fn runtime(&self) -> Duration {
        self.summary.runtime
    }

    fn score(&self, avg_runtime: Duration, avg_coverage: f64) -> f64 {
        performance_score(
            self.summary.runtime,
            self.summary.coverage_size,
            avg_runtime,
            avg_coverage,
        )
    }

    fn zero() -> Self {
        Self::default()
    }
}

/// AFL-style performance score.
///
/// Starts from a runtime factor (fast inputs earn up to 300, slow ones drop to 10)
/// and scales it by how the coverage compares to the average (x0.25 up to x3).
/// A zero average leaves the corresponding factor neutral.
pub fn performance_score(
    runtime: Duration,
    coverage_size: usize,
    avg_runtime: Duration,
    avg_coverage: f64,
) -> f64 {
    let runtime = runtime.as_secs_f64();
    let avg_runtime = avg_runtime.as_secs_f64();
    let coverage = coverage_size as f64;

    let mut score = if avg_runtime <= 0.0 {
        100.0
    } else if runtime * 0.1 > avg_runtime {
        10.0
    } else if runtime * 0.25 > avg_runtime {
        25.0
    } else if runtime * 0.5 > avg_runtime {
        50.0
    } else if runtime * 0.75 > avg_runtime {
        75.0
    } else if runtime * 4.0 < avg_runtime {
        300.0
    } else if runtime * 3.0 < avg_runtime {
        200.0
    } else if runtime * 2.0 < avg_runtime {
        150.0
    } else {
        100.0
    };

    if avg_coverage > 0.0 {
        if coverage * 0.3 > avg_coverage {
            score *= 3.0;
        } else if coverage * 0.5 > avg_coverage {
            score *= 2.0;
        } else if coverage * 0.75 > avg_coverage {
            score *= 1.5;
        } else if coverage * 3.0 < avg_coverage {
            score *= 0.25;
        } else if coverage * 2.0 < avg_coverage {
            score *= 0.5;
        } else if coverage * 1.5 < avg_coverage {
            score *= 0.75;
        }
    }

    score
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;

    /// Input whose score is `coverage - runtime_ms`, independent of the averages.
    #[derive(Debug, Clone, PartialEq)]
    pub struct LinearInput {
        pub key: &'static str,
        pub coverage: usize,
        pub runtime_ms: u64,
    }

    impl LinearInput {
        pub fn new(key: &'static str, coverage: usize, runtime_ms: u64) -> Self {
            Self {
                key,
                coverage,
                runtime_ms,
            }
        }
    }

    impl Input for LinearInput {
        fn as_bytes(&self) -> &[u8] {
            self.key.as_bytes()
        }
        fn fingerprint(&self) -> Fingerprint {
            Fingerprint::of(self.key.as_bytes())
        }
        fn coverage_size(&self) -> usize {
            self.coverage
        }
        fn runtime(&self) -> Duration {
            Duration::from_millis(self.runtime_ms)
        }
        fn score(&self, _avg_runtime: Duration, _avg_coverage: f64) -> f64 {
            self.coverage as f64 - self.runtime_ms as f64
        }
        fn zero() -> Self {
            Self::new("", 0, 0)
        }
    }

    /// Input with a fixed score, for sampling tests.
    #[derive(Debug, Clone, PartialEq)]
    pub struct FixedScore {
        pub key: String,
        pub score: f64,
    }

    impl FixedScore {
        pub fn new(key: impl Into<String>, score: f64) -> Self {
            Self {
                key: key.into(),
                score,
            }
        }
    }

    impl Input for FixedScore {
        fn as_bytes(&self) -> &[u8] {
            self.key.as_bytes()
        }
        fn fingerprint(&self) -> Fingerprint {
            Fingerprint::of(self.key.as_bytes())
        }
        fn coverage_size(&self) -> usize {
            0
        }
        fn runtime(&self) -> Duration {
            Duration::ZERO
        }
        fn score(&self, _avg_runtime: Duration, _avg_coverage: f64) -> f64 {
            self.score
        }
        fn zero() -> Self {
            Self::new("", 0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testcase_fingerprint_is_payload_digest() {
        let a = Testcase::new(b"GOOD".to_vec(), 3, Duration::from_millis(1));
        let b = Testcase::new(b"GOOD".to_vec(), 9, Duration::from_millis(7));
        let c = Testcase::new(b"BAD".to_vec(), 3, Duration::from_millis(1));
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint(), Fingerprint::of(b"GOOD"));
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn fingerprint_displays_as_lowercase_hex() {
        let fp = Fingerprint::of(b"");
        assert_eq!(fp.to_string(), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(format!("{fp:?}"), "Fingerprint(d41d8cd98f00b204e9800998ecf8427e)");
    }

    #[test]
    fn zero_testcase_is_neutral() {
        let zero = Testcase::zero();
        assert!(zero.is_empty());
        assert_eq!(zero.coverage_size(), 0);
        assert_eq!(zero.runtime(), Duration::ZERO);
    }

    #[test]
    fn performance_score_is_neutral_without_averages() {
        let score = performance_score(Duration::from_millis(50), 10, Duration::ZERO, 0.0);
        assert_eq!(score, 100.0);
    }

    #[test]
    fn performance_score_rewards_fast_inputs_and_punishes_slow_ones() {
        let avg = Duration::from_millis(100);
        assert_eq!(performance_score(Duration::from_millis(10), 0, avg, 0.0), 300.0);
        assert_eq!(performance_score(Duration::from_millis(30), 0, avg, 0.0), 200.0);
        assert_eq!(performance_score(Duration::from_millis(45), 0, avg, 0.0), 150.0);
        assert_eq!(performance_score(Duration::from_millis(100), 0, avg, 0.0), 100.0);
        assert_eq!(performance_score(Duration::from_millis(150), 0, avg, 0.0), 75.0);
        assert_eq!(performance_score(Duration::from_secs(2), 0, avg, 0.0), 10.0);
    }

    #[test]
    fn performance_score_scales_with_relative_coverage() {
        let avg = Duration::from_millis(100);
        let at_avg_runtime = Duration::from_millis(100);
        assert_eq!(performance_score(at_avg_runtime, 40, avg, 10.0), 300.0);
        assert_eq!(performance_score(at_avg_runtime, 10, avg, 10.0), 100.0);
        assert_eq!(performance_score(at_avg_runtime, 2, avg, 10.0), 25.0);
    }
}
