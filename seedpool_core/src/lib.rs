pub mod config;
pub mod corpus;
pub mod input;
pub mod literals;
pub mod scheduler;
pub mod score;
pub mod shared;

pub use config::{
    CorpusConfig, NegativeScorePolicy, SchedulerConfig, SchedulerStrategy, SeedpoolConfig,
};
pub use corpus::{Corpus, CorpusError, CorpusStats, UpsertOutcome};
pub use input::{ExecutionSummary, Fingerprint, Input, Testcase, performance_score};
pub use literals::{LiteralRegistry, LiteralSink};
pub use scheduler::{RandomScheduler, SamplingIndex, Scheduler, WeightedScheduler};
pub use score::{Aggregates, ScoreEvaluator};
pub use shared::SharedCorpus;
