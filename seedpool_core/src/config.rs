use crate::input::Input;
use crate::scheduler::{RandomScheduler, Scheduler, WeightedScheduler};
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use serde::Deserialize;
use std::path::Path;

/// What the corpus does with an input whose score comes out below zero.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NegativeScorePolicy {
    /// Treat the score as zero; the input is stored but practically never sampled.
    #[default]
    Clamp,
    /// Refuse the input with `CorpusError::NegativeScore`.
    Reject,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct CorpusConfig {
    #[serde(default)]
    pub negative_scores: NegativeScorePolicy,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulerStrategy {
    #[default]
    Weighted,
    Random,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub strategy: SchedulerStrategy,
    /// Fixed seed for reproducible runs. Entropy-seeded when absent.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl SchedulerConfig {
    pub fn build_rng(&self) -> ChaCha8Rng {
        match self.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }

    pub fn build_scheduler<I: Input>(&self) -> Box<dyn Scheduler<I>> {
        match self.strategy {
            SchedulerStrategy::Weighted => Box::new(WeightedScheduler::new()),
            SchedulerStrategy::Random => Box::new(RandomScheduler::new()),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct SeedpoolConfig {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl SeedpoolConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        let config = Self::from_toml_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })?;

        log::info!("Loaded seedpool configuration from {path:?}");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
