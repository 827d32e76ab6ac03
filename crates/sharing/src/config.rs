//! Runtime configuration

use obliv_fixed_point::DEFAULT_SCALE;

/// Configuration for the in-process runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Fixed-point scale (fractional bits) of every secret value
    pub scale: u8,

    /// Seed for share randomness and the triple dealer; random when unset
    pub seed: Option<u64>,

    /// Beaver triples generated per dealer refill
    pub triple_batch: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            seed: None,
            triple_batch: 256,
        }
    }
}

impl RuntimeConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(scale) = std::env::var("OBLIV_SCALE") {
            if let Ok(s) = scale.parse() {
                config.scale = s;
            }
        }

        if let Ok(seed) = std::env::var("OBLIV_SEED") {
            if let Ok(s) = seed.parse() {
                config.seed = Some(s);
            }
        }

        if let Ok(batch) = std::env::var("OBLIV_TRIPLE_BATCH") {
            if let Ok(b) = batch.parse() {
                config.triple_batch = b;
            }
        }

        config
    }

    /// Same config with a fixed seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Same config with another scale
    pub fn with_scale(mut self, scale: u8) -> Self {
        self.scale = scale;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.scale, DEFAULT_SCALE);
        assert_eq!(config.seed, None);
        assert_eq!(config.triple_batch, 256);
    }

    #[test]
    fn test_builders() {
        let config = RuntimeConfig::default().with_seed(9).with_scale(16);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.scale, 16);
    }

    #[test]
    fn test_from_env_invalid_values_fall_back() {
        std::env::set_var("OBLIV_SCALE", "twenty");
        std::env::set_var("OBLIV_SEED", "-3");
        std::env::set_var("OBLIV_TRIPLE_BATCH", "64");
        let config = RuntimeConfig::from_env();
        std::env::remove_var("OBLIV_SCALE");
        std::env::remove_var("OBLIV_SEED");
        std::env::remove_var("OBLIV_TRIPLE_BATCH");

        assert_eq!(config.scale, DEFAULT_SCALE);
        assert_eq!(config.seed, None);
        assert_eq!(config.triple_batch, 64);
    }
}
