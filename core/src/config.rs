//! Config persistence on top of `confy`.
//!
//! [`ScalingConfig`] itself lives in `tempo-types` so embeddings can ship
//! it over their own channels; this module only adds disk round-tripping.
//! A missing or unreadable file falls back to defaults so the engine
//! always starts with something usable.

use thiserror::Error;

pub use tempo_types::{
    AdaptationConfig, DamageConfig, GroupConfig, PaceConfig, PlayerTuning, ScalingConfig,
    TargetingConfig,
};

const APP_NAME: &str = "tempo";
const CONFIG_NAME: &str = "scaling";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config")]
    Load(#[from] confy::ConfyError),
    #[error("failed to save config")]
    Save(#[source] confy::ConfyError),
}

pub trait ScalingConfigExt: Sized {
    /// Load from the platform config directory, normalizing out-of-range
    /// values. Falls back to defaults when the file is missing or
    /// unreadable.
    fn load() -> Self;

    fn store(&self) -> Result<(), ConfigError>;
}

impl ScalingConfigExt for ScalingConfig {
    fn load() -> Self {
        match confy::load::<ScalingConfig>(APP_NAME, CONFIG_NAME) {
            Ok(mut cfg) => {
                cfg.normalize();
                cfg
            }
            Err(err) => {
                tracing::warn!("using default config, load failed: {err}");
                ScalingConfig::default()
            }
        }
    }

    fn store(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)
    }
}
