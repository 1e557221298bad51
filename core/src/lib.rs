pub mod bar;
pub mod config;
pub mod encounter;
pub mod engine;
pub mod equalizer;
pub mod proximity;
pub mod signal;
pub mod sync;
pub mod targeting;
pub mod world;


// Re-exports for convenience
pub use bar::{BarHandle, BarId, BarKind, BarSource, ProgressionSource};
pub use config::{ConfigError, ScalingConfigExt};
pub use encounter::{ComboKey, Encounter, EncounterRegistry, WeaponSig};
pub use engine::{ScalingEngine, TickOutput, SPAWN_GRACE_TICKS};
pub use equalizer::DeathEqualizer;
pub use proximity::{expected_players_factor, ProximityIndex};
pub use signal::ScalingSignal;
pub use sync::{ObserverCache, SyncMessage, WireError};
pub use targeting::{SteeringDecision, TargetingPass};
pub use tempo_types::{
    AdaptationConfig, DamageConfig, GroupConfig, PaceConfig, PlayerTuning, ScalingConfig,
    TargetingConfig,
};
pub use world::{
    BossView, EntityId, PlayerId, PlayerView, Position, RunMode, WorldSnapshot, TICKS_PER_MINUTE,
    TICKS_PER_SECOND,
};
