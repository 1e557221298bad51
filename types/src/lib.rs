//! Shared configuration types for tempo
//!
//! This crate contains the serializable tunables consumed by the engine
//! (tempo-core) and by any host frontend that exposes them for editing.
//! The engine treats a loaded config as an immutable snapshot per read;
//! persistence lives in tempo-core behind `ScalingConfigExt`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// World-units per tile; ranges are configured in tiles and compared in
/// world units.
pub const UNITS_PER_TILE: f32 = 16.0;

/// Progression thresholds outside `[0, 30)` are treated as "not set".
const MAX_PROGRESSION_THRESHOLD: f32 = 30.0;

// ─────────────────────────────────────────────────────────────────────────────
// Serde Defaults
// ─────────────────────────────────────────────────────────────────────────────

fn default_target_minutes() -> u32 {
    4
}
fn default_dead_zone_divisor() -> f64 {
    5.0
}
fn default_scaling_constant() -> f64 {
    2.0
}
fn default_max_modifier() -> f64 {
    10.0
}
fn default_start_multiplier() -> f64 {
    2.0
}
fn default_complete_multiplier() -> f64 {
    4.0
}
fn default_min_damage() -> f64 {
    200.0
}
fn default_max_reduction() -> f32 {
    0.2
}
fn default_expected_players() -> u32 {
    1
}
fn default_scaling_multiplier() -> f32 {
    0.3
}
fn default_range_tiles() -> f32 {
    500.0
}
fn default_true() -> bool {
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// Top-Level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Full engine configuration snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScalingConfig {
    #[serde(default)]
    pub pace: PaceConfig,
    #[serde(default)]
    pub adaptation: AdaptationConfig,
    #[serde(default)]
    pub group: GroupConfig,
    #[serde(default)]
    pub targeting: TargetingConfig,
    #[serde(default)]
    pub damage: DamageConfig,
}

impl ScalingConfig {
    /// Clamp every section into its valid range. Called after every load so
    /// a hand-edited file can never push the control law out of bounds.
    pub fn normalize(&mut self) {
        self.pace.normalize();
        self.adaptation.normalize();
        self.group.normalize();
        self.damage.normalize();
    }
}

/// Fight-pace control law tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaceConfig {
    /// Designer-specified target fight duration in minutes. Zero disables
    /// all pace scaling.
    #[serde(default = "default_target_minutes")]
    pub target_minutes: u32,
    /// The dead zone is `target_minutes / dead_zone_divisor` minutes wide.
    #[serde(default = "default_dead_zone_divisor")]
    pub dead_zone_divisor: f64,
    /// Quadratic growth constant `k` in `1 + k * overshoot^2`.
    #[serde(default = "default_scaling_constant")]
    pub scaling_constant: f64,
    /// Hard cap for both the defense and offense modifier.
    #[serde(default = "default_max_modifier")]
    pub max_modifier: f64,
    /// Bosses whose progression value is below this are never scaled
    /// (0 = gate disabled).
    #[serde(default)]
    pub progression_threshold: f32,
}

impl Default for PaceConfig {
    fn default() -> Self {
        Self {
            target_minutes: default_target_minutes(),
            dead_zone_divisor: default_dead_zone_divisor(),
            scaling_constant: default_scaling_constant(),
            max_modifier: default_max_modifier(),
            progression_threshold: 0.0,
        }
    }
}

impl PaceConfig {
    pub fn enabled(&self) -> bool {
        self.target_minutes > 0
    }

    /// Target duration in simulation ticks (60 ticks/second).
    pub fn target_ticks(&self) -> f64 {
        f64::from(self.target_minutes) * 3600.0
    }

    pub fn dead_zone_minutes(&self) -> f64 {
        f64::from(self.target_minutes) / self.dead_zone_divisor
    }

    fn normalize(&mut self) {
        self.target_minutes = self.target_minutes.min(240);
        if self.dead_zone_divisor <= 0.0 {
            self.dead_zone_divisor = default_dead_zone_divisor();
        }
        self.scaling_constant = self.scaling_constant.clamp(0.1, 10.0);
        self.max_modifier = self.max_modifier.clamp(1.0, 100.0);
        self.progression_threshold = normalize_threshold(self.progression_threshold);
    }
}

/// Weapon-adaptation tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Running/median ratio at which the one-time warning fires.
    #[serde(default = "default_start_multiplier")]
    pub start_multiplier: f64,
    /// Running/median ratio at which a reduction factor is assigned.
    #[serde(default = "default_complete_multiplier")]
    pub complete_multiplier: f64,
    /// Running estimates below this never adapt, regardless of ratio.
    #[serde(default = "default_min_damage")]
    pub min_damage: f64,
    /// Largest damage reduction an adapted combo can receive.
    #[serde(default = "default_max_reduction")]
    pub max_reduction: f32,
    /// Allow adaptation against the lone contributor of a solo fight once
    /// the pace controller is already capped.
    #[serde(default)]
    pub adapt_to_solo: bool,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start_multiplier: default_start_multiplier(),
            complete_multiplier: default_complete_multiplier(),
            min_damage: default_min_damage(),
            max_reduction: default_max_reduction(),
            adapt_to_solo: false,
        }
    }
}

impl AdaptationConfig {
    fn normalize(&mut self) {
        self.start_multiplier = self.start_multiplier.clamp(1.0, 10.0);
        self.complete_multiplier = self.complete_multiplier.clamp(self.start_multiplier, 20.0);
        self.min_damage = self.min_damage.max(0.0);
        self.max_reduction = self.max_reduction.clamp(0.0, 1.0);
    }
}

/// Party-size scaling and proximity tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Party size the content was tuned for. With fewer nearby players,
    /// damage dealt to bosses shrinks and damage taken from them grows,
    /// quadratically in the shortfall, so small parties still face the
    /// intended difficulty.
    #[serde(default = "default_expected_players")]
    pub expected_players: u32,
    /// Strength of the expected-players shortfall penalty.
    #[serde(default = "default_scaling_multiplier")]
    pub scaling_multiplier: f32,
    /// Proximity range in tiles.
    #[serde(default = "default_range_tiles")]
    pub range_tiles: f32,
    /// Skip expected-players scaling entirely when any active boss falls
    /// below this progression value (0 = gate disabled).
    #[serde(default)]
    pub progression_threshold: f32,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            expected_players: default_expected_players(),
            scaling_multiplier: default_scaling_multiplier(),
            range_tiles: default_range_tiles(),
            progression_threshold: 0.0,
        }
    }
}

impl GroupConfig {
    /// Proximity range in world units.
    pub fn range(&self) -> f32 {
        self.range_tiles * UNITS_PER_TILE
    }

    fn normalize(&mut self) {
        self.expected_players = self.expected_players.clamp(1, 255);
        self.scaling_multiplier = self.scaling_multiplier.clamp(0.0, 10.0);
        if self.range_tiles <= 0.0 {
            self.range_tiles = default_range_tiles();
        }
        self.progression_threshold = normalize_threshold(self.progression_threshold);
    }
}

/// Aggro-bias tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetingConfig {
    /// Bias boss aggro toward the highest-health nearby player.
    #[serde(default)]
    pub target_highest_health: bool,
    /// Invalidate a boss target that converges on the lowest-health player.
    #[serde(default = "default_true")]
    pub invalidate_lowest: bool,
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            target_highest_health: false,
            invalidate_lowest: true,
        }
    }
}

/// Static per-player damage editing and death equalization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DamageConfig {
    /// Global damage-dealt ladder steps, `-10..=10` (each step is ×1.2).
    #[serde(default)]
    pub deal_damage: i32,
    /// Global damage-taken ladder steps, `-10..=10`.
    #[serde(default)]
    pub take_damage: i32,
    /// Derive a damage-taken multiplier from party death statistics during
    /// boss fights (see the equalizer module).
    #[serde(default)]
    pub equalize_deaths: bool,
    /// Per-player overrides keyed by player name; the `"default"` entry
    /// applies to anyone without a specific one.
    #[serde(default)]
    pub player_overrides: HashMap<String, PlayerTuning>,
}

impl DamageConfig {
    /// Resolve the override for a player, falling back to the `"default"`
    /// entry when no name-specific one exists.
    pub fn tuning_for(&self, player_name: &str) -> Option<&PlayerTuning> {
        self.player_overrides
            .get(player_name)
            .or_else(|| self.player_overrides.get("default"))
    }

    fn normalize(&mut self) {
        self.deal_damage = self.deal_damage.clamp(-10, 10);
        self.take_damage = self.take_damage.clamp(-10, 10);
        for tuning in self.player_overrides.values_mut() {
            tuning.deal_offset = tuning.deal_offset.clamp(-10, 10);
            tuning.take_offset = tuning.take_offset.clamp(-10, 10);
        }
    }
}

/// Per-player offsets layered on top of the global damage ladder.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerTuning {
    #[serde(default)]
    pub deal_offset: i32,
    #[serde(default)]
    pub take_offset: i32,
    /// Overrides the global `equalize_deaths` flag when set.
    #[serde(default)]
    pub equalize_deaths: Option<bool>,
}

fn normalize_threshold(value: f32) -> f32 {
    if (0.0..MAX_PROGRESSION_THRESHOLD).contains(&value) {
        value
    } else {
        0.0
    }
}
