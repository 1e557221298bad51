//! Encounter state: the unit of aggregation for adaptive scaling.
//!
//! An encounter groups one or more boss entities that present a single
//! health bar. All mutation flows through [`registry::EncounterRegistry`];
//! other modules only read or operate on a borrowed `&mut Encounter` the
//! registry hands out.

pub mod adaptation;
pub mod pace;
pub mod registry;

pub use registry::EncounterRegistry;

use hashbrown::{HashMap, HashSet};

use crate::bar::BarHandle;
use crate::world::{EntityId, PlayerId};

/// Health buckets are 10 points wide; a fresh encounter sits at 100.
pub const FULL_HEALTH_BUCKET: i32 = 100;

/// Weapon half of the adaptation key, derived deterministically from the
/// damaging action: positive for an item, negative for a projectile-only
/// source, zero when nothing attributable triggered the hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeaponSig(pub i32);

impl WeaponSig {
    pub fn from_item(item_type: i32) -> Self {
        Self(item_type + 1)
    }

    /// Projectiles attribute to the owner's held item when one is known,
    /// so a weapon and the projectiles it fires share one signature.
    pub fn from_projectile(projectile_type: i32, held_item: Option<i32>) -> Self {
        match held_item {
            Some(item) if item >= 0 => Self::from_item(item),
            _ => Self(-(projectile_type + 1)),
        }
    }

    pub fn is_degenerate(self) -> bool {
        self.0 == 0
    }
}

/// Adaptation key: who dealt the damage, with what.
pub type ComboKey = (PlayerId, WeaponSig);

/// Aggregated state for one logical boss encounter.
#[derive(Debug, Clone)]
pub struct Encounter {
    pub id: u64,
    /// Boss entities currently mapped to this encounter.
    pub members: HashSet<EntityId>,
    /// The presentation bar all members share.
    pub bar: BarHandle,
    /// Last-read aggregated health (mirror of the bar collaborator).
    pub total_life: f32,
    pub total_life_max: f32,
    pub spawn_tick: u64,
    /// Last downward-crossed health bucket, `[0, 100]` step 10.
    pub last_bucket: i32,
    /// Damage divisor on the boss when the fight runs short (≥ 1.0).
    pub defense_modifier: f64,
    /// Damage multiplier for players when the fight runs long (≥ 1.0).
    pub offense_modifier: f64,
    pub last_sent_defense: f64,
    pub last_sent_offense: f64,
    /// Signed pace error in minutes from the last bucket crossing.
    pub last_time_difference: f64,
    /// Set once at creation, immutable for the encounter's life.
    pub scaling_disabled: bool,
    pub deaths_this_fight: u32,
    /// Damage per combo since the last bucket crossing.
    pub phase_damage: HashMap<ComboKey, f64>,
    /// Exponentially smoothed per-combo damage estimate.
    pub running_damage: HashMap<ComboKey, f64>,
    /// Assigned reduction factors; values only ever tighten.
    pub adaptation_factors: HashMap<ComboKey, f32>,
    /// Combos that already received the one-time adaptation warning.
    pub warned: HashSet<ComboKey>,
}

impl Encounter {
    pub fn new(id: u64, bar: BarHandle, spawn_tick: u64) -> Self {
        Self {
            id,
            members: HashSet::new(),
            bar,
            total_life: 0.0,
            total_life_max: 0.0,
            spawn_tick,
            last_bucket: FULL_HEALTH_BUCKET,
            defense_modifier: 1.0,
            offense_modifier: 1.0,
            last_sent_defense: 1.0,
            last_sent_offense: 1.0,
            last_time_difference: 0.0,
            scaling_disabled: false,
            deaths_this_fight: 0,
            phase_damage: HashMap::new(),
            running_damage: HashMap::new(),
            adaptation_factors: HashMap::new(),
            warned: HashSet::new(),
        }
    }

    /// Aggregated health fraction from the last bar read, if any.
    pub fn health_fraction(&self) -> Option<f64> {
        (self.total_life_max > 0.0)
            .then(|| f64::from(self.total_life) / f64::from(self.total_life_max))
    }

    /// Accumulate phase damage for a combo. Degenerate keys and
    /// non-positive amounts are ignored.
    pub fn record_phase_damage(&mut self, key: ComboKey, amount: f64) {
        if key.1.is_degenerate() || amount <= 0.0 {
            return;
        }
        *self.phase_damage.entry(key).or_insert(0.0) += amount;
    }

    pub fn adaptation_factor(&self, key: ComboKey) -> Option<f32> {
        self.adaptation_factors.get(&key).copied()
    }

    /// Neither modifier active: elapsed time is inside the dead zone.
    pub fn on_pace(&self) -> bool {
        self.defense_modifier <= 1.0 && self.offense_modifier <= 1.0
    }
}
