//! Events the engine surfaces to its embedding each tick.
//!
//! Signals are notifications, not commands: the embedding decides whether
//! to chat-log a pace swing, show an adaptation warning, or ignore the
//! whole stream.

use crate::encounter::WeaponSig;
use crate::world::{EntityId, PlayerId};

#[derive(Debug, Clone, PartialEq)]
pub enum ScalingSignal {
    EncounterCreated {
        encounter_id: u64,
        entity: EntityId,
        scaling_disabled: bool,
    },
    EncounterRemoved {
        encounter_id: u64,
    },
    /// Pace modifiers moved on a bucket crossing.
    PaceChanged {
        encounter_id: u64,
        bucket: i32,
        defense: f64,
        offense: f64,
        /// Minutes ahead (negative) or behind (positive) the ideal pace.
        time_difference_minutes: f64,
    },
    /// A weapon combo is dominating; reduction may follow.
    AdaptationWarning {
        encounter_id: u64,
        player: PlayerId,
        weapon: WeaponSig,
    },
    /// A weapon factor tightened.
    AdaptationApplied {
        encounter_id: u64,
        player: PlayerId,
        weapon: WeaponSig,
        factor: f32,
    },
}
