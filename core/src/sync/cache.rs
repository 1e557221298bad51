//! Passive per-entity state mirrored on observers.
//!
//! The cache is only ever written from decoded host frames and only ever
//! read by the local damage hooks. Applying the same frame twice leaves it
//! unchanged, so redundant delivery is harmless.

use hashbrown::HashMap;

use super::SyncMessage;
use crate::encounter::ComboKey;
use crate::world::EntityId;

#[derive(Debug, Default, PartialEq)]
pub struct ObserverCache {
    modifiers: HashMap<EntityId, (f32, f32)>,
    scaling_disabled: HashMap<EntityId, bool>,
    adaptation: HashMap<EntityId, HashMap<ComboKey, f32>>,
}

impl ObserverCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one decoded frame into the cache. Damage reports are
    /// host-bound and ignored here.
    pub fn apply(&mut self, msg: &SyncMessage) {
        match *msg {
            SyncMessage::Modifiers { entity, defense, offense } => {
                self.modifiers.insert(entity, (defense, offense));
            }
            SyncMessage::Adaptation { entity, player, weapon, factor } => {
                self.adaptation
                    .entry(entity)
                    .or_default()
                    .insert((player, weapon), factor);
            }
            SyncMessage::ScalingDisabled { entity, disabled } => {
                self.scaling_disabled.insert(entity, disabled);
            }
            SyncMessage::DamageReport { .. } => {}
        }
    }

    /// `(defense, offense)` for an entity, defaulting to neutral.
    pub fn modifiers(&self, entity: EntityId) -> (f32, f32) {
        self.modifiers.get(&entity).copied().unwrap_or((1.0, 1.0))
    }

    pub fn is_scaling_disabled(&self, entity: EntityId) -> bool {
        self.scaling_disabled.get(&entity).copied().unwrap_or(false)
    }

    pub fn combo_factor(&self, entity: EntityId, combo: ComboKey) -> Option<f32> {
        self.adaptation.get(&entity)?.get(&combo).copied()
    }

    pub fn remove_entity(&mut self, entity: EntityId) {
        self.modifiers.remove(&entity);
        self.scaling_disabled.remove(&entity);
        self.adaptation.remove(&entity);
    }

    pub fn clear(&mut self) {
        self.modifiers.clear();
        self.scaling_disabled.clear();
        self.adaptation.clear();
    }
}
