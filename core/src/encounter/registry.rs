//! Encounter registry: single-writer owner of all encounter records.
//!
//! Constructed fresh per world session and mutated only by the
//! authoritative simulation thread. Every read path returns `Option`;
//! "no encounter" is a normal outcome for callers racing against entity
//! lifecycle, never an error.

use hashbrown::HashMap;
use tempo_types::ScalingConfig;

use super::Encounter;
use crate::bar::{BarSource, ProgressionSource};
use crate::world::{BossView, EntityId, WorldSnapshot};

#[derive(Debug, Default)]
pub struct EncounterRegistry {
    entity_to_encounter: HashMap<EntityId, u64>,
    encounters: HashMap<u64, Encounter>,
    next_id: u64,
}

impl EncounterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a boss entity to an encounter, creating one when no compatible
    /// group exists. Returns `None` when the entity is not a boss or no
    /// presentation bar can be resolved. Idempotent: an already-mapped
    /// entity gets its existing encounter id back with no side effects.
    pub fn register_boss(
        &mut self,
        boss: &BossView,
        world: &WorldSnapshot,
        bars: &dyn BarSource,
        progression: &dyn ProgressionSource,
        cfg: &ScalingConfig,
    ) -> Option<u64> {
        if !boss.is_active_boss() {
            return None;
        }
        if let Some(&existing) = self.entity_to_encounter.get(&boss.id) {
            return Some(existing);
        }

        let bar = bars.resolve(boss)?;

        if let Some(group_id) = self.find_compatible_group(&bar, world) {
            self.entity_to_encounter.insert(boss.id, group_id);
            if let Some(enc) = self.encounters.get_mut(&group_id) {
                enc.members.insert(boss.id);
            }
            tracing::debug!(entity = boss.id.0, encounter = group_id, "boss merged into encounter");
            return Some(group_id);
        }

        let id = self.next_id;
        self.next_id += 1;

        let mut enc = Encounter::new(id, bar, world.tick);
        enc.members.insert(boss.id);
        enc.scaling_disabled = scaling_disabled_for(boss, progression, cfg);
        if enc.scaling_disabled {
            tracing::debug!(entity = boss.id.0, encounter = id, "scaling disabled at creation");
        }

        self.entity_to_encounter.insert(boss.id, id);
        self.encounters.insert(id, enc);
        tracing::debug!(entity = boss.id.0, encounter = id, "encounter created");
        Some(id)
    }

    /// Bar-identity grouping with the type-based fallback. Reference
    /// identity wins outright; a kind-level match defers to
    /// [`BarHandle::groups_with`], and both paths require the candidate
    /// group to still have an active member.
    fn find_compatible_group(
        &self,
        bar: &crate::bar::BarHandle,
        world: &WorldSnapshot,
    ) -> Option<u64> {
        // Identity pass first so a marker coincidence can never beat it.
        for (&id, enc) in &self.encounters {
            if enc.bar.instance == bar.instance && self.has_active_member(enc, world) {
                return Some(id);
            }
        }
        for (&id, enc) in &self.encounters {
            if enc.bar.groups_with(bar) && self.has_active_member(enc, world) {
                return Some(id);
            }
        }
        None
    }

    fn has_active_member(&self, enc: &Encounter, world: &WorldSnapshot) -> bool {
        enc.members
            .iter()
            .any(|&m| world.boss(m).is_some_and(BossView::is_active_boss))
    }

    /// First member that is still an active boss this tick.
    pub fn first_active_member(&self, encounter_id: u64, world: &WorldSnapshot) -> Option<EntityId> {
        let enc = self.encounters.get(&encounter_id)?;
        enc.members
            .iter()
            .copied()
            .find(|&m| world.boss(m).is_some_and(BossView::is_active_boss))
    }

    /// Re-query the bar collaborator for aggregated health and refresh the
    /// encounter's mirror. `None` when the entity has no encounter or the
    /// collaborator rejects the query.
    pub fn get_health(&mut self, entity: EntityId, bars: &dyn BarSource) -> Option<(f32, f32)> {
        let id = *self.entity_to_encounter.get(&entity)?;
        let (life, life_max) = bars.aggregate(entity)?;
        if life_max <= 0.0 {
            return None;
        }
        if let Some(enc) = self.encounters.get_mut(&id) {
            enc.total_life = life;
            enc.total_life_max = life_max;
        }
        Some((life, life_max))
    }

    /// Remove a dead/despawned entity. When the member set empties, the
    /// encounter itself is deleted and its id returned so per-entity
    /// observer caches can be dropped alongside it.
    pub fn cleanup_dead(&mut self, entity: EntityId) -> Option<u64> {
        let id = self.entity_to_encounter.remove(&entity)?;
        let enc = self.encounters.get_mut(&id)?;
        enc.members.remove(&entity);
        if enc.members.is_empty() {
            self.encounters.remove(&id);
            tracing::debug!(encounter = id, "encounter removed");
            return Some(id);
        }
        None
    }

    pub fn encounter_of(&self, entity: EntityId) -> Option<u64> {
        self.entity_to_encounter.get(&entity).copied()
    }

    pub fn encounter(&self, id: u64) -> Option<&Encounter> {
        self.encounters.get(&id)
    }

    pub fn encounter_mut(&mut self, id: u64) -> Option<&mut Encounter> {
        self.encounters.get_mut(&id)
    }

    pub fn encounter_for_entity(&self, entity: EntityId) -> Option<&Encounter> {
        self.encounters.get(self.entity_to_encounter.get(&entity)?)
    }

    pub fn encounter_for_entity_mut(&mut self, entity: EntityId) -> Option<&mut Encounter> {
        self.encounters
            .get_mut(self.entity_to_encounter.get(&entity)?)
    }

    pub fn encounter_ids(&self) -> Vec<u64> {
        self.encounters.keys().copied().collect()
    }

    pub fn members(&self, encounter_id: u64) -> impl Iterator<Item = EntityId> + '_ {
        self.encounters
            .get(&encounter_id)
            .into_iter()
            .flat_map(|enc| enc.members.iter().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.encounters.is_empty()
    }

    /// Drop everything (world unload / session end).
    pub fn clear(&mut self) {
        self.entity_to_encounter.clear();
        self.encounters.clear();
        self.next_id = 0;
    }
}

fn scaling_disabled_for(
    boss: &BossView,
    progression: &dyn ProgressionSource,
    cfg: &ScalingConfig,
) -> bool {
    // A zero target duration turns pace scaling off globally.
    if !cfg.pace.enabled() {
        return true;
    }
    if cfg.pace.progression_threshold > 0.0
        && let Some(prog) = progression.progression_of(boss.type_id)
        && prog < cfg.pace.progression_threshold
    {
        return true;
    }
    false
}
