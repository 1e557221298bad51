//! The engine facade: one service object the embedding drives from its
//! game loop.
//!
//! All mutation funnels through `&mut self` on the authoritative side;
//! observers only fold host frames into a passive cache. The embedding
//! calls [`ScalingEngine::tick`] once per simulation tick and routes the
//! returned signals and outbound frames however it likes; every damage
//! hook is a pure read.

use std::mem;

use tempo_types::ScalingConfig;

use crate::bar::{BarSource, ProgressionSource};
use crate::encounter::{pace, ComboKey, EncounterRegistry};
use crate::encounter::adaptation;
use crate::equalizer::{self, DeathEqualizer};
use crate::proximity::{expected_players_factor, ProximityIndex};
use crate::signal::ScalingSignal;
use crate::sync::{ObserverCache, SyncMessage};
use crate::targeting::{SteeringDecision, TargetingPass};
use crate::world::{BossView, EntityId, PlayerId, PlayerView, RunMode, WorldSnapshot};

/// No pace or adaptation evaluation for this long after spawn, so opening
/// burst damage cannot skew the first bucket.
pub const SPAWN_GRACE_TICKS: u64 = 60;

/// Everything one tick produced, drained from the internal buffers.
#[derive(Debug, Default)]
pub struct TickOutput {
    pub signals: Vec<ScalingSignal>,
    /// Frames the embedding must hand to its transport (host mode only).
    pub outbound: Vec<SyncMessage>,
}

pub struct ScalingEngine {
    mode: RunMode,
    config: ScalingConfig,
    registry: EncounterRegistry,
    proximity: ProximityIndex,
    equalizer: DeathEqualizer,
    observer: ObserverCache,
    signals: Vec<ScalingSignal>,
    outbound: Vec<SyncMessage>,
}

impl ScalingEngine {
    pub fn new(mode: RunMode, mut config: ScalingConfig) -> Self {
        config.normalize();
        let proximity = ProximityIndex::new(config.group.range());
        Self {
            mode,
            config,
            registry: EncounterRegistry::new(),
            proximity,
            equalizer: DeathEqualizer::new(),
            observer: ObserverCache::new(),
            signals: Vec::new(),
            outbound: Vec::new(),
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn config(&self) -> &ScalingConfig {
        &self.config
    }

    /// Swap in a new config snapshot (e.g. after a reload command).
    pub fn set_config(&mut self, mut config: ScalingConfig) {
        config.normalize();
        self.proximity.set_range(config.group.range());
        self.config = config;
    }

    pub fn registry(&self) -> &EncounterRegistry {
        &self.registry
    }

    pub fn observer_cache(&self) -> &ObserverCache {
        &self.observer
    }

    // ─────────────────────────────────────────────────────────────────────
    // Entity Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Register a freshly spawned boss. Authority only; observers learn
    /// about bosses through [`Self::apply_spawn_payload`] and sync frames.
    pub fn on_boss_spawned(
        &mut self,
        boss: &BossView,
        world: &WorldSnapshot,
        bars: &dyn BarSource,
        progression: &dyn ProgressionSource,
    ) -> Option<u64> {
        if !self.mode.is_authority() {
            return None;
        }
        let already_mapped = self.registry.encounter_of(boss.id).is_some();
        let known_ids = self.registry.encounter_ids();
        let id = self
            .registry
            .register_boss(boss, world, bars, progression, &self.config)?;
        if already_mapped {
            return Some(id);
        }

        let disabled = self
            .registry
            .encounter(id)
            .is_some_and(|enc| enc.scaling_disabled);
        // A part merged into an existing encounter is not a new encounter;
        // it only needs its own baseline frames below.
        if !known_ids.contains(&id) {
            self.signals.push(ScalingSignal::EncounterCreated {
                encounter_id: id,
                entity: boss.id,
                scaling_disabled: disabled,
            });
        }
        if self.mode == RunMode::Host {
            // Observers need the disabled flag and a neutral baseline
            // before the first hit lands.
            self.outbound.push(SyncMessage::ScalingDisabled {
                entity: boss.id,
                disabled,
            });
            self.outbound.push(SyncMessage::Modifiers {
                entity: boss.id,
                defense: 1.0,
                offense: 1.0,
            });
        }
        Some(id)
    }

    /// Extra spawn payload piggybacked on the host's entity-spawn message,
    /// read by observers before any sync frame can arrive.
    pub fn spawn_payload(&self, entity: EntityId) -> Vec<u8> {
        let disabled = self
            .registry
            .encounter_for_entity(entity)
            .is_some_and(|enc| enc.scaling_disabled);
        vec![u8::from(disabled)]
    }

    /// Observer-side counterpart of [`Self::spawn_payload`]. A missing or
    /// truncated payload means "not disabled".
    pub fn apply_spawn_payload(&mut self, entity: EntityId, payload: &[u8]) {
        let disabled = payload.first().is_some_and(|&b| b != 0);
        self.observer.apply(&SyncMessage::ScalingDisabled { entity, disabled });
    }

    /// An entity died or despawned.
    pub fn on_entity_removed(&mut self, entity: EntityId) {
        self.observer.remove_entity(entity);
        if let Some(encounter_id) = self.registry.cleanup_dead(entity) {
            self.signals
                .push(ScalingSignal::EncounterRemoved { encounter_id });
        }
    }

    /// A player died. During a boss fight this feeds the equalizer and
    /// every live encounter's death counter.
    pub fn on_player_death(&mut self, player: PlayerId, world: &WorldSnapshot) {
        if !world.any_boss_active() {
            return;
        }
        self.equalizer.record_death(player);
        for id in self.registry.encounter_ids() {
            if let Some(enc) = self.registry.encounter_mut(id) {
                enc.deaths_this_fight += 1;
            }
        }
    }

    /// World unload / disconnect.
    pub fn end_session(&mut self) {
        self.registry.clear();
        self.proximity.clear();
        self.equalizer.clear();
        self.observer.clear();
        self.signals.clear();
        self.outbound.clear();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tick
    // ─────────────────────────────────────────────────────────────────────

    /// Advance one simulation tick: refresh proximity, run the party
    /// census, evaluate pace and adaptation on bucket crossings, and emit
    /// whatever the embedding has to deliver.
    pub fn tick(&mut self, world: &WorldSnapshot, bars: &dyn BarSource) -> TickOutput {
        self.proximity.maybe_refresh(world);
        self.equalizer.update_party(world);
        if !world.any_boss_active() && self.equalizer.total_deaths() > 0 {
            tracing::debug!("boss fight ended, resetting death counters");
            self.equalizer.reset_fight();
        }

        if self.mode.is_authority() {
            self.evaluate_encounters(world, bars);
        }

        TickOutput {
            signals: mem::take(&mut self.signals),
            outbound: mem::take(&mut self.outbound),
        }
    }

    fn evaluate_encounters(&mut self, world: &WorldSnapshot, bars: &dyn BarSource) {
        for id in self.registry.encounter_ids() {
            let Some(entity) = self.registry.first_active_member(id, world) else {
                continue;
            };
            {
                let Some(enc) = self.registry.encounter(id) else {
                    continue;
                };
                if enc.scaling_disabled
                    || world.tick.saturating_sub(enc.spawn_tick) <= SPAWN_GRACE_TICKS
                {
                    continue;
                }
            }
            let bar_health = self.registry.get_health(entity, bars);

            let members: Vec<EntityId> = self
                .registry
                .members(id)
                .filter(|&m| world.boss(m).is_some_and(BossView::is_active_boss))
                .collect();
            let Some(enc) = self.registry.encounter_mut(id) else {
                continue;
            };
            let ticks_alive = world.tick.saturating_sub(enc.spawn_tick);

            // Aggregated bar health when the collaborator answered this
            // tick, otherwise the entity's own life fraction.
            let fraction = match bar_health {
                Some(_) => enc.health_fraction(),
                None => world.boss(entity).and_then(BossView::health_fraction),
            };
            if let Some(fraction) = fraction {
                let bucket = pace::bucket_of(fraction);
                if bucket < enc.last_bucket {
                    pace::update_on_bucket(enc, &self.config.pace, ticks_alive, bucket);
                    self.signals.push(ScalingSignal::PaceChanged {
                        encounter_id: id,
                        bucket,
                        defense: enc.defense_modifier,
                        offense: enc.offense_modifier,
                        time_difference_minutes: enc.last_time_difference,
                    });

                    let outcome =
                        adaptation::evaluate_on_bucket(enc, &self.config.adaptation, &self.config.pace);
                    for key in outcome.warnings {
                        self.signals.push(ScalingSignal::AdaptationWarning {
                            encounter_id: id,
                            player: key.0,
                            weapon: key.1,
                        });
                    }
                    for (key, factor) in outcome.tightened {
                        self.signals.push(ScalingSignal::AdaptationApplied {
                            encounter_id: id,
                            player: key.0,
                            weapon: key.1,
                            factor,
                        });
                        if self.mode == RunMode::Host {
                            for &member in &members {
                                self.outbound.push(SyncMessage::Adaptation {
                                    entity: member,
                                    player: key.0,
                                    weapon: key.1,
                                    factor,
                                });
                            }
                        }
                    }
                }
            }

            if self.mode == RunMode::Host && pace::materially_changed(enc) {
                for &member in &members {
                    self.outbound.push(SyncMessage::Modifiers {
                        entity: member,
                        defense: enc.defense_modifier as f32,
                        offense: enc.offense_modifier as f32,
                    });
                }
                pace::mark_sent(enc);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Damage Hooks
    // ─────────────────────────────────────────────────────────────────────

    /// Multiplier for damage about to land on a boss entity. `attacker`
    /// enables the per-combo adaptation factor when known.
    pub fn incoming_hit_multiplier(
        &self,
        entity: EntityId,
        attacker: Option<ComboKey>,
        world: &WorldSnapshot,
    ) -> f64 {
        let (mut mult, members_near) = if self.mode == RunMode::Observer {
            if self.observer.is_scaling_disabled(entity) {
                return 1.0;
            }
            let (defense, offense) = self.observer.modifiers(entity);
            let mut m = f64::from(offense) / f64::from(defense);
            if self.config.adaptation.enabled
                && let Some(key) = attacker
                && let Some(factor) = self.observer.combo_factor(entity, key)
                && factor < 1.0
            {
                m *= f64::from(factor);
            }
            (m, self.proximity.count_near(entity))
        } else {
            let Some(enc) = self.registry.encounter_for_entity(entity) else {
                return 1.0;
            };
            if enc.scaling_disabled
                || world.tick.saturating_sub(enc.spawn_tick) <= SPAWN_GRACE_TICKS
            {
                return 1.0;
            }
            let mut m = enc.offense_modifier / enc.defense_modifier;
            if self.config.adaptation.enabled
                && let Some(key) = attacker
                && let Some(factor) = enc.adaptation_factor(key)
                && factor < 1.0
            {
                m *= f64::from(factor);
            }
            let near = self
                .proximity
                .count_near_any(enc.members.iter().copied());
            (m, near)
        };

        let factor = expected_players_factor(
            members_near,
            self.config.group.expected_players,
            f64::from(self.config.group.scaling_multiplier),
        );
        mult /= factor;
        mult
    }

    /// Multiplier for damage a player is about to deal (the static ladder;
    /// pace and adaptation ride on [`Self::incoming_hit_multiplier`]).
    pub fn player_deal_multiplier(&self, player: PlayerId, player_name: &str) -> f64 {
        let default_tuning = tempo_types::PlayerTuning::default();
        let tuning = self
            .config
            .damage
            .tuning_for(player_name)
            .unwrap_or(&default_tuning);
        let steps = equalizer::deal_steps(
            &self.config.damage,
            tuning,
            self.equalizer.deaths_of(player),
        );
        if steps == 0 {
            return 1.0;
        }
        equalizer::damage_ladder_multiplier(steps)
    }

    /// Multiplier for damage a player is about to take: ladder, then the
    /// under-strength party factor, then death equalization.
    pub fn player_hurt_multiplier(
        &self,
        player: PlayerId,
        player_name: &str,
        world: &WorldSnapshot,
        progression: &dyn ProgressionSource,
    ) -> f64 {
        let default_tuning = tempo_types::PlayerTuning::default();
        let tuning = self
            .config
            .damage
            .tuning_for(player_name)
            .unwrap_or(&default_tuning);

        let steps = equalizer::take_steps(
            &self.config.damage,
            tuning,
            self.equalizer.deaths_of(player),
        );
        let mut mult = if steps == 0 {
            1.0
        } else {
            equalizer::damage_ladder_multiplier(steps)
        };

        let in_fight = world.any_boss_active();

        if in_fight
            && self.config.group.expected_players > 1
            && !self.group_scaling_gated(world, progression)
            && let Some(boss) = self.proximity.nearest_boss(player)
        {
            mult *= expected_players_factor(
                self.proximity.count_near(boss),
                self.config.group.expected_players,
                f64::from(self.config.group.scaling_multiplier),
            );
        }

        let equalize = tuning
            .equalize_deaths
            .unwrap_or(self.config.damage.equalize_deaths);
        if in_fight && equalize {
            mult *= self.equalizer.combined_multiplier(player);
        }

        mult
    }

    /// Any active boss below the group-scaling progression threshold
    /// suppresses the under-strength factor for everyone.
    fn group_scaling_gated(
        &self,
        world: &WorldSnapshot,
        progression: &dyn ProgressionSource,
    ) -> bool {
        let threshold = self.config.group.progression_threshold;
        if threshold <= 0.0 {
            return false;
        }
        world
            .bosses
            .iter()
            .filter(|b| b.is_active_boss())
            .any(|b| {
                progression
                    .progression_of(b.type_id)
                    .is_some_and(|p| p < threshold)
            })
    }

    /// Record damage dealt to a boss for adaptation. Authority only; a
    /// no-op when adaptation is off or the entity has no encounter.
    pub fn record_damage(&mut self, entity: EntityId, combo: ComboKey, amount: f64) {
        if !self.mode.is_authority() || !self.config.adaptation.enabled {
            return;
        }
        if let Some(enc) = self.registry.encounter_for_entity_mut(entity) {
            enc.record_phase_damage(combo, amount);
        }
    }

    /// Observer-side frame for damage the local player dealt; the host
    /// re-attributes it from the transport sender.
    pub fn damage_report(
        &self,
        entity: EntityId,
        weapon: crate::encounter::WeaponSig,
        amount: f64,
    ) -> Option<SyncMessage> {
        if self.mode != RunMode::Observer || !self.config.adaptation.enabled {
            return None;
        }
        Some(SyncMessage::DamageReport {
            entity,
            weapon,
            amount: amount as f32,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sync
    // ─────────────────────────────────────────────────────────────────────

    /// Fold a raw frame from the transport into engine state. Malformed
    /// frames are logged and dropped; sync is advisory and the next valid
    /// frame supersedes anything lost.
    pub fn handle_message(
        &mut self,
        sender: Option<PlayerId>,
        payload: &[u8],
        world: &WorldSnapshot,
    ) {
        let msg = match SyncMessage::decode(payload) {
            Ok(msg) => msg,
            Err(err) => {
                tracing::debug!("dropping malformed sync frame: {err}");
                return;
            }
        };

        match self.mode {
            RunMode::Observer => self.observer.apply(&msg),
            RunMode::Host => {
                if let SyncMessage::DamageReport { entity, weapon, amount } = msg {
                    let Some(player) = sender else {
                        tracing::debug!("damage report without a sender, dropping");
                        return;
                    };
                    if !world.boss(entity).is_some_and(BossView::is_active_boss) {
                        return;
                    }
                    self.record_damage(entity, (player, weapon), f64::from(amount));
                }
            }
            RunMode::Standalone => {}
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Targeting
    // ─────────────────────────────────────────────────────────────────────

    /// Run the aggro-steering pass for one boss, if enabled. The returned
    /// guard must stay alive across the embedding's target-selection call.
    pub fn steer_boss<'a>(
        &self,
        players: &'a mut [PlayerView],
        boss: EntityId,
        current_target: Option<PlayerId>,
    ) -> Option<(TargetingPass<'a>, SteeringDecision)> {
        if !self.mode.is_authority() || !self.config.targeting.target_highest_health {
            return None;
        }
        Some(TargetingPass::run(
            players,
            boss,
            current_target,
            &self.proximity,
            self.config.targeting.invalidate_lowest,
        ))
    }

    /// Aggregated health for a boss entity's encounter, refreshing the
    /// mirror from the bar collaborator.
    pub fn boss_health(&mut self, entity: EntityId, bars: &dyn BarSource) -> Option<(f32, f32)> {
        self.registry.get_health(entity, bars)
    }
}
