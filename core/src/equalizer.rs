//! Death accounting and the per-player damage ladder.
//!
//! Two related mechanisms live here. The exponential ladder converts
//! integer tuning steps (config offsets plus deaths this fight) into a
//! damage multiplier. The equalizer raises incoming damage for players
//! who are dying less than their party while the party is short-handed,
//! pushing death counts toward each other instead of letting one player
//! carry every wipe.

use hashbrown::HashMap;

use tempo_types::{DamageConfig, PlayerTuning};

use crate::world::{PlayerId, WorldSnapshot, TICKS_PER_SECOND};

/// Ratio between adjacent ladder steps.
pub const LADDER_STEP: f64 = 1.2;

/// Equalizer growth per squared second spent short-handed.
pub const TICK_INTENSITY: f64 = 0.0003;

/// Equalizer growth per death below the party average.
pub const DEATH_DIFF_INTENSITY: f64 = 0.15;

/// Equalizer growth per missing fraction of the party.
pub const ALIVE_RATIO_INTENSITY: f64 = 0.5;

/// `1.2^steps`; negative steps shrink, zero is neutral.
pub fn damage_ladder_multiplier(steps: i32) -> f64 {
    LADDER_STEP.powi(steps)
}

/// Ladder steps for damage this player deals.
pub fn deal_steps(cfg: &DamageConfig, tuning: &PlayerTuning, deaths: u32) -> i32 {
    cfg.deal_damage + tuning.deal_offset + deaths as i32
}

/// Ladder steps for damage this player takes. Deaths push the take side
/// twice as fast as the deal side.
pub fn take_steps(cfg: &DamageConfig, tuning: &PlayerTuning, deaths: u32) -> i32 {
    cfg.take_damage + tuning.take_offset + (deaths as i32) * 2
}

#[derive(Debug, Default)]
struct PartyState {
    online: u32,
    alive: u32,
    short_handed_ticks: u64,
}

#[derive(Debug, Default)]
pub struct DeathEqualizer {
    deaths: HashMap<PlayerId, u32>,
    total_deaths: u32,
    party: PartyState,
    last_update_tick: Option<u64>,
}

impl DeathEqualizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_death(&mut self, player: PlayerId) {
        *self.deaths.entry(player).or_insert(0) += 1;
        self.total_deaths += 1;
        tracing::debug!(player = player.0, total = self.total_deaths, "death recorded");
    }

    pub fn deaths_of(&self, player: PlayerId) -> u32 {
        self.deaths.get(&player).copied().unwrap_or(0)
    }

    pub fn total_deaths(&self) -> u32 {
        self.total_deaths
    }

    /// Refresh the party census, at most once per tick. Short-handed time
    /// accumulates only during a boss fight while anyone is down and
    /// resets the moment the party is whole (or the fight ends).
    pub fn update_party(&mut self, world: &WorldSnapshot) {
        if self.last_update_tick == Some(world.tick) {
            return;
        }
        self.last_update_tick = Some(world.tick);

        let online = world.players.iter().filter(|p| p.connected).count() as u32;
        let alive = world
            .players
            .iter()
            .filter(|p| p.connected && p.alive && !p.ghost)
            .count() as u32;

        self.party.online = online.max(1);
        self.party.alive = alive.min(self.party.online);
        if world.any_boss_active() && self.party.alive < self.party.online {
            self.party.short_handed_ticks += 1;
        } else {
            self.party.short_handed_ticks = 0;
        }
    }

    /// Incoming-damage multiplier for one player while the party is
    /// short-handed. Neutral (1.0) whenever the party is whole. Three
    /// compounding terms: missing-player fraction, deaths below the party
    /// average, and squared time spent short-handed; each term is at
    /// least 1, so the result never reduces damage.
    pub fn combined_multiplier(&self, player: PlayerId) -> f64 {
        if self.party.alive >= self.party.online {
            return 1.0;
        }

        let online = f64::from(self.party.online);
        let missing = f64::from(self.party.online - self.party.alive) / online;
        let alive_mult = 1.0 + missing * ALIVE_RATIO_INTENSITY;

        let avg = f64::from(self.total_deaths) / online;
        let below_avg = avg - f64::from(self.deaths_of(player));
        let death_mult = (1.0 + below_avg * DEATH_DIFF_INTENSITY).max(1.0);

        let seconds = self.party.short_handed_ticks as f64 / f64::from(TICKS_PER_SECOND);
        let time_mult = 1.0 + seconds * seconds * TICK_INTENSITY;

        alive_mult * death_mult * time_mult
    }

    /// All boss encounters ended; death counts start over.
    pub fn reset_fight(&mut self) {
        self.deaths.clear();
        self.total_deaths = 0;
        self.party.short_handed_ticks = 0;
    }

    pub fn clear(&mut self) {
        self.reset_fight();
        self.party = PartyState::default();
        self.last_update_tick = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{BossView, EntityId, PlayerView, Position};

    fn player(id: u32, alive: bool) -> PlayerView {
        PlayerView {
            id: PlayerId(id),
            position: Position::default(),
            life: if alive { 100 } else { 0 },
            life_max: 100,
            connected: true,
            alive,
            ghost: false,
            aggro: 0,
        }
    }

    fn boss() -> BossView {
        BossView {
            id: EntityId(1),
            type_id: 1,
            position: Position::default(),
            life: 1000,
            life_max: 1000,
            active: true,
            is_boss: true,
        }
    }

    fn fight_snapshot<'a>(
        tick: u64,
        players: &'a [PlayerView],
        bosses: &'a [BossView],
    ) -> WorldSnapshot<'a> {
        WorldSnapshot { tick, players, bosses }
    }

    #[test]
    fn ladder_grows_and_shrinks_geometrically() {
        assert_eq!(damage_ladder_multiplier(0), 1.0);
        assert!((damage_ladder_multiplier(2) - 1.44).abs() < 1e-12);
        assert!((damage_ladder_multiplier(-1) - 1.0 / 1.2).abs() < 1e-12);
    }

    #[test]
    fn deaths_count_double_on_the_take_side() {
        let cfg = DamageConfig::default();
        let tuning = PlayerTuning::default();
        assert_eq!(deal_steps(&cfg, &tuning, 3), 3);
        assert_eq!(take_steps(&cfg, &tuning, 3), 6);

        let offset = PlayerTuning {
            deal_offset: 2,
            take_offset: -1,
            equalize_deaths: None,
        };
        assert_eq!(deal_steps(&cfg, &offset, 1), 3);
        assert_eq!(take_steps(&cfg, &offset, 1), 1);
    }

    #[test]
    fn whole_party_is_always_neutral() {
        let players = vec![player(1, true), player(2, true)];
        let bosses = vec![boss()];
        let mut eq = DeathEqualizer::new();
        eq.record_death(PlayerId(1));
        eq.record_death(PlayerId(1));
        eq.update_party(&fight_snapshot(0, &players, &bosses));
        assert_eq!(eq.combined_multiplier(PlayerId(1)), 1.0);
    }

    #[test]
    fn survivors_take_more_than_frequent_diers() {
        let players = vec![player(1, true), player(2, false)];
        let bosses = vec![boss()];
        let mut eq = DeathEqualizer::new();
        eq.record_death(PlayerId(2));
        eq.update_party(&fight_snapshot(0, &players, &bosses));

        // Average is 0.5: the undying player sits below average and gets
        // the extra multiplier; the dying one does not.
        let survivor = eq.combined_multiplier(PlayerId(1));
        let dier = eq.combined_multiplier(PlayerId(2));
        assert!(survivor > dier);
        assert!(dier > 1.0);
    }

    #[test]
    fn multiplier_grows_quadratically_with_short_handed_time() {
        let players = vec![player(1, true), player(2, false)];
        let bosses = vec![boss()];
        let mut eq = DeathEqualizer::new();

        for tick in 0..60 {
            eq.update_party(&fight_snapshot(tick, &players, &bosses));
        }
        let at_1s = eq.combined_multiplier(PlayerId(1));
        for tick in 60..180 {
            eq.update_party(&fight_snapshot(tick, &players, &bosses));
        }
        let at_3s = eq.combined_multiplier(PlayerId(1));

        // alive_mult = 1.25 both times; time term is 1 + s^2 * 0.0003.
        assert!((at_1s - 1.25 * 1.0003).abs() < 1e-9);
        assert!((at_3s - 1.25 * 1.0027).abs() < 1e-9);
    }

    #[test]
    fn recovery_resets_short_handed_time() {
        let down = vec![player(1, true), player(2, false)];
        let up = vec![player(1, true), player(2, true)];
        let bosses = vec![boss()];
        let mut eq = DeathEqualizer::new();
        for tick in 0..600 {
            eq.update_party(&fight_snapshot(tick, &down, &bosses));
        }
        assert!(eq.combined_multiplier(PlayerId(1)) > 1.25);

        eq.update_party(&fight_snapshot(600, &up, &bosses));
        assert_eq!(eq.combined_multiplier(PlayerId(1)), 1.0);

        // Going down again starts the clock from zero.
        eq.update_party(&fight_snapshot(601, &down, &bosses));
        let fresh = eq.combined_multiplier(PlayerId(1));
        assert!((fresh - 1.25).abs() < 1e-6);
    }

    #[test]
    fn no_active_boss_means_no_time_accumulation() {
        let players = vec![player(1, true), player(2, false)];
        let mut eq = DeathEqualizer::new();
        for tick in 0..600 {
            eq.update_party(&fight_snapshot(tick, &players, &[]));
        }
        // Short-handed but out of combat: only the alive term applies.
        assert_eq!(eq.combined_multiplier(PlayerId(1)), 1.25);
    }

    #[test]
    fn census_runs_at_most_once_per_tick() {
        let players = vec![player(1, true), player(2, false)];
        let bosses = vec![boss()];
        let mut eq = DeathEqualizer::new();
        eq.update_party(&fight_snapshot(7, &players, &bosses));
        eq.update_party(&fight_snapshot(7, &players, &bosses));
        eq.update_party(&fight_snapshot(7, &players, &bosses));
        let triple = eq.combined_multiplier(PlayerId(1));

        let mut single = DeathEqualizer::new();
        single.update_party(&fight_snapshot(7, &players, &bosses));
        assert_eq!(triple, single.combined_multiplier(PlayerId(1)));
    }

    #[test]
    fn fight_reset_clears_death_counts() {
        let mut eq = DeathEqualizer::new();
        eq.record_death(PlayerId(1));
        eq.record_death(PlayerId(2));
        assert_eq!(eq.total_deaths(), 2);
        eq.reset_fight();
        assert_eq!(eq.total_deaths(), 0);
        assert_eq!(eq.deaths_of(PlayerId(1)), 0);
    }
}
