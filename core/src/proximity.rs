//! Spatial proximity index between players and boss entities.
//!
//! Rebuilt in full on a fixed cadence rather than incrementally: at most
//! a few dozen players times a handful of bosses, a brute-force pass every
//! few ticks is cheaper than maintaining deltas. All comparisons use
//! squared distances.

use hashbrown::{HashMap, HashSet};

use crate::world::{EntityId, PlayerId, WorldSnapshot};

/// Ticks between full rebuilds.
pub const UPDATE_INTERVAL_TICKS: u64 = 6;

#[derive(Debug)]
pub struct ProximityIndex {
    range_sq: f32,
    nearest_boss: HashMap<PlayerId, EntityId>,
    near_players: HashMap<EntityId, HashSet<PlayerId>>,
    last_refresh_tick: Option<u64>,
}

impl ProximityIndex {
    pub fn new(range: f32) -> Self {
        Self {
            range_sq: range * range,
            nearest_boss: HashMap::new(),
            near_players: HashMap::new(),
            last_refresh_tick: None,
        }
    }

    /// Rebuild when the refresh interval has elapsed. Returns whether a
    /// rebuild happened, which callers only use in tests.
    pub fn maybe_refresh(&mut self, world: &WorldSnapshot) -> bool {
        if let Some(last) = self.last_refresh_tick
            && world.tick.saturating_sub(last) < UPDATE_INTERVAL_TICKS
        {
            return false;
        }
        self.refresh(world);
        true
    }

    fn refresh(&mut self, world: &WorldSnapshot) {
        self.last_refresh_tick = Some(world.tick);
        self.nearest_boss.clear();
        self.near_players.clear();

        for player in world.players.iter().filter(|p| p.qualifies()) {
            let mut best: Option<(EntityId, f32)> = None;
            for boss in world.bosses.iter().filter(|b| b.is_active_boss()) {
                let d_sq = player.position.distance_sq(boss.position);
                if d_sq > self.range_sq {
                    continue;
                }
                self.near_players.entry(boss.id).or_default().insert(player.id);
                if best.is_none_or(|(_, best_sq)| d_sq < best_sq) {
                    best = Some((boss.id, d_sq));
                }
            }
            if let Some((boss_id, _)) = best {
                self.nearest_boss.insert(player.id, boss_id);
            }
        }
    }

    pub fn is_near(&self, player: PlayerId, boss: EntityId) -> bool {
        self.near_players
            .get(&boss)
            .is_some_and(|set| set.contains(&player))
    }

    pub fn nearest_boss(&self, player: PlayerId) -> Option<EntityId> {
        self.nearest_boss.get(&player).copied()
    }

    /// Players within range of any member of the given set, deduplicated.
    pub fn count_near_any(&self, bosses: impl Iterator<Item = EntityId>) -> u32 {
        let mut seen: HashSet<PlayerId> = HashSet::new();
        for boss in bosses {
            if let Some(set) = self.near_players.get(&boss) {
                seen.extend(set.iter().copied());
            }
        }
        seen.len() as u32
    }

    pub fn count_near(&self, boss: EntityId) -> u32 {
        self.near_players.get(&boss).map_or(0, |s| s.len() as u32)
    }

    /// Takes effect on the next rebuild.
    pub fn set_range(&mut self, range: f32) {
        self.range_sq = range * range;
    }

    pub fn clear(&mut self) {
        self.nearest_boss.clear();
        self.near_players.clear();
        self.last_refresh_tick = None;
    }
}

/// Quadratic shortfall factor for parties smaller than the configured
/// expectation. Returns 1.0 at or above the expected size; below it the
/// factor grows with the square of the shortfall. Callers divide damage
/// dealt to bosses by it and multiply damage taken from them.
pub fn expected_players_factor(nearby: u32, expected: u32, multiplier: f64) -> f64 {
    if expected <= 1 || nearby >= expected {
        return 1.0;
    }
    let diff = f64::from(expected - nearby.max(1));
    multiplier * diff * diff + 1.0
}
