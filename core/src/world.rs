//! Per-tick simulation views shared between the engine and its embedding.
//!
//! The engine never owns entity storage: the embedding rebuilds a
//! [`WorldSnapshot`] from its own player/boss tables each tick and the
//! engine reads through it. Any entity that despawned simply stops
//! appearing in the snapshot, so every lookup returns `Option` and callers
//! treat "not found" as a normal outcome.

/// Fixed simulation rate.
pub const TICKS_PER_SECOND: u32 = 60;

/// Ticks per minute, as a float for pace math.
pub const TICKS_PER_MINUTE: f64 = 3600.0;

/// Identifier of a boss entity instance (slot index on the host).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u32);

/// Identifier of a connected player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u32);

/// 2D position in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared distance; proximity checks never take square roots.
    pub fn distance_sq(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Which side of the simulation this engine instance is running on.
///
/// A host that also renders its own party is still `Host`: authority is a
/// property of the process, not of whether anyone is watching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Single-process game; authoritative, nothing to sync.
    #[default]
    Standalone,
    /// Authoritative simulation host; sends sync messages to observers.
    Host,
    /// Non-authoritative observer; reads a passive cache fed by the host.
    Observer,
}

impl RunMode {
    /// True when this instance owns encounter state.
    pub fn is_authority(self) -> bool {
        matches!(self, RunMode::Standalone | RunMode::Host)
    }
}

/// Read-only view of one player for this tick.
#[derive(Debug, Clone)]
pub struct PlayerView {
    pub id: PlayerId,
    pub position: Position,
    pub life: i32,
    pub life_max: i32,
    pub connected: bool,
    pub alive: bool,
    /// Dead-and-spectating; never a targeting or proximity candidate.
    pub ghost: bool,
    /// Additive aggro weight consumed by the host's targeting AI.
    pub aggro: i32,
}

impl PlayerView {
    /// Eligible for proximity, targeting, and equalizer accounting.
    pub fn qualifies(&self) -> bool {
        self.connected && self.alive && !self.ghost
    }
}

/// Read-only view of one boss-capable entity for this tick.
#[derive(Debug, Clone)]
pub struct BossView {
    pub id: EntityId,
    /// Template/type id, used for progression lookups.
    pub type_id: i32,
    pub position: Position,
    pub life: i32,
    pub life_max: i32,
    pub active: bool,
    pub is_boss: bool,
}

impl BossView {
    pub fn is_active_boss(&self) -> bool {
        self.active && self.is_boss
    }

    /// Local health fraction; the fallback when no presentation bar can be
    /// queried for aggregated health.
    pub fn health_fraction(&self) -> Option<f64> {
        (self.life_max > 0).then(|| f64::from(self.life) / f64::from(self.life_max))
    }
}

/// Borrowed view of the whole simulation for one tick.
#[derive(Debug, Clone, Copy)]
pub struct WorldSnapshot<'a> {
    pub tick: u64,
    pub players: &'a [PlayerView],
    pub bosses: &'a [BossView],
}

impl<'a> WorldSnapshot<'a> {
    pub fn boss(&self, id: EntityId) -> Option<&'a BossView> {
        self.bosses.iter().find(|b| b.id == id)
    }

    pub fn player(&self, id: PlayerId) -> Option<&'a PlayerView> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn any_boss_active(&self) -> bool {
        self.bosses.iter().any(BossView::is_active_boss)
    }
}
