//! Contracts for the external collaborators the engine queries.
//!
//! The presentation bar and the progression catalogue live outside this
//! crate. Both are modeled as narrow traits returning `Option`: `None`
//! always means "no data this tick", never an error worth propagating.

use crate::world::{BossView, EntityId};

/// Opaque identity of a presentation bar instance. Two bosses sharing the
/// same `BarId` present a single health bar and belong in one encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BarId(pub u64);

/// How a bar instance came to exist, for the type-based grouping rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarKind {
    /// Bar supplied by the boss's own definition.
    Custom,
    /// Shared special bar reused across the parts of one multi-part boss;
    /// reference identity alone groups these.
    SpecialShared,
    /// Generic bar handed out to any boss with a head marker. Instances
    /// are distinct, so grouping additionally requires a matching marker.
    Common,
}

/// Stable accessor record for a resolved presentation bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarHandle {
    pub instance: BarId,
    pub kind: BarKind,
    /// Visual marker (head icon index); `-1` when the boss has none.
    pub marker: i32,
}

impl BarHandle {
    /// Whether a boss resolving to `other` belongs in the same encounter
    /// as this bar. Reference identity wins; generic bars also need a
    /// shared marker so unrelated same-type bosses never merge.
    pub fn groups_with(&self, other: &BarHandle) -> bool {
        if self.instance == other.instance {
            return true;
        }
        self.kind == other.kind && self.kind == BarKind::Common && self.marker == other.marker
    }
}

/// The boss-bar collaborator.
pub trait BarSource {
    /// Resolve the presentation bar for a boss, if it has one.
    fn resolve(&self, boss: &BossView) -> Option<BarHandle>;

    /// Combined `(life, life_max)` across all parts presented by the
    /// entity's bar. `None` when the entity is gone or the bar rejects
    /// the query.
    fn aggregate(&self, entity: EntityId) -> Option<(f32, f32)>;
}

/// The progression catalogue collaborator. Consulted once at encounter
/// creation to gate scaling off for early-game content.
pub trait ProgressionSource {
    fn progression_of(&self, boss_type_id: i32) -> Option<f32>;
}
