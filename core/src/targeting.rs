//! Target steering for boss AI.
//!
//! The engine never picks targets itself; it perturbs the host's own
//! target-selection pass by temporarily boosting one player's aggro weight
//! and optionally invalidating the current target. The boost is scoped:
//! [`TargetingPass`] applies it on construction and removes it on drop, so
//! the weight can never leak past the selection window even on early
//! return.

use crate::proximity::ProximityIndex;
use crate::world::{EntityId, PlayerId, PlayerView};

/// Additive aggro applied to the preferred player for one selection pass.
pub const AGGRO_BOOST: i32 = 1500;

/// Life-difference band (absolute) within which the current target counts
/// as "lowest enough" to invalidate.
pub const HEALTH_THRESHOLD: i32 = 20;

/// Outcome of one steering pass, consumed by the embedding's AI hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SteeringDecision {
    /// Player whose aggro is boosted for this pass, if any.
    pub boosted_player: Option<PlayerId>,
    /// The embedding should force its AI to re-pick a target.
    pub invalidate_target: bool,
}

/// Scoped aggro boost over a mutable player slice.
pub struct TargetingPass<'a> {
    players: &'a mut [PlayerView],
    boosted: Option<usize>,
}

impl<'a> TargetingPass<'a> {
    /// Run the steering policy for one boss and apply the boost.
    ///
    /// `current_target` is the player the boss AI is tracking right now,
    /// if any. Returns the pass guard plus the decision the embedding
    /// should act on while the guard is live.
    pub fn run(
        players: &'a mut [PlayerView],
        boss: EntityId,
        current_target: Option<PlayerId>,
        proximity: &ProximityIndex,
        invalidate_lowest: bool,
    ) -> (Self, SteeringDecision) {
        let mut decision = SteeringDecision::default();

        let candidates: Vec<usize> = players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.qualifies() && proximity.is_near(p.id, boss))
            .map(|(i, _)| i)
            .collect();

        if let Some(&best) = candidates.iter().max_by_key(|&&i| players[i].life) {
            decision.boosted_player = Some(players[best].id);
            players[best].aggro += AGGRO_BOOST;

            if invalidate_lowest
                && let Some(target) = current_target
                && candidates.iter().any(|&i| players[i].id == target)
            {
                let lowest = candidates.iter().map(|&i| players[i].life).min().unwrap_or(0);
                let target_life = players
                    .iter()
                    .find(|p| p.id == target)
                    .map_or(i32::MAX, |p| p.life);
                if (target_life - lowest).abs() <= HEALTH_THRESHOLD {
                    decision.invalidate_target = true;
                }
            }

            return (
                Self {
                    boosted: Some(best),
                    players,
                },
                decision,
            );
        }

        (Self { players, boosted: None }, decision)
    }
}

impl Drop for TargetingPass<'_> {
    fn drop(&mut self) {
        if let Some(i) = self.boosted {
            let p = &mut self.players[i];
            p.aggro = (p.aggro - AGGRO_BOOST).max(0);
        }
    }
}
