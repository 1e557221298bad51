//! Fight-pace control law.
//!
//! A discrete, hysteretic controller: it samples only when the aggregated
//! health fraction crosses downward into a new 10-point bucket, and a dead
//! zone around the ideal pace absorbs small deviations. Outside the dead
//! zone the correction grows quadratically and is hard-capped, so the
//! modifier pair can never diverge or chatter.

use tempo_types::PaceConfig;

use super::Encounter;
use crate::world::TICKS_PER_MINUTE;

/// Health bucket for a fraction in `[0, 1]`: `floor(f * 10) * 10`.
pub fn bucket_of(health_fraction: f64) -> i32 {
    ((health_fraction * 10.0).floor() as i32).clamp(0, 10) * 10
}

/// Recompute the defense/offense pair for a downward bucket crossing.
///
/// Invariant on exit: at most one of the two modifiers deviates from 1.0.
pub fn update_on_bucket(enc: &mut Encounter, cfg: &PaceConfig, ticks_alive: u64, bucket: i32) {
    let hp_lost = 1.0 - f64::from(bucket) / 100.0;
    let ideal_ticks = cfg.target_ticks() * hp_lost;
    let diff_minutes = (ticks_alive as f64 - ideal_ticks) / TICKS_PER_MINUTE;
    enc.last_time_difference = diff_minutes;

    let dead_zone = cfg.dead_zone_minutes();
    let abs_diff = diff_minutes.abs();

    if abs_diff <= dead_zone {
        // On pace: the steady state.
        enc.defense_modifier = 1.0;
        enc.offense_modifier = 1.0;
    } else {
        let overshoot = abs_diff - dead_zone;
        let modifier =
            (1.0 + cfg.scaling_constant * overshoot * overshoot).min(cfg.max_modifier);
        if diff_minutes > 0.0 {
            // Running long: players hit harder.
            enc.offense_modifier = modifier;
            enc.defense_modifier = 1.0;
        } else {
            // Running short: the boss takes less.
            enc.defense_modifier = modifier;
            enc.offense_modifier = 1.0;
        }
    }

    enc.last_bucket = bucket;
}

/// Delta suppression: sync traffic is only worth sending when either
/// modifier moved by more than 1% of its last-sent value.
pub fn materially_changed(enc: &Encounter) -> bool {
    const THRESHOLD: f64 = 0.01;
    (enc.defense_modifier - enc.last_sent_defense).abs() > THRESHOLD * enc.last_sent_defense
        || (enc.offense_modifier - enc.last_sent_offense).abs() > THRESHOLD * enc.last_sent_offense
}

pub fn mark_sent(enc: &mut Encounter) {
    enc.last_sent_defense = enc.defense_modifier;
    enc.last_sent_offense = enc.offense_modifier;
}
