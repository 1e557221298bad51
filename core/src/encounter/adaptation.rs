//! Weapon adaptation: suppression of over-dominant combatant/weapon pairs.
//!
//! Damage is accumulated per combo between bucket crossings, folded into an
//! exponential moving average at each crossing, and ranked against the
//! group median. The EMA means adaptation reacts to a trend rather than one
//! lucky phase; the median (not the mean) keeps a single outlier combo from
//! shifting the baseline everyone is compared against.

use tempo_types::{AdaptationConfig, PaceConfig};

use super::{ComboKey, Encounter};

/// EMA weight for the newest phase: `running = 0.6 * prev + 0.4 * phase`.
pub const PHASE_AVG_ALPHA: f64 = 0.4;

/// Assigned factors never drop below this floor.
const MIN_FACTOR: f32 = 0.1;

/// A new factor must undercut the existing one by more than this to
/// replace it; factors only tighten, never loosen.
const TIGHTEN_MARGIN: f32 = 0.001;

/// Running values below this fraction of the max are excluded from the
/// median, so negligible contributors cannot drag the baseline down.
const MEDIAN_FILTER_FRACTION: f64 = 0.1;

/// What one evaluation pass decided, for notification and sync.
#[derive(Debug, Default)]
pub struct AdaptationOutcome {
    /// Combos that crossed the warning ratio this pass (one-time each).
    pub warnings: Vec<ComboKey>,
    /// Combos whose factor was newly assigned or tightened.
    pub tightened: Vec<(ComboKey, f32)>,
}

/// Evaluate adaptation at a bucket crossing. Phase accumulators are
/// consumed; running estimates persist for the encounter's life.
pub fn evaluate_on_bucket(
    enc: &mut Encounter,
    cfg: &AdaptationConfig,
    pace: &PaceConfig,
) -> AdaptationOutcome {
    let mut outcome = AdaptationOutcome::default();
    if !cfg.enabled || enc.phase_damage.is_empty() {
        enc.phase_damage.clear();
        return outcome;
    }

    // Factors are only assigned while the fight runs short; otherwise the
    // pace controller is already pushing the other way.
    let running_short = enc.defense_modifier > 1.0;
    let pace_capped = enc.defense_modifier >= pace.max_modifier;

    let keys: Vec<ComboKey> = enc.phase_damage.keys().copied().collect();
    for key in keys {
        let phase = enc.phase_damage.get(&key).copied().unwrap_or(0.0);
        let prev = enc.running_damage.get(&key).copied().unwrap_or(0.0);
        enc.running_damage
            .insert(key, (1.0 - PHASE_AVG_ALPHA) * prev + PHASE_AVG_ALPHA * phase);
    }
    enc.phase_damage.clear();

    let Some(median) = filtered_median(enc.running_damage.values().copied()) else {
        return outcome;
    };

    // A lone contributor is its own median, so the ratio test can never
    // fire on its own; the opt-in solo path forces it once the pace
    // controller has hit its cap.
    let solo_forced = enc.running_damage.len() == 1
        && cfg.adapt_to_solo
        && running_short
        && pace_capped;
    let combos: Vec<(ComboKey, f64)> = enc
        .running_damage
        .iter()
        .map(|(k, v)| (*k, *v))
        .collect();

    for (key, running) in combos {
        if running < cfg.min_damage {
            continue;
        }

        let mut ratio = if median > 0.0 { running / median } else { 0.0 };
        if solo_forced {
            ratio = cfg.complete_multiplier + 1.0;
        }

        if ratio >= cfg.start_multiplier
            && !enc.warned.contains(&key)
            && !enc.adaptation_factors.contains_key(&key)
        {
            enc.warned.insert(key);
            outcome.warnings.push(key);
        }

        if ratio >= cfg.complete_multiplier && running_short {
            let factor = if solo_forced {
                // No group baseline to compare against: apply the full
                // configured reduction.
                (1.0 - cfg.max_reduction).max(MIN_FACTOR)
            } else {
                (1.0 - cfg.max_reduction * (1.0 - (median / running) as f32)).max(MIN_FACTOR)
            };
            let tightened = match enc.adaptation_factors.get(&key) {
                Some(&existing) => factor < existing - TIGHTEN_MARGIN,
                None => true,
            };
            if tightened {
                enc.adaptation_factors.insert(key, factor);
                outcome.tightened.push((key, factor));
            }
        }
    }

    outcome
}

/// Median of the values above `MEDIAN_FILTER_FRACTION` of the maximum.
/// Falls back to half the max when the result degenerates to ≤ 1 (all
/// contributors still negligible early in a fight).
fn filtered_median(values: impl Iterator<Item = f64>) -> Option<f64> {
    let all: Vec<f64> = values.collect();
    let max = all.iter().copied().fold(f64::MIN, f64::max);
    if all.is_empty() || max <= 0.0 {
        return None;
    }

    let mut relevant: Vec<f64> = all
        .iter()
        .copied()
        .filter(|v| *v > max * MEDIAN_FILTER_FRACTION)
        .collect();
    relevant.sort_unstable_by(|a, b| a.total_cmp(b));

    let n = relevant.len();
    let median = if n == 0 {
        0.0
    } else if n % 2 == 0 {
        (relevant[n / 2 - 1] + relevant[n / 2]) / 2.0
    } else {
        relevant[n / 2]
    };

    Some(if median <= 1.0 { max * 0.5 } else { median })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bar::{BarHandle, BarId, BarKind};
    use crate::world::PlayerId;
    use crate::encounter::WeaponSig;

    fn encounter() -> Encounter {
        let bar = BarHandle {
            instance: BarId(1),
            kind: BarKind::Custom,
            marker: -1,
        };
        Encounter::new(0, bar, 0)
    }

    fn cfg() -> AdaptationConfig {
        AdaptationConfig {
            enabled: true,
            ..AdaptationConfig::default()
        }
    }

    fn combo(player: u32, weapon: i32) -> ComboKey {
        (PlayerId(player), WeaponSig(weapon))
    }

    #[test]
    fn disabled_tracker_still_drains_phase_damage() {
        let mut enc = encounter();
        enc.record_phase_damage(combo(0, 1), 500.0);
        let out = evaluate_on_bucket(&mut enc, &AdaptationConfig::default(), &PaceConfig::default());
        assert!(out.warnings.is_empty() && out.tightened.is_empty());
        assert!(enc.phase_damage.is_empty());
        assert!(enc.running_damage.is_empty());
    }

    #[test]
    fn running_estimate_is_exponentially_smoothed() {
        let mut enc = encounter();
        enc.record_phase_damage(combo(0, 1), 1000.0);
        evaluate_on_bucket(&mut enc, &cfg(), &PaceConfig::default());
        assert_eq!(enc.running_damage[&combo(0, 1)], 400.0);

        enc.record_phase_damage(combo(0, 1), 1000.0);
        evaluate_on_bucket(&mut enc, &cfg(), &PaceConfig::default());
        assert_eq!(enc.running_damage[&combo(0, 1)], 640.0);
    }

    #[test]
    fn filter_excludes_low_contributors_from_median() {
        // Running 1000 vs 100: the 100 falls at 10% of max and the filter
        // is strict-greater, so the median is taken over {1000} alone. The
        // dominant key's ratio against itself is 1.0 -> no adaptation,
        // rather than the low contributor dragging the median down.
        let mut enc = encounter();
        enc.defense_modifier = 2.0;
        enc.running_damage.insert(combo(0, 1), 1000.0);
        enc.running_damage.insert(combo(1, 2), 100.0);
        // Hold the dominant key's running at 1000 through the EMA.
        enc.record_phase_damage(combo(0, 1), 1000.0);
        let out = evaluate_on_bucket(&mut enc, &cfg(), &PaceConfig::default());
        assert!(out.tightened.is_empty());
        assert!(out.warnings.is_empty());
        assert!(enc.adaptation_factors.is_empty());
    }

    #[test]
    fn dominant_combo_warns_once_then_adapts_while_short() {
        let mut enc = encounter();
        enc.defense_modifier = 2.0; // fight running short
        let heavy = combo(0, 1);

        // Three comparable combos and one 5x outlier.
        for (key, dmg) in [
            (heavy, 5000.0),
            (combo(1, 2), 1000.0),
            (combo(2, 3), 1000.0),
            (combo(3, 4), 1000.0),
        ] {
            enc.record_phase_damage(key, dmg);
        }
        let out = evaluate_on_bucket(&mut enc, &cfg(), &PaceConfig::default());

        // EMA: heavy=2000, others=400 -> median 400, ratio 5.0 >= 4.0.
        assert_eq!(out.warnings, vec![heavy]);
        assert_eq!(out.tightened.len(), 1);
        let (_, factor) = out.tightened[0];
        // 1 - 0.2 * (1 - 400/2000) = 0.84
        assert!((factor - 0.84).abs() < 1e-6);

        // Same shape again: identical ratio, identical factor, no re-warn
        // and no re-send (factor did not tighten past the margin).
        for (key, dmg) in [
            (heavy, 2000.0),
            (combo(1, 2), 400.0),
            (combo(2, 3), 400.0),
            (combo(3, 4), 400.0),
        ] {
            enc.record_phase_damage(key, dmg);
        }
        let out = evaluate_on_bucket(&mut enc, &cfg(), &PaceConfig::default());
        assert!(out.warnings.is_empty());
        assert!(out.tightened.is_empty());
    }

    #[test]
    fn factors_only_tighten() {
        let mut enc = encounter();
        enc.defense_modifier = 2.0;
        let heavy = combo(0, 1);
        enc.adaptation_factors.insert(heavy, 0.84);
        enc.running_damage.insert(heavy, 2000.0);
        enc.running_damage.insert(combo(1, 2), 400.0);
        enc.running_damage.insert(combo(2, 3), 400.0);

        // Ratio 4.8 computes factor ~0.8417: looser than the stored 0.84,
        // so it must not replace it.
        enc.record_phase_damage(heavy, 1800.0);
        enc.record_phase_damage(combo(1, 2), 400.0);
        enc.record_phase_damage(combo(2, 3), 400.0);
        let out = evaluate_on_bucket(&mut enc, &cfg(), &PaceConfig::default());
        assert!(out.tightened.is_empty());
        assert_eq!(enc.adaptation_factors[&heavy], 0.84);

        // A clearly more dominant phase tightens it.
        enc.record_phase_damage(heavy, 20000.0);
        enc.record_phase_damage(combo(1, 2), 2000.0);
        enc.record_phase_damage(combo(2, 3), 2000.0);
        let out = evaluate_on_bucket(&mut enc, &cfg(), &PaceConfig::default());
        assert_eq!(out.tightened.len(), 1);
        assert!(enc.adaptation_factors[&heavy] < 0.84);
    }

    #[test]
    fn no_factor_while_running_long() {
        let mut enc = encounter();
        enc.offense_modifier = 2.0; // fight running long
        enc.record_phase_damage(combo(0, 1), 5000.0);
        enc.record_phase_damage(combo(1, 2), 1000.0);
        enc.record_phase_damage(combo(2, 3), 1000.0);
        let out = evaluate_on_bucket(&mut enc, &cfg(), &PaceConfig::default());
        // The warning still fires (it is pace-independent); the factor
        // does not.
        assert_eq!(out.warnings, vec![combo(0, 1)]);
        assert!(out.tightened.is_empty());
        assert!(enc.adaptation_factors.is_empty());
    }

    #[test]
    fn solo_adaptation_requires_opt_in_and_pace_cap() {
        let pace = PaceConfig::default();
        let lone = combo(0, 1);

        let mut enc = encounter();
        enc.defense_modifier = pace.max_modifier;
        enc.record_phase_damage(lone, 10000.0);
        let out = evaluate_on_bucket(&mut enc, &cfg(), &pace);
        assert!(out.tightened.is_empty());

        let solo_cfg = AdaptationConfig {
            adapt_to_solo: true,
            ..cfg()
        };
        let mut enc = encounter();
        enc.defense_modifier = pace.max_modifier;
        enc.record_phase_damage(lone, 10000.0);
        let out = evaluate_on_bucket(&mut enc, &solo_cfg, &pace);
        assert_eq!(out.tightened.len(), 1);
        // Full configured reduction, no group baseline to scale by.
        assert!((out.tightened[0].1 - 0.8).abs() < 1e-6);

        // Capped pace is required even with the opt-in.
        let mut enc = encounter();
        enc.defense_modifier = 2.0;
        enc.record_phase_damage(lone, 10000.0);
        let out = evaluate_on_bucket(&mut enc, &solo_cfg, &pace);
        assert!(out.tightened.is_empty());
    }

    #[test]
    fn below_min_damage_never_adapts() {
        let mut enc = encounter();
        enc.defense_modifier = 2.0;
        // EMA of 400 -> 160, below the 200 floor even at a huge ratio.
        enc.record_phase_damage(combo(0, 1), 400.0);
        enc.record_phase_damage(combo(1, 2), 40.0);
        let out = evaluate_on_bucket(&mut enc, &cfg(), &PaceConfig::default());
        assert!(out.tightened.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn factor_floor_holds() {
        // A full 1.0 reduction through the solo path would compute 0.0;
        // the floor clamps it to 0.1.
        let pace = PaceConfig::default();
        let harsh = AdaptationConfig {
            max_reduction: 1.0,
            adapt_to_solo: true,
            ..cfg()
        };
        let mut enc = encounter();
        enc.defense_modifier = pace.max_modifier;
        enc.record_phase_damage(combo(0, 1), 10000.0);
        let out = evaluate_on_bucket(&mut enc, &harsh, &pace);
        assert_eq!(out.tightened.len(), 1);
        assert_eq!(out.tightened[0].1, 0.1);
    }
}
