//! Sparse trigger masking at the kernel boundary.
//!
//! A trigger array marks entry opportunities (finite value = opportunity,
//! `NaN` = none). Masking thins those opportunities to a configured rate with
//! one seeded uniform draw per bar, so throughput scales with the rate while
//! staying reproducible bit for bit.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Result of masking one trigger array.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskOutcome {
    /// Triggers that survived masking; masked bars are `NaN`.
    pub intents: Vec<f64>,
    /// Finite triggers at or after warmup, before masking.
    pub eligible: u64,
    /// Finite triggers remaining after masking.
    pub generated: u64,
}

/// Counts only, for observability records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskCounts {
    pub eligible: u64,
    pub generated: u64,
}

impl MaskOutcome {
    pub fn counts(&self) -> MaskCounts {
        MaskCounts {
            eligible: self.eligible,
            generated: self.generated,
        }
    }
}

/// Thin `triggers` to roughly `rate` of its opportunities.
///
/// - `rate >= 1`: the array passes through unchanged, `warmup` included.
/// - `rate <= 0` (or `NaN`): no intents.
/// - otherwise one draw `u ~ U[0,1)` is taken for every bar at/after `warmup`
///   (finite or not, so the draw sequence never depends on the data) and the
///   opportunity is kept iff `u < rate`. Bars before `warmup` produce no intents.
///
/// `eligible` counts the finite triggers the mask could keep: all of them at
/// full rate, those at/after `warmup` otherwise.
pub fn mask_triggers(triggers: &[f64], rate: f64, seed: u64, warmup: usize) -> MaskOutcome {
    if rate >= 1.0 {
        let finite = triggers.iter().filter(|v| v.is_finite()).count() as u64;
        return MaskOutcome {
            intents: triggers.to_vec(),
            eligible: finite,
            generated: finite,
        };
    }

    let n = triggers.len();
    let mut intents = vec![f64::NAN; n];
    let start = warmup.min(n);
    let eligible = triggers[start..].iter().filter(|v| v.is_finite()).count() as u64;

    if rate.is_nan() || rate <= 0.0 {
        return MaskOutcome {
            intents,
            eligible,
            generated: 0,
        };
    }

    let mut generated = 0u64;
    let mut rng = StdRng::seed_from_u64(seed);
    for (slot, &t) in intents.iter_mut().zip(triggers).skip(start) {
        let u: f64 = rng.gen();
        if t.is_finite() && u < rate {
            *slot = t;
            generated += 1;
        }
    }

    MaskOutcome {
        intents,
        eligible,
        generated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opportunities(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| if i % 3 == 0 { f64::NAN } else { 100.0 + i as f64 })
            .collect()
    }

    #[test]
    fn full_rate_passes_the_array_through() {
        let t = opportunities(30);
        for rate in [1.0, 1.5] {
            let out = mask_triggers(&t, rate, 7, 5);
            assert_eq!(out.eligible, out.generated);
            assert_eq!(out.generated, 20);
            for i in 0..30 {
                assert_eq!(out.intents[i].to_bits(), t[i].to_bits());
            }
        }
    }

    #[test]
    fn zero_rate_generates_nothing() {
        let t = opportunities(30);
        let out = mask_triggers(&t, 0.0, 7, 0);
        assert_eq!(out.generated, 0);
        assert_eq!(out.eligible, 20);
        assert!(out.intents.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn same_inputs_are_bit_identical() {
        let t = opportunities(500);
        let a = mask_triggers(&t, 0.4, 42, 10);
        let b = mask_triggers(&t, 0.4, 42, 10);
        assert_eq!(a.generated, b.generated);
        for (x, y) in a.intents.iter().zip(&b.intents) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn generated_scales_with_rate() {
        let t = vec![1.0; 10_000];
        let low = mask_triggers(&t, 0.1, 3, 0).generated as f64;
        let high = mask_triggers(&t, 0.5, 3, 0).generated as f64;
        assert!((low / 10_000.0 - 0.1).abs() < 0.02, "low={low}");
        assert!((high / 10_000.0 - 0.5).abs() < 0.03, "high={high}");
    }

    #[test]
    fn masked_intents_are_subset_of_triggers() {
        let t = opportunities(200);
        let out = mask_triggers(&t, 0.5, 11, 0);
        for (i, v) in out.intents.iter().enumerate() {
            if v.is_finite() {
                assert_eq!(*v, t[i]);
            }
        }
        assert!(out.generated <= out.eligible);
    }

    #[test]
    fn warmup_beyond_series_is_empty() {
        let out = mask_triggers(&[1.0, 2.0], 0.5, 0, 10);
        assert_eq!(out.eligible, 0);
        assert_eq!(out.generated, 0);
    }
}
