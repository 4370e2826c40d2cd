//! Per-game draw probability tables.
//!
//! A game's table gives the success probability of each step since the last
//! success. The built-in catalog derives tables from pity-curve parameters:
//! flat base probability up to `accel_start`, then a linear ramp clamped
//! to 1.0.

use std::sync::Arc;

/// Immutable per-game probability table, shared out of the provider cache.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSpec {
    pub game_id: u32,
    /// Success probability at step 1, 2, ... since the last success.
    /// Every value is in (0, 1].
    pub probs: Arc<Vec<f64>>,
}

impl GameSpec {
    pub fn new(game_id: u32, probs: Vec<f64>) -> Self {
        Self {
            game_id,
            probs: Arc::new(probs),
        }
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }
}

/// Pity-curve parameters for one game.
#[derive(Debug, Clone, Copy)]
pub struct PityCurve {
    pub max_steps: u32,
    pub base_p: f64,
    pub accel_start: u32,
    pub accel_step: f64,
}

impl PityCurve {
    /// Expand the curve into per-step success probabilities.
    pub fn success_table(&self) -> Vec<f64> {
        (1..=self.max_steps)
            .map(|step| {
                if step <= self.accel_start {
                    self.base_p
                } else {
                    let ramped = self.base_p + self.accel_step * f64::from(step - self.accel_start);
                    ramped.min(1.0)
                }
            })
            .collect()
    }
}

/// Built-in game catalog. Game ids are stable: external stores may override
/// them but ship tables must keep the same shape.
pub const BUILTIN_CURVES: &[(u32, PityCurve)] = &[
    (
        1,
        PityCurve {
            max_steps: 80,
            base_p: 0.008,
            accel_start: 63,
            accel_step: 0.06,
        },
    ),
    (
        2,
        PityCurve {
            max_steps: 90,
            base_p: 0.006,
            accel_start: 73,
            accel_step: 0.06,
        },
    ),
];

pub fn builtin_curve(game_id: u32) -> Option<PityCurve> {
    BUILTIN_CURVES
        .iter()
        .find(|(id, _)| *id == game_id)
        .map(|(_, curve)| *curve)
}

/// Reject tables that the simulator cannot make progress against.
pub fn validate_table(probs: &[f64]) -> Result<(), String> {
    if probs.is_empty() {
        return Err("table is empty".to_string());
    }
    for (index, p) in probs.iter().enumerate() {
        if !p.is_finite() || *p <= 0.0 || *p > 1.0 {
            return Err(format!("step {} probability {} outside (0, 1]", index + 1, p));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game1_table_has_expected_shape() {
        let curve = builtin_curve(1).unwrap();
        let table = curve.success_table();
        assert_eq!(table.len(), 80);
        assert_eq!(table[0], 0.008);
        assert_eq!(table[62], 0.008);
        assert!(table[63] > 0.008);
        // The ramp reaches certainty at the last step.
        assert_eq!(table[79], 1.0);
    }

    #[test]
    fn game2_table_ramps_later() {
        let table = builtin_curve(2).unwrap().success_table();
        assert_eq!(table.len(), 90);
        assert_eq!(table[72], 0.006);
        assert!(table[73] > 0.006);
    }

    #[test]
    fn unknown_game_has_no_builtin_curve() {
        assert!(builtin_curve(999999).is_none());
    }

    #[test]
    fn validate_rejects_bad_tables() {
        assert!(validate_table(&[]).is_err());
        assert!(validate_table(&[0.5, 0.0]).is_err());
        assert!(validate_table(&[0.5, 1.5]).is_err());
        assert!(validate_table(&[0.5, f64::NAN]).is_err());
        assert!(validate_table(&[0.5, 1.0]).is_ok());
    }
}
