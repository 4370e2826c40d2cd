//! Monte Carlo draw simulator.
//!
//! One trial walks the game's probability table one draw at a time: the
//! table position advances after each failure (cycling past the end), resets
//! to the start after each success, and the trial ends when `goal` successes
//! have been recorded. Trials are independent; each gets its own PRNG stream
//! keyed by `(seed, trial_index)`, so results do not depend on how trials
//! are partitioned across worker threads.

use rayon::prelude::*;

use crate::error::EngineError;
use crate::provider::tables::GameSpec;
use crate::sim::rng::Rng;

#[derive(Debug, Clone, Copy)]
pub struct SimulateParams {
    pub goal: u32,
    pub n_sims: u32,
    pub seed: u64,
}

/// Run `n_sims` trials in parallel across the Rayon pool. Output order is
/// trial order, identical to [simulate_serial] for the same inputs.
pub fn simulate(spec: &GameSpec, params: SimulateParams) -> Result<Vec<u64>, EngineError> {
    let step_cap = check_inputs(spec, params)?;
    (0..u64::from(params.n_sims))
        .into_par_iter()
        .map(|trial| run_trial(&spec.probs, params.goal, step_cap, Rng::for_trial(params.seed, trial)))
        .collect()
}

/// Single-threaded variant. Used by determinism tests and the bench.
pub fn simulate_serial(spec: &GameSpec, params: SimulateParams) -> Result<Vec<u64>, EngineError> {
    let step_cap = check_inputs(spec, params)?;
    (0..u64::from(params.n_sims))
        .map(|trial| run_trial(&spec.probs, params.goal, step_cap, Rng::for_trial(params.seed, trial)))
        .collect()
}

fn check_inputs(spec: &GameSpec, params: SimulateParams) -> Result<u64, EngineError> {
    if params.goal == 0 {
        return Err(EngineError::Validation("GOAL must be positive".to_string()));
    }
    if params.n_sims == 0 {
        return Err(EngineError::Validation("N_SIMS must be positive".to_string()));
    }
    if spec.is_empty() || !spec.probs.iter().any(|p| *p > 0.0) {
        return Err(EngineError::InvalidGoal(format!(
            "game {} table has no reachable success",
            spec.game_id
        )));
    }
    // Generous bound; overrunning it means the goal is effectively
    // unreachable and the trial must not loop forever.
    let step_cap = u64::from(params.goal)
        .saturating_mul(spec.len() as u64)
        .saturating_mul(64)
        .max(100_000);
    Ok(step_cap)
}

fn run_trial(probs: &[f64], goal: u32, step_cap: u64, mut rng: Rng) -> Result<u64, EngineError> {
    let mut draws: u64 = 0;
    let mut successes: u32 = 0;
    let mut step: usize = 0;

    while successes < goal {
        if draws >= step_cap {
            return Err(EngineError::InvalidGoal(format!(
                "trial exceeded {step_cap} draws before reaching goal {goal}"
            )));
        }
        draws += 1;
        if rng.next_f64() < probs[step] {
            successes += 1;
            step = 0;
        } else {
            step += 1;
            if step == probs.len() {
                step = 0;
            }
        }
    }

    Ok(draws)
}
