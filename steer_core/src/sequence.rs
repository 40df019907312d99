//! Randomized trial plan.
//!
//! A plan is four contiguous blocks, one per task × feedback condition. Block
//! order is shuffled, and each block independently shuffles its
//! level × repetition cells before the 1-based in-block positions are assigned.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::SequenceCfg;
use crate::error::{BuildError, Result};
use crate::types::{Condition, TrialSpec, TunnelGeometry};

/// Build a plan with the given RNG.
pub fn generate<R: Rng + ?Sized>(
    levels: &[TunnelGeometry],
    reps_per_level: u32,
    rng: &mut R,
) -> Result<Vec<TrialSpec>> {
    if levels.is_empty() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "difficulty table is empty",
        )));
    }
    if reps_per_level == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "reps_per_level must be >= 1",
        )));
    }

    let mut blocks = Condition::ALL;
    blocks.shuffle(rng);

    let per_block = levels.len() * reps_per_level as usize;
    let mut plan = Vec::with_capacity(blocks.len() * per_block);
    for condition in blocks {
        let mut cells: Vec<(u32, TunnelGeometry, u32)> = levels
            .iter()
            .enumerate()
            .flat_map(|(i, g)| (1..=reps_per_level).map(move |rep| (i as u32 + 1, *g, rep)))
            .collect();
        cells.shuffle(rng);
        plan.extend(cells.into_iter().enumerate().map(
            |(pos, (level, geometry, repetition))| TrialSpec {
                condition,
                geometry,
                level,
                repetition,
                order_in_block: pos as u32 + 1,
            },
        ));
    }
    Ok(plan)
}

/// Build a plan from config, seeded when `cfg.seed` is set.
pub fn generate_plan(cfg: &SequenceCfg) -> Result<Vec<TrialSpec>> {
    let plan = match cfg.seed {
        Some(seed) => generate(
            &cfg.levels,
            cfg.reps_per_level,
            &mut StdRng::seed_from_u64(seed),
        )?,
        None => generate(&cfg.levels, cfg.reps_per_level, &mut rand::rng())?,
    };
    tracing::debug!(
        trials = plan.len(),
        seeded = cfg.seed.is_some(),
        "trial plan generated"
    );
    Ok(plan)
}

/// Run-length view of a plan: each maximal run of one condition with its length.
pub fn blocks(plan: &[TrialSpec]) -> Vec<(Condition, usize)> {
    let mut out: Vec<(Condition, usize)> = Vec::new();
    for spec in plan {
        match out.last_mut() {
            Some((c, n)) if *c == spec.condition => *n += 1,
            _ => out.push((spec.condition, 1)),
        }
    }
    out
}
