//! Identical seeds must give identical runs of the whole pipeline.

use anyhow::Result;
use htm_core::{ComputeCycle, Connections, Parameters, SpatialPooler, TemporalMemory};

fn params(seed: u64) -> Parameters {
    Parameters {
        input_dimensions: vec![48],
        column_dimensions: vec![96],
        cells_per_column: 4,
        potential_radius: Some(12),
        potential_pct: 0.6,
        global_inhibition: false,
        num_active_columns_per_inh_area: Some(6.0),
        update_period: 10,
        activation_threshold: 3,
        min_threshold: 2,
        max_new_synapse_count: 6,
        seed,
        ..Default::default()
    }
}

fn input(step: usize) -> Vec<bool> {
    let offset = (step % 6) * 8;
    (0..48).map(|i| (offset..offset + 8).contains(&i)).collect()
}

fn run(seed: u64, steps: usize) -> Result<Vec<(Vec<usize>, ComputeCycle)>> {
    let mut c = Connections::new(params(seed))?;
    let sp = SpatialPooler::new();
    let tm = TemporalMemory::new();
    sp.init(&mut c)?;
    tm.init(&mut c)?;

    let mut active = vec![false; c.num_columns()];
    let mut history = Vec::with_capacity(steps);
    for step in 0..steps {
        let columns = sp.compute(&mut c, &input(step), &mut active, true)?;
        let cycle = tm.compute(&mut c, &columns, true)?;
        history.push((columns, cycle));
    }
    Ok(history)
}

#[test]
fn same_seed_same_run() -> Result<()> {
    let first = run(1234, 60)?;
    let second = run(1234, 60)?;
    assert_eq!(first.len(), second.len());
    for (step, (a, b)) in first.iter().zip(&second).enumerate() {
        assert_eq!(a, b, "runs diverged at step {step}");
    }
    Ok(())
}

#[test]
fn same_seed_same_pools() -> Result<()> {
    let build = |seed| -> Result<Vec<Vec<f64>>> {
        let mut c = Connections::new(params(seed))?;
        SpatialPooler::new().init(&mut c)?;
        Ok((0..c.num_columns())
            .map(|column| c.permanences_for_column(column))
            .collect())
    };
    assert_eq!(build(99)?, build(99)?);
    Ok(())
}
