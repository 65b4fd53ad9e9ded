use std::{fs::File, path::Path};

use anyhow::Result;
use ethersim::{
    network::snapshot::NetworkSnapshot, util::logging::NothingLogger, CollisionPhase,
};
use serde::Serialize;

use crate::SimulationArgs;

#[derive(Serialize)]
struct TraceResult {
    phases: Vec<CollisionPhase>,
    snapshots: Vec<NetworkSnapshot>,
}

pub(super) fn trace(args: &SimulationArgs, output_path: Option<&Path>) -> Result<()> {
    let mut network = args.build(|_| NothingLogger)?;

    let mut result = TraceResult {
        phases: Vec::new(),
        snapshots: vec![network.snapshot()],
    };
    for _ in 0..args.ticks {
        let phase = network.advance();
        if phase == CollisionPhase::Detected {
            network.resume();
        }
        result.phases.push(phase);
        result.snapshots.push(network.snapshot());
    }

    if let Some(output_path) = output_path {
        let file = File::create(output_path)?;
        serde_json::to_writer(file, &result)?;
    } else {
        println!("{}", serde_json::to_string(&result)?);
    }
    Ok(())
}
