use std::thread;

use anyhow::Result;
use ethersim::{util::logging::PrintLogger, CollisionPhase};

use crate::SimulationArgs;

pub(super) fn run(args: &SimulationArgs, realtime: bool) -> Result<()> {
    let mut network = args.build(|name| PrintLogger::new(name.to_owned()))?;

    for _ in 0..args.ticks {
        // Nobody is around to pick slots by hand, so carry on straight away
        if network.advance() == CollisionPhase::Detected {
            network.resume();
        }
        if realtime {
            thread::sleep(network.tick_rate().period());
        }
    }

    for station in network.stations() {
        println!(
            "{}: received {} packets, {} telegrams still queued",
            station.name(),
            station.received_count(),
            station.telegrams().count()
        );
    }
    Ok(())
}
