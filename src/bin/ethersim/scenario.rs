use std::{path::PathBuf, str::FromStr};

use anyhow::{anyhow, Result};
use ethersim::{
    simulation::StationId, util::logging::Logger, util::rand::Rng, Config, Network,
    NetworkConfig,
};

/// Options shared by every subcommand that runs a simulation.
#[derive(clap::Args, Debug)]
pub struct SimulationArgs {
    /// Network config file (JSON), the default bus if omitted
    #[arg(long)]
    topology: Option<PathBuf>,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 1000)]
    pub ticks: u64,

    /// Seed for backoff slot selection
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Telegram to queue before the first tick, as `from:to` or `from:to:length`
    #[arg(long = "send", value_name = "FROM:TO[:LENGTH]")]
    sends: Vec<SendArg>,

    /// Slot a station picks on its next collision, as `station:slot`
    #[arg(long = "slot", value_name = "STATION:SLOT")]
    slots: Vec<SlotArg>,

    /// Use short telegrams when no length is given
    #[arg(long)]
    short: bool,
}

#[derive(Debug, Clone)]
struct SendArg {
    from: String,
    to: String,
    length: Option<u32>,
}

impl FromStr for SendArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(from), Some(to), length, None) if !from.is_empty() && !to.is_empty() => {
                Ok(SendArg {
                    from: from.to_owned(),
                    to: to.to_owned(),
                    length: length
                        .map(|l| l.parse().map_err(|_| format!("invalid length `{l}`")))
                        .transpose()?,
                })
            }
            _ => Err(format!("expected FROM:TO[:LENGTH], got `{s}`")),
        }
    }
}

#[derive(Debug, Clone)]
struct SlotArg {
    station: String,
    slot: u32,
}

impl FromStr for SlotArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (station, slot) = s
            .split_once(':')
            .ok_or_else(|| format!("expected STATION:SLOT, got `{s}`"))?;
        Ok(SlotArg {
            station: station.to_owned(),
            slot: slot.parse().map_err(|_| format!("invalid slot `{slot}`"))?,
        })
    }
}

impl SimulationArgs {
    /// Builds the network and queues the requested telegrams.
    pub fn build<L>(&self, new_logger: impl FnMut(&str) -> L) -> Result<Network<L>>
    where
        L: Logger,
    {
        let config = match &self.topology {
            Some(path) => NetworkConfig::load(path)?,
            None => NetworkConfig::default(),
        };
        let mut network = Network::new(&config, Rng::from_seed(self.seed), new_logger)?;

        if self.short {
            network.use_short_telegrams();
        }

        for send in &self.sends {
            let from = station(&network, &send.from)?;
            let to = station(&network, &send.to)?;
            match send.length {
                Some(length) => network.send_with_length(from, to, length),
                None => network.send(from, to),
            }
        }

        for slot in &self.slots {
            let id = station(&network, &slot.station)?;
            network
                .station_mut(id)
                .backoff_mut()
                .set_manual_slot(Some(slot.slot));
        }

        Ok(network)
    }
}

fn station<L>(network: &Network<L>, name: &str) -> Result<StationId> {
    network
        .station_id(name)
        .ok_or_else(|| anyhow!("no station named `{name}`"))
}
