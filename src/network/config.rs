use itertools::Itertools;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    quantities::TickRate,
    simulation::{ComponentId, SegmentId, StationId},
};

use super::{
    backoff::DEFAULT_MAX_ATTEMPT_COUNT,
    station::DEFAULT_SLOT_DURATION,
    telegram::{TelegramLengthPreset, TelegramLengths},
};

const DEFAULT_STATIONS: [&str; 5] = ["apollo", "hermes", "pluto", "vesta", "minerva"];
/// Number of bus segments between two neighbouring stations' taps.
const DEFAULT_SPACING: usize = 2;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StationConfig {
    pub name: String,
    #[serde(default = "default_max_attempt_count")]
    pub max_attempt_count: u32,
}

impl StationConfig {
    #[must_use]
    pub fn named(name: &str) -> StationConfig {
        StationConfig {
            name: name.to_owned(),
            max_attempt_count: DEFAULT_MAX_ATTEMPT_COUNT,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SegmentConfig {
    pub name: String,
}

impl SegmentConfig {
    #[must_use]
    pub fn named(name: &str) -> SegmentConfig {
        SegmentConfig {
            name: name.to_owned(),
        }
    }
}

/// Static description of a collision domain. Links are symmetric.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub stations: Vec<StationConfig>,
    pub segments: Vec<SegmentConfig>,
    pub links: Vec<(String, String)>,
    #[serde(default = "default_slot_duration")]
    pub slot_duration: u32,
    #[serde(default)]
    pub tick_rate: TickRate,
    #[serde(default)]
    pub telegram_lengths: TelegramLengths,
    #[serde(default)]
    pub initial_telegram_length: TelegramLengthPreset,
}

const fn default_max_attempt_count() -> u32 {
    DEFAULT_MAX_ATTEMPT_COUNT
}

const fn default_slot_duration() -> u32 {
    DEFAULT_SLOT_DURATION
}

impl NetworkConfig {
    /// Stations hanging off a single straight bus, `spacing` segments apart.
    #[must_use]
    pub fn bus(station_names: &[&str], spacing: usize) -> NetworkConfig {
        let spacing = spacing.max(1);
        let bus_length = station_names.len().saturating_sub(1) * spacing + 1;
        let segment_name = |i: usize| format!("cbl-{}", i + 1);

        let segments = (0..bus_length)
            .map(|i| SegmentConfig {
                name: segment_name(i),
            })
            .collect_vec();
        let taps = station_names
            .iter()
            .enumerate()
            .map(|(i, name)| ((*name).to_owned(), segment_name(i * spacing)));
        let bus = (1..bus_length).map(|i| (segment_name(i - 1), segment_name(i)));

        NetworkConfig {
            stations: station_names.iter().map(|n| StationConfig::named(n)).collect_vec(),
            segments,
            links: taps.chain(bus).collect_vec(),
            slot_duration: DEFAULT_SLOT_DURATION,
            tick_rate: TickRate::DEFAULT,
            telegram_lengths: TelegramLengths::default(),
            initial_telegram_length: TelegramLengthPreset::default(),
        }
    }

    pub(crate) fn resolve(&self) -> Result<Topology, ConfigError> {
        let mut names = FxHashMap::default();
        let declared = self
            .stations
            .iter()
            .enumerate()
            .map(|(i, s)| (&s.name, ComponentId::Station(StationId(i))))
            .chain(
                self.segments
                    .iter()
                    .enumerate()
                    .map(|(i, s)| (&s.name, ComponentId::Segment(SegmentId(i)))),
            );
        for (name, id) in declared {
            if names.insert(name.clone(), id).is_some() {
                return Err(ConfigError::DuplicateComponent(name.clone()));
            }
        }

        let mut topology = Topology {
            station_connections: vec![Vec::new(); self.stations.len()],
            segment_connections: vec![Vec::new(); self.segments.len()],
            names,
        };
        let mut domains = Domains::new(self.stations.len() + self.segments.len());
        let mut linked = FxHashSet::default();

        for (a, b) in &self.links {
            let lookup = |name: &String, referenced_by: &String| {
                topology
                    .names
                    .get(name)
                    .copied()
                    .ok_or_else(|| ConfigError::UnknownComponent {
                        name: name.clone(),
                        referenced_by: referenced_by.clone(),
                    })
            };
            let id_a = lookup(a, b)?;
            let id_b = lookup(b, a)?;

            if id_a == id_b {
                return Err(ConfigError::SelfLink(a.clone()));
            }
            if let (ComponentId::Station(_), ComponentId::Station(_)) = (id_a, id_b) {
                return Err(ConfigError::StationLink(a.clone(), b.clone()));
            }
            if !linked.insert((id_a.min(id_b), id_a.max(id_b))) {
                return Err(ConfigError::DuplicateLink(a.clone(), b.clone()));
            }
            if !domains.join(topology.flat_index(id_a), topology.flat_index(id_b)) {
                return Err(ConfigError::Cycle(a.clone(), b.clone()));
            }

            topology.connections_mut(id_a).push(id_b);
            topology.connections_mut(id_b).push(id_a);
        }

        Ok(topology)
    }
}

impl Default for NetworkConfig {
    fn default() -> NetworkConfig {
        NetworkConfig::bus(&DEFAULT_STATIONS, DEFAULT_SPACING)
    }
}

/// Validated wiring, indexed by component handle.
#[derive(Debug)]
pub(crate) struct Topology {
    pub(crate) names: FxHashMap<String, ComponentId>,
    pub(crate) station_connections: Vec<Vec<ComponentId>>,
    pub(crate) segment_connections: Vec<Vec<ComponentId>>,
}

impl Topology {
    fn flat_index(&self, id: ComponentId) -> usize {
        match id {
            ComponentId::Station(StationId(i)) => i,
            ComponentId::Segment(SegmentId(i)) => self.station_connections.len() + i,
        }
    }

    fn connections_mut(&mut self, id: ComponentId) -> &mut Vec<ComponentId> {
        match id {
            ComponentId::Station(StationId(i)) => &mut self.station_connections[i],
            ComponentId::Segment(SegmentId(i)) => &mut self.segment_connections[i],
        }
    }
}

/// Union-find over components, used to reject loops while wiring.
struct Domains {
    parent: Vec<usize>,
}

impl Domains {
    fn new(size: usize) -> Domains {
        Domains {
            parent: (0..size).collect(),
        }
    }

    fn root(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    /// Merges the domains of `a` and `b`, returning false if they already
    /// were the same domain.
    fn join(&mut self, a: usize, b: usize) -> bool {
        let (root_a, root_b) = (self.root(a), self.root(b));
        if root_a == root_b {
            return false;
        }
        self.parent[root_a] = root_b;
        true
    }
}
