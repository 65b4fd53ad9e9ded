use itertools::Itertools;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::{
    error::ConfigError,
    quantities::{Tick, TickRate},
    simulation::{Component, ComponentId, EffectQueue, SegmentId, StationId},
    util::{logging::Logger, rand::Rng},
};

use self::{
    backoff::BackoffSelector,
    config::NetworkConfig,
    segment::Segment,
    snapshot::{NetworkSnapshot, SegmentSnapshot, StationSnapshot},
    station::Station,
    telegram::{TelegramBuilder, TelegramLengthPreset},
};

pub mod backoff;
pub mod config;
pub mod packet;
pub mod segment;
pub mod snapshot;
pub mod station;
pub mod telegram;

/// Where the network-wide collision barrier stands after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPhase {
    /// No station has heard a collision.
    Clear,
    /// Some, but not all, stations have heard a collision.
    Propagating,
    /// Every station has heard the collision; the network paused itself.
    Detected,
    /// Markers were cleared and the contenders picked their backoff.
    Resolved,
}

/// A single collision domain, driven one tick at a time by an external clock.
#[derive(Debug)]
pub struct Network<L> {
    stations: Vec<Station<L>>,
    segments: Vec<Segment>,
    names: FxHashMap<String, ComponentId>,
    tick: Tick,
    slot_duration: u32,
    collision_found: bool,
    running: bool,
    tick_rate: TickRate,
    telegram_builder: TelegramBuilder,
    rng: Rng,
    logger: L,
}

impl<L> Network<L>
where
    L: Logger,
{
    /// Wires up the network described by `config`. `new_logger` is called
    /// once per station with the station's name and once for the network.
    pub fn new(
        config: &NetworkConfig,
        rng: Rng,
        mut new_logger: impl FnMut(&str) -> L,
    ) -> Result<Network<L>, ConfigError> {
        let topology = config.resolve()?;

        let stations = config
            .stations
            .iter()
            .zip(topology.station_connections)
            .enumerate()
            .map(|(i, (station_config, connections))| {
                let mut station = Station::new(
                    StationId(i),
                    station_config.name.clone(),
                    BackoffSelector::new(station_config.max_attempt_count),
                    new_logger(&station_config.name),
                );
                connections
                    .into_iter()
                    .for_each(|c| station.add_connection(c));
                station
            })
            .collect();

        let segments = config
            .segments
            .iter()
            .zip(topology.segment_connections)
            .enumerate()
            .map(|(i, (segment_config, connections))| {
                let mut segment = Segment::new(SegmentId(i), segment_config.name.clone());
                connections
                    .into_iter()
                    .for_each(|c| segment.add_connection(c));
                segment
            })
            .collect();

        Ok(Network {
            stations,
            segments,
            names: topology.names,
            tick: Tick::SIM_START,
            slot_duration: config.slot_duration,
            collision_found: false,
            running: true,
            tick_rate: config.tick_rate,
            telegram_builder: TelegramBuilder::new(
                config.telegram_lengths,
                config.initial_telegram_length,
            ),
            rng,
            logger: new_logger("network"),
        })
    }

    /// Runs one tick, whether or not the network is paused.
    pub fn advance(&mut self) -> CollisionPhase {
        for segment in &mut self.segments {
            segment.pre_tick();
        }

        let mut effects = EffectQueue::new();
        for station in &mut self.stations {
            effects.push_all(station.tick());
        }
        for segment in &mut self.segments {
            effects.push_all(segment.tick());
        }
        self.handle_messages(&mut effects);

        self.tick = self.tick.next();
        self.resolve_collisions()
    }

    /// Advances until paused or until `max_ticks` ticks have run. Returns the
    /// number of ticks that ran.
    pub fn run(&mut self, max_ticks: u64) -> u64 {
        let mut ran = 0;
        while self.running && ran < max_ticks {
            self.advance();
            ran += 1;
        }
        ran
    }

    /// Advances for as long as `condition` holds. Returns the number of ticks
    /// that ran.
    pub fn run_while(&mut self, mut condition: impl FnMut(&Self) -> bool) -> u64 {
        let mut ran = 0;
        while condition(self) {
            self.advance();
            ran += 1;
        }
        ran
    }

    fn handle_messages(&mut self, effects: &mut EffectQueue) {
        while let Some(message) = effects.pop_next() {
            let destination = message.destination();
            self.component_mut(destination).receive(message.into_packet());
        }
    }

    fn component_mut(&mut self, id: ComponentId) -> &mut dyn Component {
        match id {
            ComponentId::Station(StationId(i)) => &mut self.stations[i],
            ComponentId::Segment(SegmentId(i)) => &mut self.segments[i],
        }
    }

    /// A collision is only acted on once it has reached every station. The
    /// first tick on which that holds pauses the network so an operator can
    /// pick slots by hand; the tick after that clears the markers and lets
    /// every contender back off.
    fn resolve_collisions(&mut self) -> CollisionPhase {
        let heard = self.stations.iter().filter(|s| s.is_collision()).count();
        if heard == 0 {
            return CollisionPhase::Clear;
        }
        if heard < self.stations.len() {
            return CollisionPhase::Propagating;
        }

        if !self.collision_found {
            self.collision_found = true;
            log!(self.logger, "collision reached every station at {}", self.tick);
            self.pause();
            return CollisionPhase::Detected;
        }

        for segment in &mut self.segments {
            segment.clear();
        }
        for station in &mut self.stations {
            station.handle_collision(&mut self.rng, self.slot_duration);
        }
        self.collision_found = false;
        log!(self.logger, "collision resolved at {}", self.tick);
        CollisionPhase::Resolved
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn resume(&mut self) {
        self.running = true;
    }

    pub fn toggle(&mut self) {
        self.running = !self.running;
    }

    pub fn set_tick_rate(&mut self, tick_rate: TickRate) {
        log!(self.logger, "setting tick rate to {}", tick_rate);
        self.tick_rate = tick_rate;
    }

    /// Doubles the tick rate unless that would exceed [`TickRate::MAX`].
    pub fn increase_speed(&mut self) -> TickRate {
        if let Some(tick_rate) = self.tick_rate.doubled() {
            self.set_tick_rate(tick_rate);
        }
        self.tick_rate
    }

    /// Halves the tick rate unless that would drop below [`TickRate::MIN`].
    pub fn decrease_speed(&mut self) -> TickRate {
        if let Some(tick_rate) = self.tick_rate.halved() {
            self.set_tick_rate(tick_rate);
        }
        self.tick_rate
    }

    /// Queues a telegram of the currently selected length.
    ///
    /// # Panics
    ///
    /// Panics if `from` does not belong to this network.
    pub fn send(&mut self, from: StationId, to: StationId) {
        let telegram = self.telegram_builder.create(to);
        self.stations[from.index()].push_telegram(telegram);
    }

    /// Queues a telegram of `length` packets.
    ///
    /// # Panics
    ///
    /// Panics if `from` does not belong to this network.
    pub fn send_with_length(&mut self, from: StationId, to: StationId, length: u32) {
        let telegram = self.telegram_builder.create_with_length(to, length);
        self.stations[from.index()].push_telegram(telegram);
    }

    pub fn use_short_telegrams(&mut self) {
        self.telegram_builder.use_preset(TelegramLengthPreset::Short);
    }

    pub fn use_long_telegrams(&mut self) {
        self.telegram_builder.use_preset(TelegramLengthPreset::Long);
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this network.
    pub fn station_mut(&mut self, id: StationId) -> &mut Station<L> {
        &mut self.stations[id.index()]
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this network.
    pub fn segment_mut(&mut self, id: SegmentId) -> &mut Segment {
        &mut self.segments[id.index()]
    }
}

impl<L> Network<L> {
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub const fn collision_found(&self) -> bool {
        self.collision_found
    }

    #[must_use]
    pub const fn tick_rate(&self) -> TickRate {
        self.tick_rate
    }

    #[must_use]
    pub const fn slot_duration(&self) -> u32 {
        self.slot_duration
    }

    #[must_use]
    pub const fn telegram_length(&self) -> u32 {
        self.telegram_builder.length()
    }

    #[must_use]
    pub fn station(&self, id: StationId) -> &Station<L> {
        &self.stations[id.index()]
    }

    #[must_use]
    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segments[id.index()]
    }

    #[must_use]
    pub fn stations(&self) -> &[Station<L>] {
        &self.stations
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        self.names.get(name).copied()
    }

    #[must_use]
    pub fn station_id(&self, name: &str) -> Option<StationId> {
        match self.component_id(name)? {
            ComponentId::Station(id) => Some(id),
            ComponentId::Segment(_) => None,
        }
    }

    #[must_use]
    pub fn segment_id(&self, name: &str) -> Option<SegmentId> {
        match self.component_id(name)? {
            ComponentId::Segment(id) => Some(id),
            ComponentId::Station(_) => None,
        }
    }

    #[must_use]
    pub fn name_of(&self, id: ComponentId) -> &str {
        match id {
            ComponentId::Station(id) => self.station(id).name(),
            ComponentId::Segment(id) => self.segment(id).name(),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            tick: self.tick,
            running: self.running,
            collision_found: self.collision_found,
            stations: self.stations.iter().map(StationSnapshot::from).collect_vec(),
            segments: self.segments.iter().map(SegmentSnapshot::from).collect_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        error::ConfigError,
        network::{
            config::{NetworkConfig, SegmentConfig, StationConfig},
            packet::Tag,
        },
        quantities::{Tick, TickRate},
        simulation::{Component, ComponentId, StationId},
        util::{
            logging::{NothingLogger, RecordingLogger},
            rand::Rng,
        },
    };

    use super::{CollisionPhase, Network};

    /// Every station tapped straight onto one shared segment.
    fn single_segment(stations: &[&str]) -> NetworkConfig {
        NetworkConfig {
            stations: stations.iter().map(|n| StationConfig::named(n)).collect(),
            segments: vec![SegmentConfig::named("s")],
            links: stations
                .iter()
                .map(|n| ((*n).to_owned(), "s".to_owned()))
                .collect(),
            ..NetworkConfig::bus(&[], 1)
        }
    }

    fn network(config: &NetworkConfig) -> Network<NothingLogger> {
        Network::new(config, Rng::from_seed(0), |_| NothingLogger).unwrap()
    }

    fn id<L>(network: &Network<L>, name: &str) -> StationId {
        network.station_id(name).unwrap()
    }

    #[test]
    fn lookup_by_name() {
        let network = network(&NetworkConfig::default());
        assert_eq!(network.stations().len(), 5);
        assert_eq!(network.segments().len(), 9);

        let pluto = id(&network, "pluto");
        assert_eq!(network.station(pluto).name(), "pluto");
        assert_eq!(network.name_of(pluto.into()), "pluto");

        let cable = network.segment_id("cbl-4").unwrap();
        assert_eq!(network.name_of(ComponentId::Segment(cable)), "cbl-4");
        let tap = network.segment_id("cbl-5").unwrap();
        assert_eq!(network.station(pluto).connections(), [ComponentId::Segment(tap)]);
        assert_eq!(network.segment(tap).connections().len(), 3);
        assert_eq!(network.station_id("cbl-4"), None);
        assert_eq!(network.segment_id("pluto"), None);
        assert_eq!(network.component_id("nowhere"), None);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = single_segment(&["a", "b"]);
        config.links.push(("b".to_owned(), "t".to_owned()));
        assert_eq!(
            Network::new(&config, Rng::from_seed(0), |_| NothingLogger).unwrap_err(),
            ConfigError::UnknownComponent {
                name: "t".to_owned(),
                referenced_by: "b".to_owned(),
            }
        );
    }

    #[test]
    fn stations_cannot_share_a_direct_link() {
        let config = NetworkConfig {
            stations: vec![StationConfig::named("a"), StationConfig::named("b")],
            segments: vec![],
            links: vec![("a".to_owned(), "b".to_owned())],
            ..NetworkConfig::bus(&[], 1)
        };
        assert_eq!(
            Network::new(&config, Rng::from_seed(0), |_| NothingLogger).unwrap_err(),
            ConfigError::StationLink("a".to_owned(), "b".to_owned())
        );
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn handles_from_another_network_panic() {
        let larger = network(&NetworkConfig::default());
        let minerva = id(&larger, "minerva");

        let mut smaller = network(&single_segment(&["a", "b"]));
        let b = id(&smaller, "b");
        smaller.send(minerva, b);
    }

    #[test]
    fn telegram_crosses_one_segment() {
        let mut network = network(&single_segment(&["a", "b"]));
        let (a, b) = (id(&network, "a"), id(&network, "b"));
        network.send_with_length(a, b, 3);

        // One tick onto the segment, then one packet per tick off it
        for _ in 0..4 {
            assert_eq!(network.advance(), CollisionPhase::Clear);
        }
        assert_eq!(network.station(b).received_count(), 3);
        assert_eq!(network.station(a).received_count(), 0);
        assert!(!network.station(a).is_sending());
        assert_eq!(network.tick(), Tick::from_sim_start(4));
    }

    #[test]
    fn packets_reach_every_station_on_a_bus() {
        let mut network = network(&NetworkConfig::default());
        let (apollo, minerva) = (id(&network, "apollo"), id(&network, "minerva"));
        network.send_with_length(apollo, minerva, 1);

        network.run(20);
        assert_eq!(network.station(minerva).received_count(), 1);
        for station in network.stations() {
            assert!(!station.is_collision());
        }
        assert!(network.segments().iter().all(|s| s.current_signal().is_none()));
    }

    #[test]
    fn simultaneous_senders_collide_and_back_off() {
        let mut network = Network::new(
            &single_segment(&["a", "b", "c"]),
            Rng::from_seed(0),
            |_| RecordingLogger::default(),
        )
        .unwrap();
        let (a, b, c) = (id(&network, "a"), id(&network, "b"), id(&network, "c"));
        network.send_with_length(a, c, 5);
        network.send_with_length(b, c, 5);
        network.station_mut(a).backoff_mut().set_manual_slot(Some(1));
        network.station_mut(b).backoff_mut().set_manual_slot(Some(2));

        // Both packets land on the segment during the same tick
        assert_eq!(network.advance(), CollisionPhase::Clear);
        let segment = network.segment_id("s").unwrap();
        assert!(network.segment(segment).is_collision());

        assert_eq!(network.advance(), CollisionPhase::Detected);
        assert!(network.collision_found());
        assert!(!network.is_running());
        assert!(network.stations().iter().all(|s| s.is_collision()));

        assert_eq!(network.advance(), CollisionPhase::Resolved);
        assert!(!network.collision_found());
        assert!(!network.segment(segment).is_collision());
        assert_eq!(network.station(a).wait_time(), 50);
        assert_eq!(network.station(b).wait_time(), 100);
        assert_eq!(network.station(c).wait_time(), 0);
        assert_eq!(network.station(a).backoff().failed_attempt_count(), 1);
        assert!(network.stations().iter().all(|s| !s.is_collision()));
        assert_eq!(
            network.logger.messages,
            vec![
                "collision reached every station at 2t",
                "collision resolved at 3t"
            ]
        );

        for _ in 0..200 {
            assert_eq!(network.advance(), CollisionPhase::Clear);
        }
        assert_eq!(network.station(c).received_count(), 10);
        for station in [a, b] {
            assert!(!network.station(station).is_sending());
            assert_eq!(network.station(station).backoff().failed_attempt_count(), 0);
        }
    }

    #[test]
    fn collision_spreads_along_the_bus_before_it_is_resolved() {
        let mut network = network(&NetworkConfig::default());
        let apollo = id(&network, "apollo");
        let minerva = id(&network, "minerva");
        let vesta = id(&network, "vesta");
        network.send(apollo, vesta);
        network.send(minerva, vesta);
        network.station_mut(apollo).backoff_mut().set_manual_slot(Some(1));
        network.station_mut(minerva).backoff_mut().set_manual_slot(Some(3));

        // The packets meet in the middle of the bus on the fifth tick, and
        // the ends hear about it five ticks later.
        let phases: Vec<CollisionPhase> = (0..10).map(|_| network.advance()).collect();
        assert_eq!(phases[..5].to_vec(), vec![CollisionPhase::Clear; 5]);
        assert_eq!(phases[5..9].to_vec(), vec![CollisionPhase::Propagating; 4]);
        assert_eq!(phases[9], CollisionPhase::Detected);
        assert!(network.segments().iter().all(|s| s.is_collision()));

        network.resume();
        assert_eq!(network.advance(), CollisionPhase::Resolved);
        assert_eq!(network.station(apollo).wait_time(), 50);
        assert_eq!(network.station(minerva).wait_time(), 150);
        assert!(network.segments().iter().all(|s| !s.is_collision()));
        assert!(network.is_running());
    }

    #[test]
    fn run_stops_when_a_collision_is_detected() {
        let mut network = network(&NetworkConfig::default());
        let apollo = id(&network, "apollo");
        let minerva = id(&network, "minerva");
        network.send(apollo, minerva);
        network.send(minerva, apollo);

        assert_eq!(network.run(1000), 10);
        assert!(network.collision_found());
        assert_eq!(network.run(1000), 0);

        network.resume();
        let ran = network.run_while(|n| n.collision_found());
        assert_eq!(ran, 1);
        assert!(!network.collision_found());
    }

    #[test]
    fn quiet_network_stays_unchanged() {
        let mut network = network(&NetworkConfig::default());
        let before = network.snapshot();
        for _ in 0..100 {
            assert_eq!(network.advance(), CollisionPhase::Clear);
        }
        let after = network.snapshot();
        assert_eq!(after.stations, before.stations);
        assert_eq!(after.segments, before.segments);
        assert_eq!(after.tick, Tick::from_sim_start(100));
    }

    #[test]
    fn same_seed_same_run() {
        let mut config = single_segment(&["a", "b", "c", "d"]);
        config.slot_duration = 3;
        let run = || {
            let mut network = network(&config);
            let ids: Vec<StationId> = ["a", "b", "c", "d"]
                .iter()
                .map(|n| id(&network, n))
                .collect();
            network.send_with_length(ids[0], ids[3], 20);
            network.send_with_length(ids[1], ids[3], 20);
            network.send_with_length(ids[2], ids[0], 20);
            (0..500)
                .map(|_| {
                    network.resume();
                    network.advance();
                    network.snapshot()
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn run_control() {
        let mut network = network(&single_segment(&["a", "b"]));
        assert!(network.is_running());
        network.toggle();
        assert!(!network.is_running());
        assert_eq!(network.run(10), 0);

        // Advancing by hand works while paused
        network.advance();
        assert_eq!(network.tick(), Tick::from_sim_start(1));

        network.toggle();
        assert_eq!(network.run(10), 10);
        assert_eq!(network.tick(), Tick::from_sim_start(11));

        let ran = network.run_while(|n| n.tick() < Tick::from_sim_start(15));
        assert_eq!(ran, 4);
        network.pause();
        assert!(!network.is_running());
    }

    #[test]
    fn tick_rate_stays_within_bounds() {
        let mut network = network(&single_segment(&["a"]));
        assert_eq!(network.tick_rate(), TickRate::DEFAULT);

        let rates: Vec<u32> = (0..5)
            .map(|_| network.increase_speed().ticks_per_second())
            .collect();
        assert_eq!(rates, vec![8, 16, 32, 32, 32]);

        let rates: Vec<u32> = (0..7)
            .map(|_| network.decrease_speed().ticks_per_second())
            .collect();
        assert_eq!(rates, vec![16, 8, 4, 2, 1, 1, 1]);

        network.set_tick_rate(TickRate::new(20).unwrap());
        assert_eq!(network.tick_rate().ticks_per_second(), 20);
    }

    #[test]
    fn send_uses_selected_length_and_rotates_tags() {
        let mut network = network(&single_segment(&["a", "b"]));
        let (a, b) = (id(&network, "a"), id(&network, "b"));
        assert_eq!(network.telegram_length(), 100);

        network.send(a, b);
        network.use_short_telegrams();
        assert_eq!(network.telegram_length(), 15);
        network.send(a, b);
        network.send_with_length(b, a, 7);
        network.use_long_telegrams();
        assert_eq!(network.telegram_length(), 100);

        let queued: Vec<(u32, Tag)> = network
            .stations()
            .iter()
            .flat_map(|s| s.telegrams())
            .map(|t| (t.total_length(), t.tag()))
            .collect();
        assert_eq!(
            queued,
            vec![
                (100, Tag::PALETTE[0]),
                (15, Tag::PALETTE[1]),
                (7, Tag::PALETTE[2])
            ]
        );
    }

    #[test]
    fn network_without_stations_never_collides() {
        let config = NetworkConfig {
            stations: vec![],
            segments: vec![SegmentConfig::named("s")],
            links: vec![],
            ..NetworkConfig::bus(&[], 1)
        };
        let mut network = network(&config);
        assert_eq!(network.advance(), CollisionPhase::Clear);
        network.segment_mut(network.segment_id("s").unwrap()).clear();
        assert_eq!(network.snapshot().stations, vec![]);
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut network = network(&single_segment(&["a", "b"]));
        let (a, b) = (id(&network, "a"), id(&network, "b"));
        network.send_with_length(a, b, 2);
        network.advance();

        let snapshot = network.snapshot();
        assert_eq!(snapshot.tick, Tick::from_sim_start(1));
        assert!(snapshot.running);
        assert_eq!(snapshot.stations[0].name, "a");
        assert_eq!(snapshot.stations[0].queued_telegrams, 1);
        let signal = snapshot.segments[0].signal.unwrap();
        assert_eq!(signal.tag, Tag::PALETTE[0]);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["segments"][0]["signal"]["kind"], "regular");
        assert_eq!(json["segments"][0]["signal"]["tag"], "#85C700");
    }
}
