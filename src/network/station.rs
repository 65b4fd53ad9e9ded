use std::{
    collections::VecDeque,
    fmt::{Debug, Formatter, Result},
};

use crate::{
    simulation::{Component, ComponentId, Message, StationId},
    util::{logging::Logger, rand::Rng},
};

use super::{
    backoff::BackoffSelector,
    packet::{Packet, Tag},
    telegram::Telegram,
};

pub const DEFAULT_SLOT_DURATION: u32 = 50;

/// An endpoint of the collision domain.
///
/// Each tick a station does exactly one of: count down its backoff, skip a
/// turn because it heard traffic, give up the current telegram because of a
/// collision, or put the next packet of its head telegram on every connected
/// segment.
pub struct Station<L> {
    id: StationId,
    name: String,
    connections: Vec<ComponentId>,
    telegrams: VecDeque<Telegram>,
    backoff: BackoffSelector,
    is_receiving: bool,
    is_collision: bool,
    wait_time: u32,
    received_count: u64,
    logger: L,
}

impl<L> Debug for Station<L> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_struct("Station")
            .field("name", &self.name)
            .field("telegrams", &self.telegrams)
            .field("backoff", &self.backoff)
            .field("is_receiving", &self.is_receiving)
            .field("is_collision", &self.is_collision)
            .field("wait_time", &self.wait_time)
            .finish_non_exhaustive()
    }
}

impl<L> Station<L>
where
    L: Logger,
{
    #[must_use]
    pub fn new(id: StationId, name: String, backoff: BackoffSelector, logger: L) -> Station<L> {
        Station {
            id,
            name,
            connections: Vec::new(),
            telegrams: VecDeque::new(),
            backoff,
            is_receiving: false,
            is_collision: false,
            wait_time: 0,
            received_count: 0,
            logger,
        }
    }

    pub(crate) fn add_connection(&mut self, connection: ComponentId) {
        self.connections.push(connection);
    }

    /// Queues a telegram of `length` packets for `destination`.
    pub fn enqueue(&mut self, destination: StationId, length: u32) {
        self.push_telegram(Telegram::new(destination, length, Tag::default()));
    }

    pub fn push_telegram(&mut self, telegram: Telegram) {
        self.telegrams.push_back(telegram);
    }

    /// Settles this station's part in a collision the whole network has
    /// agreed on. Stations that are already backing off, or have nothing to
    /// send, sit the round out.
    pub fn handle_collision(&mut self, rng: &mut Rng, slot_duration: u32) {
        self.is_collision = false;

        if self.is_waiting() || !self.is_sending() {
            return;
        }

        self.wait_time = slot_duration.saturating_mul(self.backoff.next_slot_time(rng));
        log!(self.logger, "wait time is {} ticks", self.wait_time);
    }

    fn next_telegram_for_tx(&mut self) -> Option<&mut Telegram> {
        while let Some(telegram) = self.telegrams.front() {
            if !telegram.is_complete() {
                break;
            }
            log!(
                self.logger,
                "sent {} packets to {}",
                telegram.total_length(),
                telegram.to()
            );
            self.telegrams.pop_front();
            self.backoff.reset();
        }
        self.telegrams.front_mut()
    }
}

impl<L> Station<L> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn station_id(&self) -> StationId {
        self.id
    }

    #[must_use]
    pub const fn is_collision(&self) -> bool {
        self.is_collision
    }

    #[must_use]
    pub const fn is_receiving(&self) -> bool {
        self.is_receiving
    }

    #[must_use]
    pub const fn is_tx_blocked(&self) -> bool {
        self.is_collision || self.is_receiving
    }

    /// Whether any telegram is still queued.
    #[must_use]
    pub fn is_sending(&self) -> bool {
        !self.telegrams.is_empty()
    }

    #[must_use]
    pub const fn is_waiting(&self) -> bool {
        self.wait_time > 0
    }

    #[must_use]
    pub const fn wait_time(&self) -> u32 {
        self.wait_time
    }

    /// Regular packets addressed to this station that reached it.
    #[must_use]
    pub const fn received_count(&self) -> u64 {
        self.received_count
    }

    pub fn telegrams(&self) -> impl Iterator<Item = &Telegram> {
        self.telegrams.iter()
    }

    #[must_use]
    pub const fn backoff(&self) -> &BackoffSelector {
        &self.backoff
    }

    pub fn backoff_mut(&mut self) -> &mut BackoffSelector {
        &mut self.backoff
    }
}

impl<L> Component for Station<L>
where
    L: Logger,
{
    fn id(&self) -> ComponentId {
        self.id.into()
    }

    fn connections(&self) -> &[ComponentId] {
        &self.connections
    }

    fn receive(&mut self, packet: Packet) -> bool {
        if packet.is_collision() {
            self.is_collision = true;
        } else {
            self.is_receiving = true;
        }

        let is_for_me = packet.is_to(self.id);
        if is_for_me && packet.is_regular() {
            self.received_count += 1;
        }
        is_for_me
    }

    fn tick(&mut self) -> Vec<Message> {
        if self.wait_time > 0 {
            self.wait_time -= 1;
            return vec![];
        }

        if self.is_receiving {
            self.is_receiving = false;
            return vec![];
        }

        let id = self.id;
        let blocked = self.is_tx_blocked();
        let Some(telegram) = self.next_telegram_for_tx() else {
            return vec![];
        };

        if blocked {
            telegram.restart();
            return vec![];
        }

        let packet = Packet::new(id, telegram.to(), telegram.tag());
        telegram.record_sent();
        self.connections
            .iter()
            .map(|&connection| Message::new(connection, packet))
            .collect()
    }
}
