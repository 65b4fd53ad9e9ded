use std::{collections::VecDeque, fmt::Debug};

use derive_more::{Display, From};
use serde::Serialize;

use crate::network::packet::Packet;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[display(fmt = "station#{}", _0)]
#[serde(transparent)]
pub struct StationId(pub(crate) usize);

impl StationId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[display(fmt = "segment#{}", _0)]
#[serde(transparent)]
pub struct SegmentId(pub(crate) usize);

impl SegmentId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Handle of anything that can sit on either end of a link.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Serialize)]
pub enum ComponentId {
    Station(StationId),
    Segment(SegmentId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    destination: ComponentId,
    packet: Packet,
}

impl Message {
    #[must_use]
    pub const fn new(destination: ComponentId, packet: Packet) -> Message {
        Message {
            destination,
            packet,
        }
    }

    #[must_use]
    pub const fn destination(&self) -> ComponentId {
        self.destination
    }

    #[must_use]
    pub const fn packet(&self) -> &Packet {
        &self.packet
    }

    #[must_use]
    pub fn into_packet(self) -> Packet {
        self.packet
    }
}

/// A node of the collision domain. Components never touch each other
/// directly: whatever they put on the wire is returned from [`Component::tick`]
/// and handed to the destination's [`Component::receive`] by the network.
pub trait Component: Debug {
    fn id(&self) -> ComponentId;
    fn connections(&self) -> &[ComponentId];
    fn receive(&mut self, packet: Packet) -> bool;
    fn tick(&mut self) -> Vec<Message>;
}

pub(crate) struct EffectQueue {
    queue: VecDeque<Message>,
}

impl EffectQueue {
    pub(crate) const fn new() -> EffectQueue {
        EffectQueue {
            queue: VecDeque::new(),
        }
    }

    pub(crate) fn push_all<T: IntoIterator<Item = Message>>(&mut self, effects: T) {
        self.queue.extend(effects);
    }

    pub(crate) fn pop_next(&mut self) -> Option<Message> {
        self.queue.pop_front()
    }
}
