use serde::Serialize;

use crate::quantities::Tick;

use super::{
    packet::{Packet, PacketKind, Tag},
    segment::Segment,
    station::Station,
};

/// Everything a renderer needs to draw the network after a tick.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NetworkSnapshot {
    pub tick: Tick,
    pub running: bool,
    pub collision_found: bool,
    pub stations: Vec<StationSnapshot>,
    pub segments: Vec<SegmentSnapshot>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StationSnapshot {
    pub name: String,
    pub queued_telegrams: usize,
    pub is_collision: bool,
    pub is_receiving: bool,
    pub wait_time: u32,
    pub failed_attempt_count: u32,
    pub active_slots: u32,
    pub chosen_slot: Option<u32>,
    pub manual_slot: Option<u32>,
    pub received_count: u64,
}

impl<L> From<&Station<L>> for StationSnapshot {
    fn from(station: &Station<L>) -> Self {
        let backoff = station.backoff();
        StationSnapshot {
            name: station.name().to_owned(),
            queued_telegrams: station.telegrams().count(),
            is_collision: station.is_collision(),
            is_receiving: station.is_receiving(),
            wait_time: station.wait_time(),
            failed_attempt_count: backoff.failed_attempt_count(),
            active_slots: backoff.active_slots(),
            chosen_slot: backoff.last_slot(),
            manual_slot: backoff.manual_slot(),
            received_count: station.received_count(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SegmentSnapshot {
    pub name: String,
    pub signal: Option<SignalSnapshot>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSnapshot {
    pub kind: PacketKind,
    pub tag: Tag,
}

impl From<&Packet> for SignalSnapshot {
    fn from(packet: &Packet) -> Self {
        SignalSnapshot {
            kind: packet.kind(),
            tag: packet.tag(),
        }
    }
}

impl From<&Segment> for SegmentSnapshot {
    fn from(segment: &Segment) -> Self {
        SegmentSnapshot {
            name: segment.name().to_owned(),
            signal: segment.current_signal().map(SignalSnapshot::from),
        }
    }
}
