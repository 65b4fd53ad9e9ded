use serde::{Deserialize, Serialize};

use crate::simulation::{ComponentId, StationId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketKind {
    Regular,
    Collision,
}

/// Opaque label carried by packets so a renderer can tell telegrams apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Tag(&'static str);

impl Tag {
    pub const COLLISION: Tag = Tag("#FF0000");
    pub const PALETTE: [Tag; 5] = [
        Tag("#85C700"),
        Tag("#C7C400"),
        Tag("#0000C7"),
        Tag("#C700C7"),
        Tag("#00C7C7"),
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Default for Tag {
    fn default() -> Self {
        Tag::PALETTE[0]
    }
}

/// A single unit on the wire. Packets are never modified once created;
/// relaying produces a copy through [`Packet::forwarded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    source: Option<StationId>,
    destination: Option<StationId>,
    previous_hop: Option<ComponentId>,
    kind: PacketKind,
    tag: Tag,
}

impl Packet {
    #[must_use]
    pub fn new(source: StationId, destination: StationId, tag: Tag) -> Packet {
        Packet {
            source: Some(source),
            destination: Some(destination),
            previous_hop: Some(source.into()),
            kind: PacketKind::Regular,
            tag,
        }
    }

    /// The jam marker a segment raises when two signals overlap on it.
    #[must_use]
    pub const fn collision() -> Packet {
        Packet {
            source: None,
            destination: None,
            previous_hop: None,
            kind: PacketKind::Collision,
            tag: Tag::COLLISION,
        }
    }

    #[must_use]
    pub fn forwarded(&self, previous_hop: ComponentId) -> Packet {
        Packet {
            previous_hop: Some(previous_hop),
            ..*self
        }
    }

    #[must_use]
    pub fn is_from(&self, station: StationId) -> bool {
        self.source == Some(station)
    }

    #[must_use]
    pub fn is_to(&self, station: StationId) -> bool {
        self.destination == Some(station)
    }

    #[must_use]
    pub fn is_previous(&self, component: ComponentId) -> bool {
        self.previous_hop == Some(component)
    }

    #[must_use]
    pub fn is_regular(&self) -> bool {
        self.kind == PacketKind::Regular
    }

    #[must_use]
    pub fn is_collision(&self) -> bool {
        self.kind == PacketKind::Collision
    }

    #[must_use]
    pub const fn kind(&self) -> PacketKind {
        self.kind
    }

    #[must_use]
    pub const fn source(&self) -> Option<StationId> {
        self.source
    }

    #[must_use]
    pub const fn destination(&self) -> Option<StationId> {
        self.destination
    }

    #[must_use]
    pub const fn previous_hop(&self) -> Option<ComponentId> {
        self.previous_hop
    }

    #[must_use]
    pub const fn tag(&self) -> Tag {
        self.tag
    }
}
