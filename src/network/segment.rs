use crate::simulation::{Component, ComponentId, Message, SegmentId};

use super::packet::Packet;

/// One piece of cable. Carries at most one signal per tick; anything more is
/// a collision.
///
/// A tick is split in two phases: [`Segment::pre_tick`] commits what arrived
/// during the previous tick, [`Component::tick`] relays it. Running `pre_tick`
/// on every segment before any segment relays keeps a signal from crossing
/// more than one segment per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    id: SegmentId,
    name: String,
    rx: Option<Packet>,
    tx: Option<Packet>,
    connections: Vec<ComponentId>,
}

impl Segment {
    #[must_use]
    pub const fn new(id: SegmentId, name: String) -> Segment {
        Segment {
            id,
            name,
            rx: None,
            tx: None,
            connections: Vec::new(),
        }
    }

    pub(crate) fn add_connection(&mut self, connection: ComponentId) {
        self.connections.push(connection);
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn segment_id(&self) -> SegmentId {
        self.id
    }

    /// The signal this segment picked up during the last tick, if any.
    #[must_use]
    pub const fn current_signal(&self) -> Option<&Packet> {
        self.rx.as_ref()
    }

    #[must_use]
    pub fn is_collision(&self) -> bool {
        self.rx.is_some_and(|p| p.is_collision())
    }

    pub fn pre_tick(&mut self) {
        assert!(
            self.tx.is_none(),
            "segment `{}` still holds an unsent signal at pre-tick",
            self.name
        );
        let committed = self.rx.take();
        // The collision marker stays in place until the network clears it
        if committed.is_some_and(|p| p.is_collision()) {
            self.rx = committed;
        }
        self.tx = committed;
    }

    /// Drops a resident collision marker.
    pub fn clear(&mut self) {
        if self.is_collision() {
            self.rx = None;
        }
    }
}

impl Component for Segment {
    fn id(&self) -> ComponentId {
        self.id.into()
    }

    fn connections(&self) -> &[ComponentId] {
        &self.connections
    }

    fn receive(&mut self, packet: Packet) -> bool {
        match self.rx {
            Some(current) if current.is_collision() => false,
            Some(current) if current.is_regular() && packet.is_regular() => {
                self.rx = Some(Packet::collision());
                false
            }
            _ => {
                self.rx = Some(packet);
                packet.is_regular()
            }
        }
    }

    fn tick(&mut self) -> Vec<Message> {
        let Some(packet) = self.tx.take() else {
            return vec![];
        };
        let relayed = packet.forwarded(self.id());
        self.connections
            .iter()
            .filter(|&&connection| !packet.is_previous(connection))
            .map(|&connection| Message::new(connection, relayed))
            .collect()
    }
}
