//! Audit log of packets exchanged with the terminal

use chrono::{DateTime, Utc};

use zvt_core::{ControlCode, Packet};

/// Which way a packet travelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Cash register to terminal
    Outgoing,

    /// Terminal to cash register
    Incoming,
}

/// One recorded packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub direction: Direction,
    pub packet: Packet,
    pub at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn is_incoming(&self) -> bool {
        self.direction == Direction::Incoming
    }
}

/// Append-only packet history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a packet, stamped with the current time
    pub fn push(&mut self, direction: Direction, packet: Packet) {
        self.entries.push(HistoryEntry {
            direction,
            packet,
            at: Utc::now(),
        });
    }

    /// Append all entries of `other`, keeping their order and timestamps
    pub fn extend_from(&mut self, other: &History) {
        self.entries.extend_from_slice(&other.entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Packets received from the terminal
    pub fn incoming(&self) -> impl Iterator<Item = &Packet> {
        self.packets(Direction::Incoming)
    }

    /// Packets sent to the terminal
    pub fn outgoing(&self) -> impl Iterator<Item = &Packet> {
        self.packets(Direction::Outgoing)
    }

    /// Most recent packet received from the terminal
    pub fn last_incoming(&self) -> Option<&Packet> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.is_incoming())
            .map(|e| &e.packet)
    }

    /// First entry carrying `control_code`
    pub fn find(&self, control_code: ControlCode) -> Option<&HistoryEntry> {
        self.entries
            .iter()
            .find(|e| e.packet.control_code == control_code)
    }

    fn packets(&self, direction: Direction) -> impl Iterator<Item = &Packet> {
        self.entries
            .iter()
            .filter(move |e| e.direction == direction)
            .map(|e| &e.packet)
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a HistoryEntry;
    type IntoIter = std::slice::Iter<'a, HistoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> History {
        let mut history = History::new();
        history.push(Direction::Outgoing, Packet::new(ControlCode::AUTHORISATION));
        history.push(Direction::Incoming, Packet::packet_received());
        history.push(Direction::Incoming, Packet::new(ControlCode::INTERMEDIATE_STATUS));
        history.push(Direction::Outgoing, Packet::packet_received());
        history.push(Direction::Incoming, Packet::new(ControlCode::COMPLETION));
        history
    }

    #[test]
    fn test_directions() {
        let history = sample();

        let incoming: Vec<_> = history.incoming().map(|p| p.control_code).collect();
        assert_eq!(
            incoming,
            vec![
                ControlCode::PACKET_RECEIVED,
                ControlCode::INTERMEDIATE_STATUS,
                ControlCode::COMPLETION,
            ]
        );
        assert_eq!(history.outgoing().count(), 2);
    }

    #[test]
    fn test_last_incoming_and_find() {
        let history = sample();

        assert_eq!(
            history.last_incoming().map(|p| p.control_code),
            Some(ControlCode::COMPLETION)
        );

        let entry = history.find(ControlCode::PACKET_RECEIVED).unwrap();
        assert_eq!(entry.direction, Direction::Incoming);
        assert!(history.find(ControlCode::ABORT).is_none());
    }

    #[test]
    fn test_extend_keeps_order() {
        let mut history = History::new();
        history.push(Direction::Outgoing, Packet::new(ControlCode::LOG_OFF));

        let local = sample();
        history.extend_from(&local);

        assert_eq!(history.len(), 6);
        assert_eq!(&history.entries()[1..], local.entries());
        assert!(history.iter().zip(history.iter().skip(1)).all(|(a, b)| a.at <= b.at));
    }

    #[test]
    fn test_empty() {
        let history = History::new();
        assert!(history.is_empty());
        assert!(history.last_incoming().is_none());
        assert_eq!((&history).into_iter().count(), 0);
    }
}
