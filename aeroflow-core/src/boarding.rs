use aeroflow_shared::Masked;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::Booking;
use crate::flight::SeatClass;
use crate::{CoreError, CoreResult};

// ============================================================================
// Boarding groups
// ============================================================================

/// Boarding tiers, declared in call order. `Ord` follows declaration order, so
/// sorting never depends on the lexical order of the wire names.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BoardingGroup {
    #[serde(rename = "priority")]
    Priority,
    #[serde(rename = "group-1")]
    Group1,
    #[serde(rename = "group-2")]
    Group2,
    #[serde(rename = "group-3")]
    Group3,
    #[serde(rename = "general")]
    General,
}

impl BoardingGroup {
    pub const ALL: [BoardingGroup; 5] = [
        BoardingGroup::Priority,
        BoardingGroup::Group1,
        BoardingGroup::Group2,
        BoardingGroup::Group3,
        BoardingGroup::General,
    ];

    /// 0 is called first.
    pub fn rank(&self) -> u8 {
        match self {
            BoardingGroup::Priority => 0,
            BoardingGroup::Group1 => 1,
            BoardingGroup::Group2 => 2,
            BoardingGroup::Group3 => 3,
            BoardingGroup::General => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BoardingGroup::Priority => "priority",
            BoardingGroup::Group1 => "group-1",
            BoardingGroup::Group2 => "group-2",
            BoardingGroup::Group3 => "group-3",
            BoardingGroup::General => "general",
        }
    }

    pub fn parse(value: &str) -> CoreResult<Self> {
        BoardingGroup::ALL
            .into_iter()
            .find(|group| group.as_str() == value.trim())
            .ok_or_else(|| CoreError::validation(format!("Unknown boarding group '{}'", value)))
    }

    /// Group used when the agent does not pick one.
    pub fn default_for(class: SeatClass) -> Self {
        match class {
            SeatClass::Business => BoardingGroup::Group1,
            SeatClass::Economy | SeatClass::First => BoardingGroup::Group2,
        }
    }
}

// ============================================================================
// Queue entry state machine
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Waiting,
    Called,
    Boarding,
    Boarded,
    Missed,
}

impl QueueStatus {
    pub const ALL: [QueueStatus; 5] = [
        QueueStatus::Waiting,
        QueueStatus::Called,
        QueueStatus::Boarding,
        QueueStatus::Boarded,
        QueueStatus::Missed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Waiting => "waiting",
            QueueStatus::Called => "called",
            QueueStatus::Boarding => "boarding",
            QueueStatus::Boarded => "boarded",
            QueueStatus::Missed => "missed",
        }
    }

    pub fn parse(value: &str) -> CoreResult<Self> {
        QueueStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value.trim())
            .ok_or_else(|| CoreError::validation(format!("Unknown queue status '{}'", value)))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueStatus::Boarded | QueueStatus::Missed)
    }

    /// waiting → called → boarding → boarded; missed from waiting/called.
    /// A called passenger may be called again; boarding may skip the call.
    pub fn can_become(&self, next: QueueStatus) -> bool {
        use QueueStatus::*;
        matches!(
            (self, next),
            (Waiting | Called, Called)
                | (Waiting | Called, Boarding)
                | (Waiting | Called | Boarding, Boarded)
                | (Waiting | Called, Missed)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoardingQueueEntry {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub flight_id: Uuid,
    pub passenger_id: Uuid,
    pub boarding_group: BoardingGroup,
    pub queue_position: u32,
    pub status: QueueStatus,
    pub called_at: Option<DateTime<Utc>>,
    pub boarded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BoardingQueueEntry {
    /// New waiting entry. `queue_position` is fixed for the entry's lifetime.
    pub fn new(booking: &Booking, boarding_group: BoardingGroup, queue_position: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            flight_id: booking.flight_id,
            passenger_id: booking.passenger_id,
            boarding_group,
            queue_position,
            status: QueueStatus::Waiting,
            called_at: None,
            boarded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, next: QueueStatus, now: DateTime<Utc>) -> CoreResult<()> {
        if !self.status.can_become(next) {
            return Err(CoreError::conflict(format!(
                "Cannot move queue entry from {} to {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        match next {
            QueueStatus::Called => self.called_at = Some(now),
            QueueStatus::Boarded => self.boarded_at = Some(now),
            QueueStatus::Waiting | QueueStatus::Boarding | QueueStatus::Missed => {}
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn sort_key(&self) -> (BoardingGroup, u32) {
        (self.boarding_group, self.queue_position)
    }
}

/// Next position within one (flight, group): 1 + highest assigned, or 1.
pub fn next_queue_position<'a>(
    entries: impl IntoIterator<Item = &'a BoardingQueueEntry>,
    flight_id: Uuid,
    group: BoardingGroup,
) -> u32 {
    entries
        .into_iter()
        .filter(|e| e.flight_id == flight_id && e.boarding_group == group)
        .map(|e| e.queue_position)
        .max()
        .unwrap_or(0)
        + 1
}

// ============================================================================
// Read models
// ============================================================================

/// Queue entry joined with the booking and passenger fields shown at the gate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntryView {
    #[serde(flatten)]
    pub entry: BoardingQueueEntry,
    pub booking_reference: String,
    pub seat_number: Option<String>,
    pub class: SeatClass,
    pub passenger_name: Option<String>,
    pub passport_number: Option<Masked<String>>,
}

/// Per-status counts for one flight. Every status is always present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardingStats {
    pub total: usize,
    pub waiting: usize,
    pub called: usize,
    pub boarding: usize,
    pub boarded: usize,
    pub missed: usize,
}

impl BoardingStats {
    /// `checked_in_total` is the number of checked-in or boarded bookings on the flight.
    pub fn tally<'a>(
        checked_in_total: usize,
        entries: impl IntoIterator<Item = &'a BoardingQueueEntry>,
    ) -> Self {
        let mut stats = BoardingStats { total: checked_in_total, ..Default::default() };
        for entry in entries {
            match entry.status {
                QueueStatus::Waiting => stats.waiting += 1,
                QueueStatus::Called => stats.called += 1,
                QueueStatus::Boarding => stats.boarding += 1,
                QueueStatus::Boarded => stats.boarded += 1,
                QueueStatus::Missed => stats.missed += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::NewBooking;

    fn checked_in_booking(class: SeatClass) -> Booking {
        let mut booking = Booking::new(
            NewBooking {
                flight_id: Uuid::new_v4(),
                passenger_id: Uuid::new_v4(),
                seat_number: None,
                class,
                baggage: vec![],
            },
            "QWE123".to_string(),
        )
        .unwrap();
        booking.check_in(Utc::now()).unwrap();
        booking
    }

    #[test]
    fn test_group_priority_is_not_lexical() {
        let mut groups = vec![
            BoardingGroup::General,
            BoardingGroup::Group2,
            BoardingGroup::Priority,
            BoardingGroup::Group1,
        ];
        groups.sort();
        assert_eq!(
            groups,
            vec![
                BoardingGroup::Priority,
                BoardingGroup::Group1,
                BoardingGroup::Group2,
                BoardingGroup::General
            ]
        );
        // "general" < "group-1" < "priority" lexically
        assert!(BoardingGroup::General.rank() > BoardingGroup::Priority.rank());
    }

    #[test]
    fn test_default_group_by_class() {
        assert_eq!(BoardingGroup::default_for(SeatClass::Business), BoardingGroup::Group1);
        assert_eq!(BoardingGroup::default_for(SeatClass::Economy), BoardingGroup::Group2);
        assert_eq!(BoardingGroup::default_for(SeatClass::First), BoardingGroup::Group2);
    }

    #[test]
    fn test_group_wire_names() {
        assert_eq!(serde_json::to_value(BoardingGroup::Group1).unwrap(), "group-1");
        assert_eq!(BoardingGroup::parse("group-3").unwrap(), BoardingGroup::Group3);
        assert!(BoardingGroup::parse("group-9").is_err());
    }

    #[test]
    fn test_next_position_is_per_group_and_gap_tolerant() {
        let booking = checked_in_booking(SeatClass::Business);
        let flight_id = booking.flight_id;
        let entries = vec![
            BoardingQueueEntry::new(&booking, BoardingGroup::Group1, 1),
            BoardingQueueEntry::new(&booking, BoardingGroup::Group1, 4),
            BoardingQueueEntry::new(&booking, BoardingGroup::Group2, 7),
        ];
        assert_eq!(next_queue_position(&entries, flight_id, BoardingGroup::Group1), 5);
        assert_eq!(next_queue_position(&entries, flight_id, BoardingGroup::Group2), 8);
        assert_eq!(next_queue_position(&entries, flight_id, BoardingGroup::Priority), 1);
        assert_eq!(next_queue_position(&entries, Uuid::new_v4(), BoardingGroup::Group1), 1);
    }

    #[test]
    fn test_entry_state_machine() {
        let booking = checked_in_booking(SeatClass::Economy);
        let mut entry = BoardingQueueEntry::new(&booking, BoardingGroup::Group2, 1);
        let now = Utc::now();

        entry.transition(QueueStatus::Called, now).unwrap();
        assert_eq!(entry.called_at, Some(now));
        entry.transition(QueueStatus::Called, now).unwrap();
        entry.transition(QueueStatus::Boarding, now).unwrap();
        assert!(entry.transition(QueueStatus::Missed, now).is_err());
        entry.transition(QueueStatus::Boarded, now).unwrap();
        assert_eq!(entry.boarded_at, Some(now));

        let err = entry.transition(QueueStatus::Called, now).unwrap_err();
        assert_eq!(err.to_string(), "Cannot move queue entry from boarded to called");
    }

    #[test]
    fn test_missed_is_terminal() {
        let booking = checked_in_booking(SeatClass::Economy);
        let mut entry = BoardingQueueEntry::new(&booking, BoardingGroup::Group2, 1);
        entry.transition(QueueStatus::Missed, Utc::now()).unwrap();
        assert!(entry.status.is_terminal());
        assert!(entry.transition(QueueStatus::Boarded, Utc::now()).is_err());
    }

    #[test]
    fn test_stats_report_every_status() {
        let booking = checked_in_booking(SeatClass::Economy);
        let mut called = BoardingQueueEntry::new(&booking, BoardingGroup::Group2, 2);
        called.transition(QueueStatus::Called, Utc::now()).unwrap();
        let entries = vec![BoardingQueueEntry::new(&booking, BoardingGroup::Group2, 1), called];

        let stats = BoardingStats::tally(3, &entries);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.waiting, 1);
        assert_eq!(stats.called, 1);
        assert_eq!(stats.missed, 0);

        let json = serde_json::to_value(BoardingStats::tally(0, &[])).unwrap();
        for key in ["total", "waiting", "called", "boarding", "boarded", "missed"] {
            assert_eq!(json[key], 0, "missing {}", key);
        }
    }
}
