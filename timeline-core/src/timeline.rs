//! Maps one reservable's reservations onto the hourly grid.

use std::collections::HashSet;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike};
use shared_types::{Reservation, ReservationId};

use crate::window::resolve_local;

pub const FIRST_HOUR: u32 = 7;
pub const LAST_HOUR: u32 = 22;
pub const SLOT_COUNT: usize = (LAST_HOUR - FIRST_HOUR + 1) as usize;

/// One hourly column of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSlot {
    pub hour: u32,
}

impl TimeSlot {
    pub fn label(&self) -> String {
        format!("{:02}:00", self.hour)
    }
}

/// 07:00 through 22:00.
pub fn day_slots() -> Vec<TimeSlot> {
    (FIRST_HOUR..=LAST_HOUR).map(|hour| TimeSlot { hour }).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridCell {
    Available {
        hour: u32,
        index: usize,
    },
    Reserved {
        reservation: Reservation,
        start_index: usize,
        span: usize,
    },
}

impl GridCell {
    /// Number of slots the cell covers.
    pub fn width(&self) -> usize {
        match self {
            GridCell::Available { .. } => 1,
            GridCell::Reserved { span, .. } => *span,
        }
    }

    pub fn start_index(&self) -> usize {
        match self {
            GridCell::Available { index, .. } => *index,
            GridCell::Reserved { start_index, .. } => *start_index,
        }
    }
}

/// Input the builder could not place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineIssue {
    /// Starts on a slot or inside a span already claimed by an earlier reservation.
    Overlap {
        reservation: ReservationId,
        claimed_by: Option<ReservationId>,
    },
    /// `end` is not after `start`.
    Malformed { reservation: ReservationId },
    /// Starts on another day or outside the visible hours.
    OutsideVisibleHours { reservation: ReservationId },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Timeline {
    pub cells: Vec<GridCell>,
    pub issues: Vec<TimelineIssue>,
}

impl Timeline {
    pub fn has_overlaps(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| matches!(issue, TimelineIssue::Overlap { .. }))
    }
}

/// Partitions `slots` into available and reserved cells for `date`, reading
/// reservation times in `tz`.
///
/// A reservation claims the slot whose hour equals its local start hour
/// (minutes ignored) and spans every following slot that starts before the
/// reservation ends. When two reservations compete, the earlier start wins;
/// the loser is reported as [`TimelineIssue::Overlap`].
pub fn build_timeline<Tz: TimeZone>(
    date: NaiveDate,
    reservations: &[Reservation],
    slots: &[TimeSlot],
    tz: &Tz,
) -> Timeline {
    let mut sorted: Vec<&Reservation> = reservations.iter().collect();
    sorted.sort_by_key(|r| r.start);

    let mut issues = Vec::new();
    let mut candidates: Vec<(u32, &Reservation)> = Vec::with_capacity(sorted.len());
    for reservation in sorted {
        if !reservation.is_well_formed() {
            issues.push(TimelineIssue::Malformed {
                reservation: reservation.id,
            });
            continue;
        }
        let local_start = reservation.start.with_timezone(tz);
        let hour = local_start.hour();
        if local_start.date_naive() != date || !slots.iter().any(|slot| slot.hour == hour) {
            issues.push(TimelineIssue::OutsideVisibleHours {
                reservation: reservation.id,
            });
            continue;
        }
        candidates.push((hour, reservation));
    }

    let mut cells = Vec::with_capacity(slots.len());
    let mut placed: Vec<(ReservationId, usize, usize)> = Vec::new();
    let mut i = 0;
    while i < slots.len() {
        let hour = slots[i].hour;
        let claimant = candidates
            .iter()
            .find(|(start_hour, r)| *start_hour == hour && !placed.iter().any(|p| p.0 == r.id));

        match claimant {
            Some((_, reservation)) => {
                let span = span_len(date, reservation, &slots[i..], tz);
                placed.push((reservation.id, i, span));
                cells.push(GridCell::Reserved {
                    reservation: (*reservation).clone(),
                    start_index: i,
                    span,
                });
                i += span;
            }
            None => {
                cells.push(GridCell::Available { hour, index: i });
                i += 1;
            }
        }
    }

    let placed_ids: HashSet<ReservationId> = placed.iter().map(|p| p.0).collect();
    for (hour, reservation) in &candidates {
        if placed_ids.contains(&reservation.id) {
            continue;
        }
        let claimed_by = slots
            .iter()
            .position(|slot| slot.hour == *hour)
            .and_then(|index| {
                placed
                    .iter()
                    .find(|(_, start, span)| (*start..start + span).contains(&index))
            })
            .map(|p| p.0);
        tracing::warn!(
            date = %date,
            reservation = %reservation.id,
            claimed_by = ?claimed_by,
            "overlapping reservation dropped from the timeline"
        );
        issues.push(TimelineIssue::Overlap {
            reservation: reservation.id,
            claimed_by,
        });
    }

    Timeline { cells, issues }
}

/// Walks a cursor from the reservation start to each next hour boundary and
/// counts the slots passed before the cursor reaches the reservation end.
fn span_len<Tz: TimeZone>(
    date: NaiveDate,
    reservation: &Reservation,
    remaining: &[TimeSlot],
    tz: &Tz,
) -> usize {
    let mut cursor: DateTime<FixedOffset> = reservation.start;
    let mut covered = 0;
    while covered < remaining.len() && cursor < reservation.end {
        let boundary =
            date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(remaining[covered].hour) + 1);
        cursor = resolve_local(tz, boundary);
        covered += 1;
    }
    covered.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    fn reservation(id: i64, start: &str, end: &str) -> Reservation {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "start": format!("2024-05-06T{}:00Z", start),
            "end": format!("2024-05-06T{}:00Z", end),
        }))
        .unwrap()
    }

    fn shape(timeline: &Timeline) -> Vec<(usize, usize)> {
        timeline
            .cells
            .iter()
            .map(|cell| (cell.start_index(), cell.width()))
            .collect()
    }

    fn assert_partition(timeline: &Timeline) {
        let mut next = 0;
        for cell in &timeline.cells {
            assert_eq!(cell.start_index(), next, "gap or overlap at slot {}", next);
            assert!(cell.width() >= 1);
            next += cell.width();
        }
        assert_eq!(next, SLOT_COUNT);
    }

    #[test]
    fn sixteen_slots_from_seven_to_twenty_two() {
        let slots = day_slots();
        assert_eq!(slots.len(), SLOT_COUNT);
        assert_eq!(slots.first().unwrap().label(), "07:00");
        assert_eq!(slots.last().unwrap().label(), "22:00");
    }

    #[test]
    fn empty_day_is_all_available() {
        let timeline = build_timeline(day(), &[], &day_slots(), &Utc);
        assert_eq!(timeline.cells.len(), SLOT_COUNT);
        assert!(timeline
            .cells
            .iter()
            .all(|cell| matches!(cell, GridCell::Available { .. })));
        assert_partition(&timeline);
    }

    #[test]
    fn two_hour_reservation_spans_two_slots() {
        let r = reservation(1, "09:00", "11:00");
        let timeline = build_timeline(day(), &[r.clone()], &day_slots(), &Utc);

        assert_eq!(timeline.cells.len(), SLOT_COUNT - 1);
        assert_eq!(timeline.cells[0], GridCell::Available { hour: 7, index: 0 });
        assert_eq!(timeline.cells[1], GridCell::Available { hour: 8, index: 1 });
        assert_eq!(
            timeline.cells[2],
            GridCell::Reserved {
                reservation: r,
                start_index: 2,
                span: 2
            }
        );
        assert_eq!(timeline.cells[3], GridCell::Available { hour: 11, index: 4 });
        assert_eq!(
            timeline.cells.last(),
            Some(&GridCell::Available { hour: 22, index: 15 })
        );
        assert!(timeline.issues.is_empty());
    }

    #[test]
    fn end_on_boundary_excludes_that_slot() {
        let timeline = build_timeline(
            day(),
            &[reservation(1, "09:00", "10:00")],
            &day_slots(),
            &Utc,
        );
        assert_eq!(timeline.cells[2].width(), 1);
        assert_eq!(timeline.cells[3], GridCell::Available { hour: 10, index: 3 });
    }

    #[test]
    fn partial_hours_round_outward() {
        let timeline = build_timeline(
            day(),
            &[reservation(1, "09:30", "10:15")],
            &day_slots(),
            &Utc,
        );
        assert_eq!(timeline.cells[2].start_index(), 2);
        assert_eq!(timeline.cells[2].width(), 2);
        assert_partition(&timeline);
    }

    #[test]
    fn late_reservation_is_clipped_to_the_last_slot() {
        let late: Reservation = serde_json::from_value(serde_json::json!({
            "id": 9,
            "start": "2024-05-06T21:00:00Z",
            "end": "2024-05-07T02:00:00Z",
        }))
        .unwrap();
        let timeline = build_timeline(day(), &[late], &day_slots(), &Utc);

        assert_eq!(timeline.cells.last().unwrap().start_index(), 14);
        assert_eq!(timeline.cells.last().unwrap().width(), 2);
        assert_partition(&timeline);
    }

    #[test]
    fn non_overlapping_days_partition_the_slots() {
        let days = [
            vec![],
            vec![reservation(1, "07:00", "22:00")],
            vec![
                reservation(1, "07:00", "08:00"),
                reservation(2, "08:00", "10:00"),
                reservation(3, "13:15", "14:00"),
                reservation(4, "22:00", "23:00"),
            ],
            vec![
                reservation(5, "18:00", "20:30"),
                reservation(6, "10:00", "12:00"),
            ],
        ];
        for reservations in days {
            let timeline = build_timeline(day(), &reservations, &day_slots(), &Utc);
            assert_partition(&timeline);
            assert!(timeline.issues.is_empty());
        }
    }

    #[test]
    fn input_order_does_not_matter() {
        let a = reservation(1, "08:00", "09:00");
        let b = reservation(2, "12:00", "14:00");
        let forward = build_timeline(day(), &[a.clone(), b.clone()], &day_slots(), &Utc);
        let backward = build_timeline(day(), &[b, a], &day_slots(), &Utc);
        assert_eq!(forward, backward);
    }

    #[test]
    fn overlap_keeps_the_earlier_reservation() {
        let first = reservation(1, "09:00", "12:00");
        let inside = reservation(2, "10:00", "11:00");
        let same_slot = reservation(3, "09:30", "10:00");

        let timeline = build_timeline(
            day(),
            &[inside, same_slot, first.clone()],
            &day_slots(),
            &Utc,
        );

        assert_partition(&timeline);
        assert_eq!(
            timeline.cells[2],
            GridCell::Reserved {
                reservation: first,
                start_index: 2,
                span: 3
            }
        );
        assert!(timeline.has_overlaps());
        assert!(timeline.issues.contains(&TimelineIssue::Overlap {
            reservation: ReservationId(2),
            claimed_by: Some(ReservationId(1)),
        }));
        assert!(timeline.issues.contains(&TimelineIssue::Overlap {
            reservation: ReservationId(3),
            claimed_by: Some(ReservationId(1)),
        }));
    }

    #[test]
    fn unplaceable_input_is_reported() {
        let inverted = reservation(1, "11:00", "10:00");
        let early = reservation(2, "05:00", "06:00");
        let other_day: Reservation = serde_json::from_value(serde_json::json!({
            "id": 3,
            "start": "2024-05-05T09:00:00Z",
            "end": "2024-05-05T10:00:00Z",
        }))
        .unwrap();

        let timeline = build_timeline(day(), &[inverted, early, other_day], &day_slots(), &Utc);

        assert_eq!(shape(&timeline), (0..SLOT_COUNT).map(|i| (i, 1)).collect::<Vec<_>>());
        assert_eq!(
            timeline.issues,
            vec![
                TimelineIssue::OutsideVisibleHours {
                    reservation: ReservationId(3)
                },
                TimelineIssue::OutsideVisibleHours {
                    reservation: ReservationId(2)
                },
                TimelineIssue::Malformed {
                    reservation: ReservationId(1)
                },
            ]
        );
    }

    #[test]
    fn hours_are_read_in_the_given_time_zone() {
        // 07:00Z is 09:00 in UTC+2.
        let r = reservation(1, "07:00", "08:00");
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let timeline = build_timeline(day(), &[r], &day_slots(), &tz);

        assert_eq!(timeline.cells[2].width(), 1);
        assert!(matches!(timeline.cells[2], GridCell::Reserved { start_index: 2, .. }));
    }
}
