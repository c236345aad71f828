use chrono::{NaiveDate, NaiveTime, TimeZone};
use shared_types::ReservableId;

use crate::timeline::{FIRST_HOUR, LAST_HOUR};
use crate::window::resolve_local;
use crate::{ApiError, TimeWindow};

/// A reservation being filled in after clicking a free slot. Not submitted
/// anywhere yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationDraft {
    pub reservable: Option<ReservableId>,
    pub date: NaiveDate,
    pub start_hour: u32,
    pub end_hour: u32,
    pub reason: String,
}

impl ReservationDraft {
    /// One hour long, starting at the clicked slot.
    pub fn anchored(reservable: ReservableId, date: NaiveDate, hour: u32) -> Self {
        Self {
            reservable: Some(reservable),
            date,
            start_hour: hour,
            end_hour: hour + 1,
            reason: String::new(),
        }
    }

    pub fn set_end_hour(&mut self, hour: u32) {
        self.end_hour = hour;
    }

    /// Hours the end picker offers: after the start, up to the end of the last slot.
    pub fn end_hour_choices(&self) -> Vec<u32> {
        (self.start_hour + 1..=LAST_HOUR + 1).collect()
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.reservable.is_none() {
            return Err(ApiError::InvalidArgument(
                "choose what to reserve".to_string(),
            ));
        }
        if self.start_hour < FIRST_HOUR || self.start_hour > LAST_HOUR {
            return Err(ApiError::InvalidArgument(format!(
                "start {:02}:00 is outside {:02}:00-{:02}:00",
                self.start_hour,
                FIRST_HOUR,
                LAST_HOUR + 1
            )));
        }
        if self.end_hour <= self.start_hour || self.end_hour > LAST_HOUR + 1 {
            return Err(ApiError::InvalidArgument(format!(
                "end {:02}:00 must be after {:02}:00 and no later than {:02}:00",
                self.end_hour,
                self.start_hour,
                LAST_HOUR + 1
            )));
        }
        Ok(())
    }

    pub fn window<Tz: TimeZone>(&self, tz: &Tz) -> Result<TimeWindow, ApiError> {
        self.validate()?;
        let at = |hour: u32| {
            NaiveTime::from_hms_opt(hour, 0, 0)
                .map(|time| resolve_local(tz, self.date.and_time(time)))
                .ok_or_else(|| ApiError::InvalidArgument(format!("no such hour {}", hour)))
        };
        TimeWindow::new(at(self.start_hour)?, at(self.end_hour)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    #[test]
    fn anchored_draft_is_one_hour() {
        let draft = ReservationDraft::anchored(ReservableId(3), day(), 9);
        let window = draft.window(&Utc).unwrap();
        assert_eq!(window.start_param(), "2024-05-06T09:00:00.000Z");
        assert_eq!(window.end_param(), "2024-05-06T10:00:00.000Z");
    }

    #[test]
    fn last_slot_may_end_at_twenty_three() {
        let mut draft = ReservationDraft::anchored(ReservableId(3), day(), 22);
        assert_eq!(draft.end_hour_choices(), vec![23]);
        draft.set_end_hour(23);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn invalid_drafts_are_rejected() {
        let mut draft = ReservationDraft::anchored(ReservableId(3), day(), 9);
        draft.set_end_hour(9);
        assert!(matches!(draft.validate(), Err(ApiError::InvalidArgument(_))));

        let mut draft = ReservationDraft::anchored(ReservableId(3), day(), 6);
        assert!(draft.validate().is_err());
        draft.reservable = None;
        draft.start_hour = 9;
        draft.end_hour = 10;
        assert!(draft.validate().is_err());
    }
}
