use std::sync::Arc;

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::{info, warn};

use leadflow_channels::calendar::{CalendarEventRequest, CalendarProvider};
use leadflow_core::domain::booking::{Reservation, Slot};

use crate::locks::KeyedLocks;

pub const BOOKING_EVENT_SUMMARY: &str = "Site Inspection";

#[derive(Clone, Debug)]
pub struct BookingWindow {
    pub start_hour: u32,
    pub end_hour: u32,
    pub slot_minutes: i64,
}

impl Default for BookingWindow {
    fn default() -> Self {
        Self { start_hour: 10, end_hour: 16, slot_minutes: 60 }
    }
}

/// Reserves the canonical first slot of the daily business window. The
/// calendar provider has no atomic check-then-insert, so the whole
/// reservation runs under a per-day lock: two concurrent attempts for one
/// day cannot both observe "free".
pub struct BookingAllocator {
    calendar: Arc<dyn CalendarProvider>,
    day_locks: KeyedLocks,
    window: BookingWindow,
}

impl BookingAllocator {
    pub fn new(calendar: Arc<dyn CalendarProvider>, window: BookingWindow) -> Self {
        Self { calendar, day_locks: KeyedLocks::new(), window }
    }

    /// Attempt to reserve `day`. Any busy interval in the window makes the
    /// whole day unavailable; the caller asks the lead for another day
    /// rather than hunting for gaps. Provider errors are fail-safe: a
    /// booking is never fabricated.
    pub async fn reserve(&self, day: NaiveDate) -> Reservation {
        let _guard = self.day_locks.acquire(&day.to_string()).await;

        let window_start = local_hour_on(day, self.window.start_hour);
        let window_end = local_hour_on(day, self.window.end_hour);

        let busy = match self.calendar.list_busy(window_start, window_end).await {
            Ok(busy) => busy,
            Err(error) => {
                warn!(
                    event_name = "booking.calendar_query_failed",
                    day = %day,
                    error = %error,
                    "treating day as unavailable after calendar query failure"
                );
                return Reservation::Unavailable;
            }
        };

        if !busy.is_empty() {
            return Reservation::Unavailable;
        }

        let slot = Slot {
            start: window_start,
            end: window_start + Duration::minutes(self.window.slot_minutes),
        };

        let insert = self
            .calendar
            .insert(CalendarEventRequest {
                summary: BOOKING_EVENT_SUMMARY.to_owned(),
                start: slot.start,
                end: slot.end,
            })
            .await;

        match insert {
            Ok(event_id) => {
                info!(
                    event_name = "booking.slot_reserved",
                    day = %day,
                    calendar_event_id = %event_id.0,
                    slot_start = %slot.start,
                    "reserved canonical slot"
                );
                Reservation::Booked(slot)
            }
            Err(error) => {
                warn!(
                    event_name = "booking.calendar_insert_failed",
                    day = %day,
                    error = %error,
                    "treating day as unavailable after calendar insert failure"
                );
                Reservation::Unavailable
            }
        }
    }
}

/// Interpret `hour` on `day` as local wall-clock time. DST gaps fall back to
/// treating the naive time as UTC; an hour that does not exist locally still
/// produces a usable window bound.
pub(crate) fn local_hour_on(day: NaiveDate, hour: u32) -> DateTime<Utc> {
    let naive = day
        .and_hms_opt(hour, 0, 0)
        .unwrap_or_else(|| day.and_time(NaiveTime::MIN));

    match Local.from_local_datetime(&naive) {
        LocalResult::Single(local) => local.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}
