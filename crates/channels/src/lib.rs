//! External provider integrations: outbound message channels (SMS, email)
//! and the calendar backend, plus the bounded retry helper the engine uses
//! for sends.

pub mod calendar;
pub mod email;
pub mod outbound;
pub mod retry;
pub mod sms;

pub use calendar::{
    CalendarError, CalendarEventId, CalendarEventRequest, CalendarProvider,
    HttpCalendarProvider, InMemoryCalendarProvider,
};
pub use email::HttpEmailSender;
pub use outbound::{
    ChannelError, ChannelRouter, ChannelSender, DeliveryId, NoopChannelSender,
    RecordingChannelSender,
};
pub use retry::{send_with_retry, SendRetryPolicy};
pub use sms::HttpSmsSender;
