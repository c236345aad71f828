//! Reservation timeline logic shared by the browser app: API clients, the
//! per-day cache, the grid controller and the hour-grid layout.

pub mod api;
pub mod cache;
pub mod config;
pub mod controller;
pub mod draft;
pub mod error;
pub mod selection;
pub mod timeline;
pub mod window;

pub use api::{fan_out, ApiClient, ReservationSource};
pub use cache::{CacheTicket, DayCache};
pub use config::{ClientConfig, ClientSettings, FetchStrategy};
pub use controller::{GridController, GridKey, GridState, GridStatus};
pub use draft::ReservationDraft;
pub use error::ApiError;
pub use selection::Selection;
pub use timeline::{build_timeline, day_slots, GridCell, TimeSlot, Timeline, TimelineIssue};
pub use window::TimeWindow;
