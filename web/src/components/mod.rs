pub mod draft_panel;
pub mod error;
pub mod loading;
pub mod reservation_modal;

pub use draft_panel::DraftPanel;
pub use reservation_modal::ReservationModal;
