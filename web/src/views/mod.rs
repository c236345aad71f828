pub mod filter_controls;
pub mod reservable_selector;
pub mod reservations_page;
pub mod timeline_grid;

pub use reservations_page::ReservationsPage;
