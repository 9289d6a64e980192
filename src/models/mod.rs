pub mod booking;
pub mod show;

pub use booking::{Booking, BookingStatus, MAX_SEATS_PER_BOOKING};
pub use show::Show;
