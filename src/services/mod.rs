pub mod expiry;
pub mod gateway;
pub mod notify;
pub mod payments;
pub mod reservations;
pub mod signature;
