pub mod booking;
pub mod payments;
pub mod seats;
pub mod trips;
