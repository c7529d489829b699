pub mod attendee;

pub use attendee::{Attendee, NewAttendee};
