pub mod clock_record;
pub mod location;
pub mod perimeter;
pub mod role;
pub mod user;
