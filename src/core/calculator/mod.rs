pub mod aggregate;
pub mod window;
