//! Command implementations dispatched from the binary.

pub mod context;
pub mod enroll;
pub mod scramble;
