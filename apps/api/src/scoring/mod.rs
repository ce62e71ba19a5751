pub mod calibrated;
pub mod handlers;
pub mod local;
