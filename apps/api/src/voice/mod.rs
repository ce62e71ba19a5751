pub mod handlers;
pub mod tracker;
