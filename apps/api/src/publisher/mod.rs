pub mod guard;
pub mod retry;
pub mod sweep;
