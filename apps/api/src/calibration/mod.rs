pub mod engine;
pub mod fit;
