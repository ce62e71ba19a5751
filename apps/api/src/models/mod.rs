pub mod calibration;
pub mod content;
pub mod feedback;
pub mod pattern;
pub mod voice;
