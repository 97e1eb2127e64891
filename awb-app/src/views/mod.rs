pub mod pattern;
pub mod s11;
