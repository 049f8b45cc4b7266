//! Elementary-stream codec helpers.

pub mod ac3;
