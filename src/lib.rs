pub mod config;
pub mod learn;
pub mod shared;
