pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod input;
pub mod map;
pub mod net;
pub mod pathfinding;
pub mod report;
pub mod rng;
pub mod types;
