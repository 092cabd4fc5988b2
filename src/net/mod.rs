pub mod prediction;
pub mod protocol;
pub mod session;
pub mod snapshot;
pub mod transport;
