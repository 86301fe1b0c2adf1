//! Built-in worker strategies.

mod polling;

pub use polling::PollingStrategy;
