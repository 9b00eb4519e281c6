//! Secondary venue quote sources.

mod orca;
mod raydium;

pub use orca::OrcaClient;
pub use raydium::RaydiumClient;
