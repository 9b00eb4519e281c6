//! Jito Bundle Adapter
//!
//! Atomic multi-transaction execution through Jito Block Engines, with
//! sequential failover across a ranked endpoint list.

mod bundle;
mod client;
mod config;
mod error;
mod types;

pub use bundle::BundleBuilder;
pub use client::{BundleEndpoint, JitoBundleClient, MAX_BUNDLE_TRANSACTIONS};
pub use config::{endpoints, tip_accounts, BundleConfig, JitoConfig};
pub use error::JitoError;
pub use types::{
    BundleMetadata, BundleResult, BundleState, BundleStats, BundleStatus, BundleTransaction,
};
