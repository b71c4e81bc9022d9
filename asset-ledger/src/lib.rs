//! Asset Ledger
//!
//! Product lifecycle records (manufacture → supply → wholesale) kept in a
//! replicated key-value world state.
//!
//! # Architecture
//!
//! - **Record store adapter**: `get` / `put` / `delete` / `scan_all` over a flat key namespace
//! - **Asset contract**: existence checks, status lifecycle, full-record overwrites
//! - **World state**: RocksDB with per-key versions and optimistic conflict detection
//! - **Canonical encoding**: fixed field order, identical bytes on every replica
//!
//! # Invariants
//!
//! - Deterministic encoding: same record → same bytes
//! - Existence is key presence; there is no tombstone
//! - A failed operation writes nothing
//! - Read-modify-write spans are validated at commit, never locked

#![forbid(unsafe_code)]
#![warn(
    rust_2018_idioms,
    missing_debug_implementations,
    unused_qualifications,
    clippy::all
)]

pub mod codec;
pub mod config;
pub mod contract;
pub mod error;
pub mod invocation;
pub mod ledger;
pub mod metrics;
pub mod store;
pub mod types;
pub mod world_state;

// Re-exports
pub use config::Config;
pub use contract::AssetContract;
pub use error::{Error, Result};
pub use invocation::{Invocation, InvocationResult};
pub use ledger::AssetLedger;
pub use store::{MemoryStore, RecordScan, RecordStore};
pub use types::{Asset, AssetStatus};
pub use world_state::{Transaction, WorldState};
