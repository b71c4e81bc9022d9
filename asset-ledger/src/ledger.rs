//! Main ledger orchestration layer
//!
//! This module ties together the world state, the asset contract and metrics
//! into the public operation set. Each call runs in its own world-state
//! transaction and commits only if the contract returns `Ok`; a failed call
//! leaves the ledger untouched.
//!
//! # Example
//!
//! ```no_run
//! use asset_ledger::{AssetLedger, Config};
//!
//! fn main() -> asset_ledger::Result<()> {
//!     let ledger = AssetLedger::open(Config::default())?;
//!
//!     ledger.create_product("p1", "kiwi", "NA", "1/9/24", "9")?;
//!     ledger.supply_product("p1", "2/1/24", "W2")?;
//!
//!     let asset = ledger.read_asset("p1")?;
//!     assert_eq!(asset.status.as_str(), "Supplied");
//!     Ok(())
//! }
//! ```

use crate::{
    codec::StateHasher,
    contract::AssetContract,
    metrics::Metrics,
    store::RecordStore,
    types::Asset,
    world_state::{Transaction, WorldState},
    Config, Error, Result,
};
use std::fmt;
use std::time::Instant;

/// Main ledger interface
pub struct AssetLedger {
    /// Versioned RocksDB state
    world: WorldState,

    /// Record rules
    contract: AssetContract,

    /// Operation metrics
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl AssetLedger {
    /// Open ledger with configuration
    pub fn open(config: Config) -> Result<Self> {
        let world = WorldState::open(&config)?;
        let contract =
            AssetContract::new().with_lifecycle_enforcement(config.ledger.enforce_lifecycle);
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to register metrics: {}", e)))?;

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            enforce_lifecycle = config.ledger.enforce_lifecycle,
            "Asset ledger opened"
        );

        Ok(Self {
            world,
            contract,
            metrics,
            config,
        })
    }

    /// Write the fixed seed records
    pub fn init_ledger(&self) -> Result<()> {
        self.execute("InitLedger", |tx| self.contract.init_ledger(tx))
    }

    /// Issue a new product
    pub fn create_product(
        &self,
        id: &str,
        name: &str,
        description: &str,
        manufacturing_date: &str,
        batch_no: &str,
    ) -> Result<()> {
        self.execute("CreateProduct", |tx| {
            self.contract
                .create_product(tx, id, name, description, manufacturing_date, batch_no)
        })
    }

    /// Read one asset
    pub fn read_asset(&self, id: &str) -> Result<Asset> {
        self.execute("ReadAsset", |tx| self.contract.read_asset(tx, id))
    }

    /// Alias of [`Self::read_asset`]
    pub fn query_product(&self, id: &str) -> Result<Asset> {
        self.execute("QueryProduct", |tx| self.contract.query_product(tx, id))
    }

    /// Whether `id` is stored
    pub fn asset_exists(&self, id: &str) -> Result<bool> {
        self.execute("AssetExists", |tx| self.contract.asset_exists(tx, id))
    }

    /// Record the supply transition
    pub fn supply_product(&self, id: &str, supply_date: &str, ware_location: &str) -> Result<()> {
        self.execute("SupplyProduct", |tx| {
            self.contract
                .supply_product(tx, id, supply_date, ware_location)
        })
    }

    /// Record the wholesale transition
    pub fn wholesale_product(
        &self,
        id: &str,
        wholesale_date: &str,
        wholesale_location: &str,
        wholesale_quantity: &str,
    ) -> Result<()> {
        self.execute("WholesaleProduct", |tx| {
            self.contract.wholesale_product(
                tx,
                id,
                wholesale_date,
                wholesale_location,
                wholesale_quantity,
            )
        })
    }

    /// Set the status verbatim
    pub fn update_product_status(&self, id: &str, status: &str) -> Result<()> {
        self.execute("UpdateProductStatus", |tx| {
            self.contract.update_product_status(tx, id, status)
        })
    }

    /// Replace the record with one holding only id and status
    pub fn update_asset(&self, id: &str, status: &str) -> Result<()> {
        self.execute("UpdateAsset", |tx| self.contract.update_asset(tx, id, status))
    }

    /// Remove an asset
    pub fn delete_asset(&self, id: &str) -> Result<()> {
        self.execute("DeleteAsset", |tx| self.contract.delete_asset(tx, id))
    }

    /// Every asset in key order
    pub fn get_all_assets(&self) -> Result<Vec<Asset>> {
        self.execute("GetAllAssets", |tx| self.contract.get_all_assets(tx))
    }

    /// SHA-256 over every stored `(key, bytes)` pair in key order.
    ///
    /// Replicas holding the same records return the same digest.
    pub fn state_digest(&self) -> Result<[u8; 32]> {
        self.execute("StateDigest", |tx| {
            let mut hasher = StateHasher::new();
            for entry in tx.scan_all()? {
                let (key, bytes) = entry?;
                hasher.update(&key, &bytes);
            }
            tracing::debug!(entries = hasher.entries(), "State digest computed");
            Ok(hasher.finalize())
        })
    }

    /// Run `op` in a fresh transaction, committing only on success
    fn execute<T>(
        &self,
        operation: &'static str,
        op: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let started = Instant::now();
        let tx = self.world.begin();
        let span = tracing::debug_span!("asset_op", operation, tx_id = %tx.id());
        let _enter = span.enter();

        let result = match op(&tx) {
            Ok(value) => tx.commit().map(|seq| {
                if seq.is_some() {
                    self.metrics.record_commit();
                }
                value
            }),
            Err(e) => Err(e),
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => {
                if matches!(e, Error::Conflict { .. }) {
                    self.metrics.record_conflict();
                }
                tracing::debug!(error = %e, "Operation failed");
                e.kind()
            }
        };
        self.metrics
            .record_operation(operation, outcome, started.elapsed().as_secs_f64());

        result
    }

    /// Underlying world state, for explicit multi-step transactions
    pub fn world_state(&self) -> &WorldState {
        &self.world
    }

    /// Contract rules in effect
    pub fn contract(&self) -> &AssetContract {
        &self.contract
    }

    /// Operation metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shutdown ledger
    pub fn close(self) -> Result<()> {
        self.world.close()
    }
}

impl fmt::Debug for AssetLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetLedger")
            .field("world", &self.world)
            .field("contract", &self.contract)
            .finish_non_exhaustive()
    }
}
