//! Asset contract: the record-management rules
//!
//! Every operation is one read-validate-write sequence against a
//! [`RecordStore`]. Mutations other than creation follow the same shape:
//! `asset_exists`, then `read_asset`, then mutate and overwrite the whole
//! record. The check-then-act span is not atomic on its own; it is safe only
//! when the store validates the read set at commit (see
//! [`crate::world_state`]).

use crate::{
    codec,
    store::RecordStore,
    types::{seed_assets, Asset, AssetStatus},
    Error, Result,
};

/// Asset lifecycle rules over any record store
#[derive(Debug, Clone, Default)]
pub struct AssetContract {
    enforce_lifecycle: bool,
}

impl AssetContract {
    /// Contract accepting supply/wholesale in any order
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject supply/wholesale calls that skip a lifecycle stage
    pub fn with_lifecycle_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_lifecycle = enforce;
        self
    }

    /// Write the fixed seed set, overwriting any existing records with the same ids
    pub fn init_ledger<S: RecordStore + ?Sized>(&self, store: &S) -> Result<()> {
        for asset in seed_assets() {
            self.write(store, &asset)?;
        }
        tracing::info!("Seeded ledger with initial assets");
        Ok(())
    }

    /// Issue a new product with status `created`
    pub fn create_product<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        id: &str,
        name: &str,
        description: &str,
        manufacturing_date: &str,
        batch_no: &str,
    ) -> Result<()> {
        if id.is_empty() {
            return Err(Error::InvalidArgument("product id must not be empty".to_string()));
        }
        if self.asset_exists(store, id)? {
            return Err(Error::AlreadyExists(id.to_string()));
        }

        let asset = Asset::manufactured(id, name, description, manufacturing_date, batch_no);
        self.write(store, &asset)?;

        tracing::info!(product_id = %id, "Product created");
        Ok(())
    }

    /// Stored record for `id`
    pub fn read_asset<S: RecordStore + ?Sized>(&self, store: &S, id: &str) -> Result<Asset> {
        let bytes = store
            .get(id)?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        codec::decode(id, &bytes)
    }

    /// Alias of [`Self::read_asset`]
    pub fn query_product<S: RecordStore + ?Sized>(&self, store: &S, id: &str) -> Result<Asset> {
        self.read_asset(store, id)
    }

    /// Whether a record is stored under `id`
    pub fn asset_exists<S: RecordStore + ?Sized>(&self, store: &S, id: &str) -> Result<bool> {
        Ok(store.get(id)?.is_some())
    }

    /// Record the supply transition
    pub fn supply_product<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        id: &str,
        supply_date: &str,
        ware_location: &str,
    ) -> Result<()> {
        let mut asset = self.load_existing(store, id)?;
        self.check_transition(&asset, &AssetStatus::Supplied)?;

        asset.supply(supply_date, ware_location);
        self.write(store, &asset)?;

        tracing::info!(product_id = %id, ware_location = %ware_location, "Product supplied");
        Ok(())
    }

    /// Record the wholesale transition
    pub fn wholesale_product<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        id: &str,
        wholesale_date: &str,
        wholesale_location: &str,
        wholesale_quantity: &str,
    ) -> Result<()> {
        let mut asset = self.load_existing(store, id)?;
        self.check_transition(&asset, &AssetStatus::Wholesaled)?;

        asset.wholesale(wholesale_date, wholesale_location, wholesale_quantity);
        self.write(store, &asset)?;

        tracing::info!(
            product_id = %id,
            wholesale_location = %wholesale_location,
            wholesale_quantity = %wholesale_quantity,
            "Product wholesaled"
        );
        Ok(())
    }

    /// Set the status verbatim, keeping every other field.
    ///
    /// Bypasses lifecycle enforcement.
    pub fn update_product_status<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        id: &str,
        status: &str,
    ) -> Result<()> {
        let mut asset = self.load_existing(store, id)?;
        let status = AssetStatus::parse(status);
        warn_on_bypass(id, &asset.status, &status);

        asset.status = status;
        self.write(store, &asset)
    }

    /// Replace the whole record with one holding only the id and `status`.
    ///
    /// Descriptive, supply and wholesale fields are reset to empty strings.
    /// Kept for compatibility with existing clients; prefer
    /// [`Self::update_product_status`].
    pub fn update_asset<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        id: &str,
        status: &str,
    ) -> Result<()> {
        if !self.asset_exists(store, id)? {
            return Err(Error::NotFound(id.to_string()));
        }

        let status = AssetStatus::parse(status);
        tracing::warn!(
            product_id = %id,
            status = %status,
            "update_asset discards all descriptive, supply and wholesale fields"
        );

        self.write(store, &Asset::status_only(id, status))
    }

    /// Remove the record for `id`
    pub fn delete_asset<S: RecordStore + ?Sized>(&self, store: &S, id: &str) -> Result<()> {
        if !self.asset_exists(store, id)? {
            return Err(Error::NotFound(id.to_string()));
        }

        store.delete(id)?;
        tracing::info!(product_id = %id, "Asset deleted");
        Ok(())
    }

    /// Every record in store key order.
    ///
    /// One malformed record fails the whole call; the scan cursor is released
    /// on every path.
    pub fn get_all_assets<S: RecordStore + ?Sized>(&self, store: &S) -> Result<Vec<Asset>> {
        let mut assets = Vec::new();
        for entry in store.scan_all()? {
            let (key, bytes) = entry?;
            assets.push(codec::decode(&key, &bytes)?);
        }
        Ok(assets)
    }

    fn load_existing<S: RecordStore + ?Sized>(&self, store: &S, id: &str) -> Result<Asset> {
        if !self.asset_exists(store, id)? {
            return Err(Error::NotFound(id.to_string()));
        }
        self.read_asset(store, id)
    }

    fn check_transition(&self, asset: &Asset, next: &AssetStatus) -> Result<()> {
        if self.enforce_lifecycle && !asset.status.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                product_id: asset.product_id.clone(),
                from: asset.status.to_string(),
                to: next.to_string(),
            });
        }
        Ok(())
    }

    fn write<S: RecordStore + ?Sized>(&self, store: &S, asset: &Asset) -> Result<()> {
        let bytes = codec::encode(asset)?;
        store.put(&asset.product_id, &bytes)?;
        tracing::debug!(product_id = %asset.product_id, bytes = bytes.len(), "Asset written");
        Ok(())
    }
}

fn warn_on_bypass(id: &str, from: &AssetStatus, to: &AssetStatus) {
    if !to.is_lifecycle() || !from.can_transition_to(to) {
        tracing::warn!(
            product_id = %id,
            from = %from,
            to = %to,
            "Status set outside the created -> Supplied -> Wholesaled lifecycle"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, RecordScan};
    use crate::types::NOT_APPLICABLE;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts writes and can fail reads on demand
    #[derive(Default)]
    struct ProbeStore {
        inner: MemoryStore,
        puts: AtomicUsize,
        deletes: AtomicUsize,
        fail_gets: bool,
    }

    impl ProbeStore {
        fn writes(&self) -> usize {
            self.puts.load(Ordering::SeqCst) + self.deletes.load(Ordering::SeqCst)
        }
    }

    impl RecordStore for ProbeStore {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            if self.fail_gets {
                return Err(Error::Storage("connection reset".to_string()));
            }
            self.inner.get(key)
        }

        fn put(&self, key: &str, value: &[u8]) -> Result<()> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.inner.put(key, value)
        }

        fn delete(&self, key: &str) -> Result<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(key)
        }

        fn scan_all(&self) -> Result<RecordScan<'_>> {
            self.inner.scan_all()
        }
    }

    fn kiwi(contract: &AssetContract, store: &impl RecordStore) {
        contract
            .create_product(store, "p1", "kiwi", "green", "1/9/24", "9")
            .unwrap();
    }

    #[test]
    fn test_create_then_read() {
        let contract = AssetContract::new();
        let store = MemoryStore::new();
        kiwi(&contract, &store);

        let asset = contract.read_asset(&store, "p1").unwrap();
        assert_eq!(asset.product_id, "p1");
        assert_eq!(asset.name, "kiwi");
        assert_eq!(asset.description, "green");
        assert_eq!(asset.manufacturing_date, "1/9/24");
        assert_eq!(asset.batch_no, "9");
        assert_eq!(asset.status, AssetStatus::Created);
        assert_eq!(asset.supply_date, NOT_APPLICABLE);
        assert_eq!(asset.wholesale_quantity, NOT_APPLICABLE);
    }

    #[test]
    fn test_create_duplicate_leaves_value_unchanged() {
        let contract = AssetContract::new();
        let store = ProbeStore::default();
        kiwi(&contract, &store);
        let before = store.get("p1").unwrap();

        let err = contract
            .create_product(&store, "p1", "other", "x", "2/2/24", "1")
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(ref id) if id == "p1"));
        assert_eq!(store.get("p1").unwrap(), before);
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn test_create_rejects_empty_id() {
        let contract = AssetContract::new();
        let store = ProbeStore::default();
        let err = contract
            .create_product(&store, "", "kiwi", "", "", "")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_mutations_on_missing_id_write_nothing() {
        let contract = AssetContract::new();
        let store = ProbeStore::default();

        let results = [
            contract.supply_product(&store, "ghost", "2/1/24", "W2"),
            contract.wholesale_product(&store, "ghost", "3/1/24", "WH2", "5"),
            contract.update_product_status(&store, "ghost", "recalled"),
            contract.update_asset(&store, "ghost", "recalled"),
            contract.delete_asset(&store, "ghost"),
        ];

        for result in results {
            assert!(matches!(result, Err(Error::NotFound(ref id)) if id == "ghost"));
        }
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_read_missing() {
        let contract = AssetContract::new();
        let store = MemoryStore::new();
        assert!(matches!(
            contract.read_asset(&store, "p1"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            contract.query_product(&store, "p1"),
            Err(Error::NotFound(_))
        ));
        assert!(!contract.asset_exists(&store, "p1").unwrap());
    }

    #[test]
    fn test_supply_changes_only_supply_fields() {
        let contract = AssetContract::new();
        let store = MemoryStore::new();
        kiwi(&contract, &store);
        let before = contract.read_asset(&store, "p1").unwrap();

        contract.supply_product(&store, "p1", "2/1/24", "W2").unwrap();
        let after = contract.read_asset(&store, "p1").unwrap();

        assert_eq!(after.status, AssetStatus::Supplied);
        assert_eq!(after.supply_date, "2/1/24");
        assert_eq!(after.ware_location, "W2");
        assert_eq!(
            Asset {
                supply_date: before.supply_date.clone(),
                ware_location: before.ware_location.clone(),
                status: before.status.clone(),
                ..after.clone()
            },
            before
        );
    }

    #[test]
    fn test_wholesale_sets_fields() {
        let contract = AssetContract::new();
        let store = MemoryStore::new();
        kiwi(&contract, &store);
        contract.supply_product(&store, "p1", "2/1/24", "W2").unwrap();

        contract
            .wholesale_product(&store, "p1", "3/1/24", "WH2", "40")
            .unwrap();
        let asset = contract.read_asset(&store, "p1").unwrap();

        assert_eq!(asset.status, AssetStatus::Wholesaled);
        assert_eq!(asset.wholesale_date, "3/1/24");
        assert_eq!(asset.wholesale_location, "WH2");
        assert_eq!(asset.wholesale_quantity, "40");
        assert_eq!(asset.ware_location, "W2");
    }

    #[test]
    fn test_update_product_status_keeps_fields() {
        let contract = AssetContract::new();
        let store = MemoryStore::new();
        kiwi(&contract, &store);

        contract
            .update_product_status(&store, "p1", "recalled")
            .unwrap();
        let asset = contract.read_asset(&store, "p1").unwrap();
        assert_eq!(asset.status.as_str(), "recalled");
        assert_eq!(asset.name, "kiwi");
        assert_eq!(asset.supply_date, NOT_APPLICABLE);
    }

    #[test]
    fn test_update_asset_overwrites_record() {
        let contract = AssetContract::new();
        let store = MemoryStore::new();
        kiwi(&contract, &store);

        contract.update_asset(&store, "p1", "audited").unwrap();
        let asset = contract.read_asset(&store, "p1").unwrap();
        assert_eq!(asset, Asset::status_only("p1", AssetStatus::from("audited")));
        assert!(asset.name.is_empty());
        assert!(asset.supply_date.is_empty());
    }

    #[test]
    fn test_delete() {
        let contract = AssetContract::new();
        let store = MemoryStore::new();
        kiwi(&contract, &store);

        contract.delete_asset(&store, "p1").unwrap();
        assert!(!contract.asset_exists(&store, "p1").unwrap());
        assert!(matches!(
            contract.read_asset(&store, "p1"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_init_ledger_overwrites_and_lists_in_order() {
        let contract = AssetContract::new();
        let store = MemoryStore::new();
        contract
            .create_product(&store, "asset3", "mango", "", "", "")
            .unwrap();

        contract.init_ledger(&store).unwrap();
        let all = contract.get_all_assets(&store).unwrap();

        assert_eq!(all, seed_assets());
        assert_eq!(all[2].name, "grape");
    }

    #[test]
    fn test_get_all_aborts_on_malformed_record_and_releases_cursor() {
        let contract = AssetContract::new();
        let store = MemoryStore::new();
        contract.init_ledger(&store).unwrap();
        store.put("asset4", b"{broken").unwrap();

        let err = contract.get_all_assets(&store).unwrap_err();
        assert!(matches!(err, Error::Decode { ref key, .. } if key == "asset4"));
        assert_eq!(store.open_cursors(), 0);
    }

    #[test]
    fn test_store_errors_propagate() {
        let contract = AssetContract::new();
        let store = ProbeStore {
            fail_gets: true,
            ..Default::default()
        };

        let err = contract.asset_exists(&store, "p1").unwrap_err();
        assert!(err.is_store_error());

        let err = contract.supply_product(&store, "p1", "d", "w").unwrap_err();
        assert!(err.is_store_error());
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_lifecycle_enforcement() {
        let contract = AssetContract::new().with_lifecycle_enforcement(true);
        let store = MemoryStore::new();
        kiwi(&contract, &store);

        let err = contract
            .wholesale_product(&store, "p1", "3/1/24", "WH2", "40")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition { ref from, ref to, .. } if from == "created" && to == "Wholesaled"
        ));
        assert_eq!(
            contract.read_asset(&store, "p1").unwrap().status,
            AssetStatus::Created
        );

        contract.supply_product(&store, "p1", "2/1/24", "W2").unwrap();
        contract
            .wholesale_product(&store, "p1", "3/1/24", "WH2", "40")
            .unwrap();

        // Escape hatch stays open
        contract
            .update_product_status(&store, "p1", "created")
            .unwrap();
    }

    #[test]
    fn test_seed_records_reject_supply_under_enforcement() {
        let contract = AssetContract::new().with_lifecycle_enforcement(true);
        let store = MemoryStore::new();
        contract.init_ledger(&store).unwrap();

        assert!(matches!(
            contract.supply_product(&store, "asset1", "2/1/24", "W2"),
            Err(Error::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_unenforced_allows_any_order() {
        let contract = AssetContract::new();
        let store = MemoryStore::new();
        contract.init_ledger(&store).unwrap();

        contract
            .wholesale_product(&store, "asset1", "3/1/24", "WH9", "1")
            .unwrap();
        contract.supply_product(&store, "asset1", "2/1/24", "W9").unwrap();
        assert_eq!(
            contract.read_asset(&store, "asset1").unwrap().status,
            AssetStatus::Supplied
        );
    }
}
