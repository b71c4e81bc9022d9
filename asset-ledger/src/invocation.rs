//! Function-name invocation of ledger operations
//!
//! Clients address operations by name with positional string arguments, e.g.
//! `SupplyProduct p1 2/1/24 W2`. [`Invocation::parse`] turns that into a typed
//! call and [`Invocation::execute`] runs it against an [`AssetLedger`].

use crate::{types::Asset, AssetLedger, Error, Result};
use serde::Serialize;

/// A parsed operation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Overwrite the seed records
    InitLedger,
    /// Register a manufactured product
    CreateProduct {
        id: String,
        name: String,
        description: String,
        manufacturing_date: String,
        batch_no: String,
    },
    /// Fetch one record
    ReadAsset {
        id: String,
    },
    /// Check whether a key is present
    AssetExists {
        id: String,
    },
    /// Record the supply stage
    SupplyProduct {
        id: String,
        supply_date: String,
        ware_location: String,
    },
    /// Record the wholesale stage
    WholesaleProduct {
        id: String,
        wholesale_date: String,
        wholesale_location: String,
        wholesale_quantity: String,
    },
    /// Alias of `ReadAsset`
    QueryProduct {
        id: String,
    },
    /// Set the status, keeping every other field
    UpdateProductStatus {
        id: String,
        status: String,
    },
    /// Replace the record with key and status only
    UpdateAsset {
        id: String,
        status: String,
    },
    /// Remove a record
    DeleteAsset {
        id: String,
    },
    /// List every record in key order
    GetAllAssets,
    /// Hex SHA-256 of the whole world state
    StateDigest,
}

/// Value returned by an invocation, serialized untagged
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InvocationResult {
    /// Mutations return nothing
    None,
    /// `AssetExists`
    Bool(bool),
    /// `ReadAsset` and `QueryProduct`
    Asset(Asset),
    /// `GetAllAssets`
    Assets(Vec<Asset>),
    /// `StateDigest`, hex-encoded
    Digest(String),
}

impl Invocation {
    /// Parse `function` and its positional `args`
    pub fn parse(function: &str, args: &[String]) -> Result<Self> {
        let expect = |n: usize| -> Result<()> {
            if args.len() == n {
                Ok(())
            } else {
                Err(Error::InvalidArgument(format!(
                    "{} expects {} argument(s), got {}",
                    function,
                    n,
                    args.len()
                )))
            }
        };
        let arg = |i: usize| args[i].clone();

        let invocation = match function {
            "InitLedger" => {
                expect(0)?;
                Invocation::InitLedger
            }
            "CreateProduct" => {
                expect(5)?;
                Invocation::CreateProduct {
                    id: arg(0),
                    name: arg(1),
                    description: arg(2),
                    manufacturing_date: arg(3),
                    batch_no: arg(4),
                }
            }
            "ReadAsset" => {
                expect(1)?;
                Invocation::ReadAsset { id: arg(0) }
            }
            "AssetExists" => {
                expect(1)?;
                Invocation::AssetExists { id: arg(0) }
            }
            "SupplyProduct" => {
                expect(3)?;
                Invocation::SupplyProduct {
                    id: arg(0),
                    supply_date: arg(1),
                    ware_location: arg(2),
                }
            }
            "WholesaleProduct" => {
                expect(4)?;
                Invocation::WholesaleProduct {
                    id: arg(0),
                    wholesale_date: arg(1),
                    wholesale_location: arg(2),
                    wholesale_quantity: arg(3),
                }
            }
            "QueryProduct" => {
                expect(1)?;
                Invocation::QueryProduct { id: arg(0) }
            }
            "UpdateProductStatus" => {
                expect(2)?;
                Invocation::UpdateProductStatus {
                    id: arg(0),
                    status: arg(1),
                }
            }
            "UpdateAsset" => {
                expect(2)?;
                Invocation::UpdateAsset {
                    id: arg(0),
                    status: arg(1),
                }
            }
            "DeleteAsset" => {
                expect(1)?;
                Invocation::DeleteAsset { id: arg(0) }
            }
            "GetAllAssets" => {
                expect(0)?;
                Invocation::GetAllAssets
            }
            "StateDigest" => {
                expect(0)?;
                Invocation::StateDigest
            }
            other => {
                return Err(Error::InvalidArgument(format!(
                    "unknown function: {}",
                    other
                )))
            }
        };

        Ok(invocation)
    }

    /// Function name as clients address it
    pub fn name(&self) -> &'static str {
        match self {
            Invocation::InitLedger => "InitLedger",
            Invocation::CreateProduct { .. } => "CreateProduct",
            Invocation::ReadAsset { .. } => "ReadAsset",
            Invocation::AssetExists { .. } => "AssetExists",
            Invocation::SupplyProduct { .. } => "SupplyProduct",
            Invocation::WholesaleProduct { .. } => "WholesaleProduct",
            Invocation::QueryProduct { .. } => "QueryProduct",
            Invocation::UpdateProductStatus { .. } => "UpdateProductStatus",
            Invocation::UpdateAsset { .. } => "UpdateAsset",
            Invocation::DeleteAsset { .. } => "DeleteAsset",
            Invocation::GetAllAssets => "GetAllAssets",
            Invocation::StateDigest => "StateDigest",
        }
    }

    /// Run against `ledger`
    pub fn execute(&self, ledger: &AssetLedger) -> Result<InvocationResult> {
        use InvocationResult as R;

        Ok(match self {
            Invocation::InitLedger => {
                ledger.init_ledger()?;
                R::None
            }
            Invocation::CreateProduct {
                id,
                name,
                description,
                manufacturing_date,
                batch_no,
            } => {
                ledger.create_product(id, name, description, manufacturing_date, batch_no)?;
                R::None
            }
            Invocation::ReadAsset { id } => R::Asset(ledger.read_asset(id)?),
            Invocation::AssetExists { id } => R::Bool(ledger.asset_exists(id)?),
            Invocation::SupplyProduct {
                id,
                supply_date,
                ware_location,
            } => {
                ledger.supply_product(id, supply_date, ware_location)?;
                R::None
            }
            Invocation::WholesaleProduct {
                id,
                wholesale_date,
                wholesale_location,
                wholesale_quantity,
            } => {
                ledger.wholesale_product(id, wholesale_date, wholesale_location, wholesale_quantity)?;
                R::None
            }
            Invocation::QueryProduct { id } => R::Asset(ledger.query_product(id)?),
            Invocation::UpdateProductStatus { id, status } => {
                ledger.update_product_status(id, status)?;
                R::None
            }
            Invocation::UpdateAsset { id, status } => {
                ledger.update_asset(id, status)?;
                R::None
            }
            Invocation::DeleteAsset { id } => {
                ledger.delete_asset(id)?;
                R::None
            }
            Invocation::GetAllAssets => R::Assets(ledger.get_all_assets()?),
            Invocation::StateDigest => R::Digest(hex::encode(ledger.state_digest()?)),
        })
    }
}
