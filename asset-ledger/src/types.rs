//! Core types for the asset ledger
//!
//! `Asset` field declaration order is the wire order. Serde derive emits
//! struct fields in declaration order, so encoding never depends on map
//! iteration order.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Sentinel for supply and wholesale fields not yet set by their transition
pub const NOT_APPLICABLE: &str = "NA";

/// Lifecycle status of an asset.
///
/// Wire form is the plain string. Parsing a lifecycle string always yields the
/// named variant, and equality compares wire strings, so
/// `Custom("Supplied".into()) == AssetStatus::Supplied`.
#[derive(Debug, Clone, Eq)]
pub enum AssetStatus {
    /// Set by `create_product`
    Created,
    /// Set by `supply_product`
    Supplied,
    /// Set by `wholesale_product`
    Wholesaled,
    /// Any caller-supplied value outside the lifecycle (including the seed's `"NA"`)
    Custom(String),
}

impl AssetStatus {
    /// Wire string
    pub fn as_str(&self) -> &str {
        match self {
            AssetStatus::Created => "created",
            AssetStatus::Supplied => "Supplied",
            AssetStatus::Wholesaled => "Wholesaled",
            AssetStatus::Custom(s) => s,
        }
    }

    /// Parse a wire string; never fails
    pub fn parse(s: &str) -> Self {
        match s {
            "created" => AssetStatus::Created,
            "Supplied" => AssetStatus::Supplied,
            "Wholesaled" => AssetStatus::Wholesaled,
            other => AssetStatus::Custom(other.to_string()),
        }
    }

    /// Whether the status belongs to the created → Supplied → Wholesaled progression
    pub fn is_lifecycle(&self) -> bool {
        !matches!(AssetStatus::parse(self.as_str()), AssetStatus::Custom(_))
    }

    /// Whether a lifecycle transition from `self` to `next` is permitted.
    ///
    /// Re-applying the current stage is allowed so corrections can be recorded.
    pub fn can_transition_to(&self, next: &AssetStatus) -> bool {
        let from = AssetStatus::parse(self.as_str());
        let to = AssetStatus::parse(next.as_str());
        matches!(
            (from, to),
            (AssetStatus::Created, AssetStatus::Supplied)
                | (AssetStatus::Supplied, AssetStatus::Supplied)
                | (AssetStatus::Supplied, AssetStatus::Wholesaled)
                | (AssetStatus::Wholesaled, AssetStatus::Wholesaled)
        )
    }
}

impl Default for AssetStatus {
    fn default() -> Self {
        AssetStatus::Custom(String::new())
    }
}

impl PartialEq for AssetStatus {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl std::hash::Hash for AssetStatus {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl From<&str> for AssetStatus {
    fn from(s: &str) -> Self {
        AssetStatus::parse(s)
    }
}

impl From<String> for AssetStatus {
    fn from(s: String) -> Self {
        AssetStatus::parse(&s)
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for AssetStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AssetStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = de_string(deserializer)?;
        Ok(AssetStatus::parse(&s))
    }
}

/// String field where JSON `null` reads as the empty string
fn de_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A tracked product record, keyed by `product_id`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Asset {
    /// Primary key, used verbatim as the store key
    #[serde(rename = "ProductID", deserialize_with = "de_string")]
    pub product_id: String,

    #[serde(rename = "Name", deserialize_with = "de_string")]
    pub name: String,

    #[serde(rename = "Description", deserialize_with = "de_string")]
    pub description: String,

    #[serde(rename = "ManufacturingDate", deserialize_with = "de_string")]
    pub manufacturing_date: String,

    #[serde(rename = "BatchNo", deserialize_with = "de_string")]
    pub batch_no: String,

    #[serde(rename = "SupplyDate", deserialize_with = "de_string")]
    pub supply_date: String,

    #[serde(rename = "WareLocation", deserialize_with = "de_string")]
    pub ware_location: String,

    #[serde(rename = "WholesaleDate", deserialize_with = "de_string")]
    pub wholesale_date: String,

    #[serde(rename = "WholesaleLocation", deserialize_with = "de_string")]
    pub wholesale_location: String,

    #[serde(rename = "WholesaleQuantity", deserialize_with = "de_string")]
    pub wholesale_quantity: String,

    #[serde(rename = "Status")]
    pub status: AssetStatus,
}

impl Asset {
    /// New manufactured product: supply and wholesale fields hold the sentinel
    pub fn manufactured(
        product_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        manufacturing_date: impl Into<String>,
        batch_no: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            description: description.into(),
            manufacturing_date: manufacturing_date.into(),
            batch_no: batch_no.into(),
            supply_date: NOT_APPLICABLE.to_string(),
            ware_location: NOT_APPLICABLE.to_string(),
            wholesale_date: NOT_APPLICABLE.to_string(),
            wholesale_location: NOT_APPLICABLE.to_string(),
            wholesale_quantity: NOT_APPLICABLE.to_string(),
            status: AssetStatus::Created,
        }
    }

    /// Record carrying only key and status; every other field is empty
    pub fn status_only(product_id: impl Into<String>, status: AssetStatus) -> Self {
        Self {
            product_id: product_id.into(),
            status,
            ..Default::default()
        }
    }

    /// Apply the supply transition
    pub fn supply(&mut self, supply_date: impl Into<String>, ware_location: impl Into<String>) {
        self.supply_date = supply_date.into();
        self.ware_location = ware_location.into();
        self.status = AssetStatus::Supplied;
    }

    /// Apply the wholesale transition
    pub fn wholesale(
        &mut self,
        wholesale_date: impl Into<String>,
        wholesale_location: impl Into<String>,
        wholesale_quantity: impl Into<String>,
    ) {
        self.wholesale_date = wholesale_date.into();
        self.wholesale_location = wholesale_location.into();
        self.wholesale_quantity = wholesale_quantity.into();
        self.status = AssetStatus::Wholesaled;
    }
}

/// Fixed records written by `init_ledger`
pub fn seed_assets() -> Vec<Asset> {
    const NAMES: [&str; 7] = ["apple", "banana", "grape", "guava", "potato", "tomato", "carrot"];

    NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let n = i + 1;
            Asset {
                product_id: format!("asset{}", n),
                name: name.to_string(),
                description: NOT_APPLICABLE.to_string(),
                manufacturing_date: format!("1/{}/24", n),
                batch_no: n.to_string(),
                supply_date: "1/2/24".to_string(),
                ware_location: "W1".to_string(),
                wholesale_date: "1/3/24".to_string(),
                wholesale_location: "WH1".to_string(),
                wholesale_quantity: "10".to_string(),
                status: AssetStatus::Custom(NOT_APPLICABLE.to_string()),
            }
        })
        .collect()
}
