//! Canonical encoding of asset records
//!
//! Every replica must derive the identical byte sequence from the identical
//! record. The encoder writes compact JSON with keys in `Asset` declaration
//! order; no map types are involved anywhere in the path.
//!
//! String escaping matches Go's `encoding/json`: besides the standard JSON
//! escapes, `&`, `<`, `>`, U+2028 and U+2029 are written as `\uXXXX`.

use crate::{types::Asset, Error, Result};
use serde::Serialize;
use serde_json::ser::Formatter;
use sha2::{Digest, Sha256};
use std::io;

/// Compact formatter with HTML-safe string escaping
#[derive(Debug, Clone, Copy, Default)]
struct HtmlSafeFormatter;

impl Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            let escaped = match ch {
                '&' => "\\u0026",
                '<' => "\\u003c",
                '>' => "\\u003e",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..i].as_bytes())?;
            writer.write_all(escaped.as_bytes())?;
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Encode an asset into its canonical bytes
pub fn encode(asset: &Asset) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(256);
    let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, HtmlSafeFormatter);
    asset.serialize(&mut serializer).map_err(Error::Encode)?;
    Ok(bytes)
}

/// Decode stored bytes for `key`.
///
/// Missing or `null` fields decode as empty strings and unknown fields are
/// ignored. Keys match exactly. Malformed input is a `Decode` error naming the key.
pub fn decode(key: &str, bytes: &[u8]) -> Result<Asset> {
    serde_json::from_slice(bytes).map_err(|source| Error::Decode {
        key: key.to_string(),
        source,
    })
}

/// Incremental SHA-256 over `(key, value)` pairs.
///
/// Each part is length-prefixed (u64 big-endian) so concatenation is
/// unambiguous.
#[derive(Debug, Clone, Default)]
pub struct StateHasher {
    hasher: Sha256,
    entries: u64,
}

impl StateHasher {
    /// Create new hasher
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one entry
    pub fn update(&mut self, key: &str, value: &[u8]) {
        self.hasher.update((key.len() as u64).to_be_bytes());
        self.hasher.update(key.as_bytes());
        self.hasher.update((value.len() as u64).to_be_bytes());
        self.hasher.update(value);
        self.entries += 1;
    }

    /// Number of entries absorbed
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Finish and return the digest
    pub fn finalize(self) -> [u8; 32] {
        self.hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{seed_assets, AssetStatus};

    #[test]
    fn test_field_order_is_fixed() {
        let asset = Asset::manufactured("p1", "kiwi", "NA", "1/9/24", "9");
        let bytes = encode(&asset).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(
            text,
            concat!(
                r#"{"ProductID":"p1","Name":"kiwi","Description":"NA","#,
                r#""ManufacturingDate":"1/9/24","BatchNo":"9","SupplyDate":"NA","#,
                r#""WareLocation":"NA","WholesaleDate":"NA","WholesaleLocation":"NA","#,
                r#""WholesaleQuantity":"NA","Status":"created"}"#
            )
        );
    }

    #[test]
    fn test_html_characters_escaped_like_go() {
        let asset = Asset::manufactured("p1", "A&B<C>", "x\u{2028}y\u{2029}z", "1/9/24", "9");
        let text = String::from_utf8(encode(&asset).unwrap()).unwrap();

        // Bytes produced by Go's json.Marshal for the same record
        assert_eq!(
            text,
            concat!(
                r#"{"ProductID":"p1","Name":"A\u0026B\u003cC\u003e","#,
                r#""Description":"x\u2028y\u2029z","#,
                r#""ManufacturingDate":"1/9/24","BatchNo":"9","SupplyDate":"NA","#,
                r#""WareLocation":"NA","WholesaleDate":"NA","WholesaleLocation":"NA","#,
                r#""WholesaleQuantity":"NA","Status":"created"}"#
            )
        );
        assert_eq!(decode("p1", text.as_bytes()).unwrap(), asset);
    }

    #[test]
    fn test_standard_escapes_unchanged() {
        let asset = Asset::status_only("p1", AssetStatus::from("a\"b\\c\nd\u{1}é"));
        let text = String::from_utf8(encode(&asset).unwrap()).unwrap();
        assert!(text.ends_with(r#""Status":"a\"b\\c\nd\u0001é"}"#));
    }

    #[test]
    fn test_status_only_record_keeps_every_field() {
        let asset = Asset::status_only("p1", AssetStatus::from("recalled"));
        let text = String::from_utf8(encode(&asset).unwrap()).unwrap();
        assert!(text.contains(r#""Name":"""#));
        assert!(text.contains(r#""WholesaleQuantity":"""#));
        assert!(text.ends_with(r#""Status":"recalled"}"#));
    }

    #[test]
    fn test_roundtrip_seed() {
        for asset in seed_assets() {
            let bytes = encode(&asset).unwrap();
            let decoded = decode(&asset.product_id, &bytes).unwrap();
            assert_eq!(decoded, asset);
            assert_eq!(encode(&decoded).unwrap(), bytes);
        }
    }

    #[test]
    fn test_decode_tolerates_missing_and_unknown_fields() {
        let asset = decode("p1", br#"{"ProductID":"p1","Status":"Supplied","Owner":"x"}"#).unwrap();
        assert_eq!(asset.product_id, "p1");
        assert_eq!(asset.status, AssetStatus::Supplied);
        assert!(asset.name.is_empty());
    }

    #[test]
    fn test_decode_null_fields_as_empty() {
        let asset = decode(
            "p1",
            br#"{"ProductID":"p1","Name":null,"SupplyDate":null,"Status":null}"#,
        )
        .unwrap();
        assert_eq!(asset.product_id, "p1");
        assert_eq!(asset.name, "");
        assert_eq!(asset.supply_date, "");
        assert_eq!(asset.status, AssetStatus::default());
    }

    #[test]
    fn test_decode_keys_are_case_sensitive() {
        let asset = decode("p1", br#"{"ProductID":"p1","name":"kiwi"}"#).unwrap();
        assert_eq!(asset.name, "");
    }

    #[test]
    fn test_decode_malformed() {
        let err = decode("p1", b"not json").unwrap_err();
        assert!(matches!(err, Error::Decode { ref key, .. } if key == "p1"));

        let err = decode("p2", br#"{"ProductID":42}"#).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_state_hasher_is_order_sensitive() {
        let mut a = StateHasher::new();
        a.update("k1", b"v1");
        a.update("k2", b"v2");

        let mut b = StateHasher::new();
        b.update("k2", b"v2");
        b.update("k1", b"v1");

        assert_eq!(a.entries(), 2);
        assert_ne!(a.finalize(), b.finalize());
    }

    #[test]
    fn test_state_hasher_prefixes_lengths() {
        let mut a = StateHasher::new();
        a.update("ab", b"c");

        let mut b = StateHasher::new();
        b.update("a", b"bc");

        assert_ne!(a.finalize(), b.finalize());
    }

    #[test]
    fn test_state_hasher_wide_length_prefix() {
        let mut hasher = StateHasher::new();
        hasher.update("k", b"v");

        let mut expected = Sha256::new();
        expected.update(1u64.to_be_bytes());
        expected.update(b"k");
        expected.update(1u64.to_be_bytes());
        expected.update(b"v");
        let expected: [u8; 32] = expected.finalize().into();

        assert_eq!(hasher.finalize(), expected);
    }
}
