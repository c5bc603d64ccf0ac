// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Filename Codec
//!
//! A bidirectional mapping between a file's structured metadata and a
//! byte-sortable filename: six 64-bit big-endian fields, hex-encoded, with a
//! `.json` suffix. Big-endian hex guarantees that byte-lexicographic order
//! on filenames equals numeric order on `fileSeq`, and therefore equals
//! chronological order on the records those files contain -- directory
//! listing alone gives a time-ordered index, with no separate index file.

use chrono::{DateTime, Utc};

use crate::error::PriceHistoryError;

/// Portable filename length limit.
const MAX_FILENAME_BYTES: usize = 255;
const SUFFIX: &str = ".json";
const FIELD_COUNT: usize = 6;
const FIELD_BYTES: usize = 8;

/// Structured metadata encoded into (and decoded from) a results filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filename {
    /// Global, dense, strictly increasing ordinal of the file.
    pub file_seq: i64,
    /// Global ordinal of the first record in the file (per-product ordinal
    /// for a per-product hard link).
    pub entry_seq: i64,
    pub n_records: i64,
    pub n_product_ids: i64,
    /// Timestamp of the first record in the file.
    pub start: DateTime<Utc>,
}

impl Filename {
    pub fn new(file_seq: i64, entry_seq: i64, n_records: i64, n_product_ids: i64, start: DateTime<Utc>) -> Self {
        Filename {
            file_seq,
            entry_seq,
            n_records,
            n_product_ids,
            start,
        }
    }

    /// Encodes this metadata as a filename, validating it first.
    pub fn encode(&self) -> Result<String, PriceHistoryError> {
        self.check()?;

        let mut bytes = Vec::with_capacity(FIELD_COUNT * FIELD_BYTES);
        bytes.extend_from_slice(&self.file_seq.to_be_bytes());
        bytes.extend_from_slice(&self.entry_seq.to_be_bytes());
        bytes.extend_from_slice(&self.n_records.to_be_bytes());
        bytes.extend_from_slice(&self.n_product_ids.to_be_bytes());
        bytes.extend_from_slice(&self.start.timestamp().to_be_bytes());
        bytes.extend_from_slice(&(self.start.timestamp_subsec_nanos() as i64).to_be_bytes());

        let mut name = hex::encode(&bytes);
        name.push_str(SUFFIX);

        if name.len() > MAX_FILENAME_BYTES {
            return Err(PriceHistoryError::invariant(format!(
                "encoded filename exceeds {MAX_FILENAME_BYTES} bytes: {} bytes",
                name.len()
            )));
        }

        Ok(name)
    }

    /// Decodes a filename back into its metadata, validating the result.
    pub fn decode(name: &str) -> Result<Filename, PriceHistoryError> {
        let hex_part = name.strip_suffix(SUFFIX).ok_or_else(|| {
            PriceHistoryError::input_validation(format!("filename missing {SUFFIX:?} suffix: {name:?}"))
        })?;

        let bytes = hex::decode(hex_part)
            .map_err(|e| PriceHistoryError::input_validation(format!("filename is not valid hex: {e}")))?;

        let expected = FIELD_COUNT * FIELD_BYTES;
        if bytes.len() != expected {
            return Err(PriceHistoryError::input_validation(format!(
                "filename decodes to {} bytes, expected {expected}",
                bytes.len()
            )));
        }

        let field = |i: usize| -> i64 {
            let start = i * FIELD_BYTES;
            i64::from_be_bytes(bytes[start..start + FIELD_BYTES].try_into().unwrap())
        };

        let file_seq = field(0);
        let entry_seq = field(1);
        let n_records = field(2);
        let n_product_ids = field(3);
        let start_unix_sec = field(4);
        let start_nanos = field(5);

        let start = DateTime::<Utc>::from_timestamp(start_unix_sec, start_nanos.max(0) as u32).ok_or_else(|| {
            PriceHistoryError::input_validation(format!(
                "filename encodes an out-of-range timestamp: {start_unix_sec}s {start_nanos}ns"
            ))
        })?;

        let f = Filename {
            file_seq,
            entry_seq,
            n_records,
            n_product_ids,
            start,
        };
        f.check()?;
        Ok(f)
    }

    /// Validates all four invariant-bearing fields at once, collecting every
    /// offending field into a single error rather than failing on the first.
    fn check(&self) -> Result<(), PriceHistoryError> {
        let mut offenders = Vec::new();
        if self.file_seq < 1 {
            offenders.push(format!("fileSeq {}", self.file_seq));
        }
        if self.entry_seq < 1 {
            offenders.push(format!("entrySeq {}", self.entry_seq));
        }
        if self.n_records < 1 {
            offenders.push(format!("nRecords {}", self.n_records));
        }
        if self.n_product_ids < 1 {
            offenders.push(format!("nProductIds {}", self.n_product_ids));
        }

        if offenders.is_empty() {
            Ok(())
        } else {
            Err(PriceHistoryError::input_validation(format!(
                "invalid filename fields: {}",
                offenders.join(", ")
            )))
        }
    }
}

/// Compares two filenames by their encoded byte order -- used by tests to
/// assert that this matches numeric order on `fileSeq`.
pub fn byte_order(a: &str, b: &str) -> std::cmp::Ordering {
    a.cmp(b)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample(file_seq: i64) -> Filename {
        Filename::new(file_seq, 1, 1, 1, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn round_trips() {
        let f = sample(42);
        let encoded = f.encode().unwrap();
        let decoded = Filename::decode(&encoded).unwrap();
        assert_eq!(f, decoded);
    }

    #[test]
    fn encoded_form_is_hex_plus_json_suffix() {
        let encoded = sample(1).encode().unwrap();
        assert!(encoded.ends_with(".json"));
        let hex_part = encoded.strip_suffix(".json").unwrap();
        assert_eq!(hex_part.len(), FIELD_COUNT * FIELD_BYTES * 2);
        assert!(hex_part.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(encoded.len() <= MAX_FILENAME_BYTES);
    }

    #[test]
    fn lexicographic_order_matches_file_seq_order() {
        let a = sample(1).encode().unwrap();
        let b = sample(2).encode().unwrap();
        let c = sample(1000).encode().unwrap();
        assert_eq!(byte_order(&a, &b), std::cmp::Ordering::Less);
        assert_eq!(byte_order(&b, &c), std::cmp::Ordering::Less);
    }

    #[test]
    fn rejects_invalid_fields_with_all_offenders_named() {
        let bad = Filename::new(0, 0, 1, 1, Utc::now());
        let err = bad.encode().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("fileSeq"));
        assert!(msg.contains("entrySeq"));
    }

    #[test]
    fn decode_rejects_malformed_hex() {
        assert!(Filename::decode("not-hex.json").is_err());
    }

    #[test]
    fn decode_rejects_missing_suffix() {
        let encoded = sample(1).encode().unwrap();
        let without_suffix = encoded.strip_suffix(".json").unwrap();
        assert!(Filename::decode(without_suffix).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;

    fn arb_filename() -> impl Strategy<Value = Filename> {
        (
            1i64..1_000_000_000i64,
            1i64..1_000_000_000i64,
            1i64..10_000i64,
            1i64..10_000i64,
            0i64..4_102_444_800i64, // up to year 2100, keeps from_timestamp in range
            0u32..1_000_000_000u32,
        )
            .prop_map(|(file_seq, entry_seq, n_records, n_product_ids, secs, nanos)| {
                Filename::new(file_seq, entry_seq, n_records, n_product_ids, Utc.timestamp_opt(secs, nanos).unwrap())
            })
    }

    proptest! {
        /// Every valid `Filename` survives an encode/decode round trip unchanged.
        #[test]
        fn round_trip(f in arb_filename()) {
            let encoded = f.encode().unwrap();
            let decoded = Filename::decode(&encoded).unwrap();
            prop_assert_eq!(f, decoded);
        }

        /// Byte-lexicographic order on the encoded filename always agrees
        /// with numeric order on `fileSeq`, for any pair of sequence numbers.
        #[test]
        fn lexicographic_order_matches_file_seq_order(
            a_seq in 1i64..1_000_000_000i64,
            b_seq in 1i64..1_000_000_000i64,
        ) {
            let start = Utc.timestamp_opt(0, 0).unwrap();
            let a = Filename::new(a_seq, 1, 1, 1, start).encode().unwrap();
            let b = Filename::new(b_seq, 1, 1, 1, start).encode().unwrap();
            prop_assert_eq!(byte_order(&a, &b), a_seq.cmp(&b_seq));
        }
    }
}
