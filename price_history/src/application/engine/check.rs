// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Store Integrity Check
//!
//! Backs the `check` CLI subcommand: walks the on-disk store without
//! starting a server, decoding every filename it finds (catching corruption
//! or a hand-edited store) and, on Unix, verifying that each finalized
//! batch's hard-link count matches its encoded `nProductIds` -- one link for
//! the global copy under `results/` plus one per product it touched under
//! `results_by_product/`.
//!
//! This walks `std::fs`/`tokio::fs` directly rather than going through
//! [`price_history_domain::repositories::filesystem::ReadFs`]: that trait
//! deliberately only lists files within a directory (batch writer and price
//! loader never need subdirectory names), whereas this needs to enumerate
//! the per-product hash subdirectories themselves and read `nlink` from
//! `std::os::unix::fs::MetadataExt`, neither of which belongs on the
//! production read/write path.

use std::path::Path;

use price_history_domain::error::PriceHistoryError;
use price_history_domain::value_objects::filename::Filename;
use tokio::fs;

use super::layout::{PRODUCT_DIR, RESULTS_DIR};

/// The outcome of a single `check` run.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub files_checked: usize,
    pub product_links_checked: usize,
    /// A filename that failed to decode, or an entry whose metadata could
    /// not be read, one message per offender.
    pub filename_errors: Vec<String>,
    /// A finalized batch file whose on-disk hard-link count doesn't match
    /// its encoded `nProductIds`. Unix-only -- empty on other platforms.
    pub link_parity_errors: Vec<String>,
}

impl CheckReport {
    pub fn is_healthy(&self) -> bool {
        self.filename_errors.is_empty() && self.link_parity_errors.is_empty()
    }
}

async fn list_entries(dir: &Path, want_dirs: bool) -> std::io::Result<Vec<String>> {
    let mut read_dir = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut names = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        let file_type = entry.file_type().await?;
        if file_type.is_dir() == want_dirs {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Walks `data_root`'s `results/` and `results_by_product/` trees, reporting
/// every filename-decoding failure and (on Unix) every hard-link-count
/// mismatch it finds. Never returns an error for an empty or partially
/// missing store -- a store with nothing written yet is healthy, not
/// corrupt.
pub async fn run(data_root: &Path) -> Result<CheckReport, PriceHistoryError> {
    let mut report = CheckReport::default();
    let results_dir = data_root.join(RESULTS_DIR);

    let mut batch_names = Vec::new();
    match list_entries(&results_dir, false).await {
        Ok(names) => {
            for name in names {
                report.files_checked += 1;
                match Filename::decode(&name) {
                    Ok(f) => batch_names.push((name, f.n_product_ids)),
                    Err(e) => report.filename_errors.push(format!("{RESULTS_DIR}/{name}: {e}")),
                }
            }
        }
        Err(e) => return Err(PriceHistoryError::from(e)),
    }

    #[cfg(unix)]
    check_link_parity(&results_dir, &batch_names, &mut report).await?;
    #[cfg(not(unix))]
    let _ = &batch_names;

    let product_root = data_root.join(PRODUCT_DIR);
    match list_entries(&product_root, true).await {
        Ok(hashes) => {
            for hash in hashes {
                let product_dir = product_root.join(&hash);
                match list_entries(&product_dir, false).await {
                    Ok(names) => {
                        for name in names {
                            report.product_links_checked += 1;
                            if let Err(e) = Filename::decode(&name) {
                                report
                                    .filename_errors
                                    .push(format!("{PRODUCT_DIR}/{hash}/{name}: {e}"));
                            }
                        }
                    }
                    Err(e) => return Err(PriceHistoryError::from(e)),
                }
            }
        }
        Err(e) => return Err(PriceHistoryError::from(e)),
    }

    Ok(report)
}

#[cfg(unix)]
async fn check_link_parity(
    results_dir: &Path,
    batch_names: &[(String, i64)],
    report: &mut CheckReport,
) -> Result<(), PriceHistoryError> {
    use std::os::unix::fs::MetadataExt;

    for (name, n_product_ids) in batch_names {
        let path = results_dir.join(name);
        match fs::metadata(&path).await {
            Ok(meta) => {
                let expected = *n_product_ids as u64 + 1;
                if meta.nlink() != expected {
                    report.link_parity_errors.push(format!(
                        "{RESULTS_DIR}/{name}: expected {expected} hard links (nProductIds {n_product_ids} + 1 \
                         for the global file), found {}",
                        meta.nlink()
                    ));
                }
            }
            Err(e) => report.filename_errors.push(format!("{RESULTS_DIR}/{name}: {e}")),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use price_history_domain::entities::entry::Entry;
    use price_history_domain::entities::record::Record;
    use price_history_domain::repositories::price::RecordWriter;
    use price_history_domain::value_objects::decimal::Decimal;
    use price_history_domain::value_objects::product_id::ProductId;

    use super::*;
    use crate::application::engine::batch_writer::BatchWriter;
    use crate::infrastructure::filesystem::OsFilesystem;

    fn temp_root(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("price-history-check-test-{name}-{}", std::process::id()))
    }

    fn ts(secs: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn empty_store_is_healthy() {
        let root = temp_root("empty");
        let report = run(&root).await.unwrap();
        assert!(report.is_healthy());
        assert_eq!(report.files_checked, 0);
    }

    #[tokio::test]
    async fn well_formed_store_reports_healthy() {
        let root = temp_root("well-formed");
        let fs = Arc::new(OsFilesystem::new(&root));
        let mut writer = BatchWriter::new(fs, 10, std::time::Duration::from_secs(60), 1, 1);

        writer
            .write_record(Record::new(ProductId::new("a"), None, Entry::new(Decimal::parse("1").unwrap(), ts(0))))
            .await
            .unwrap();
        writer
            .write_record(Record::new(ProductId::new("b"), None, Entry::new(Decimal::parse("2").unwrap(), ts(1))))
            .await
            .unwrap();
        writer.finalize().await.unwrap();

        let report = run(&root).await.unwrap();
        assert!(report.is_healthy(), "{:?}", report);
        assert_eq!(report.files_checked, 1);
        assert_eq!(report.product_links_checked, 2);

        tokio::fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn malformed_filename_is_reported() {
        let root = temp_root("malformed");
        tokio::fs::create_dir_all(root.join(RESULTS_DIR)).await.unwrap();
        tokio::fs::write(root.join(RESULTS_DIR).join("not-a-real-name.json"), b"[]").await.unwrap();

        let report = run(&root).await.unwrap();
        assert!(!report.is_healthy());
        assert_eq!(report.filename_errors.len(), 1);

        tokio::fs::remove_dir_all(&root).await.ok();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_hard_link_is_reported() {
        let root = temp_root("missing-link");
        let fs = Arc::new(OsFilesystem::new(&root));
        let mut writer = BatchWriter::new(fs, 10, std::time::Duration::from_secs(60), 1, 1);

        writer
            .write_record(Record::new(ProductId::new("a"), None, Entry::new(Decimal::parse("1").unwrap(), ts(0))))
            .await
            .unwrap();
        writer.finalize().await.unwrap();

        // Sever one of the two links a healthy single-product batch should have.
        let names = {
            let mut names = Vec::new();
            let mut rd = tokio::fs::read_dir(root.join(RESULTS_DIR)).await.unwrap();
            while let Some(e) = rd.next_entry().await.unwrap() {
                names.push(e.file_name().to_string_lossy().into_owned());
            }
            names
        };
        let hash = price_history_domain::value_objects::product_id::hash_product_id("a");
        tokio::fs::remove_file(root.join(PRODUCT_DIR).join(&hash).join(&names[0])).await.unwrap();

        let report = run(&root).await.unwrap();
        assert!(!report.link_parity_errors.is_empty());

        tokio::fs::remove_dir_all(&root).await.ok();
    }
}
