// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! On-disk layout constants: the global `results/` directory and the
//! per-product `results_by_product/<hash>/` directory naming.

use price_history_domain::value_objects::product_id::hash_product_id;

/// Directory holding the global, chronologically-ordered batch files.
pub const RESULTS_DIR: &str = "results";

/// Directory under which each product gets its own subdirectory of
/// hard-linked batch files.
pub const PRODUCT_DIR: &str = "results_by_product";

/// Relative path of a batch file under [`RESULTS_DIR`].
pub fn result_file_path(filename: &str) -> String {
    format!("{RESULTS_DIR}/{filename}")
}

/// Relative directory for a given product's hard links.
pub fn product_dir(product_hash: &str) -> String {
    format!("{PRODUCT_DIR}/{product_hash}")
}

/// Relative path of a product's hard-linked batch file.
pub fn product_file_path(product_id: &price_history_domain::value_objects::product_id::ProductId, filename: &str) -> String {
    format!("{}/{}", product_dir(&hash_product_id(product_id.as_str())), filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use price_history_domain::value_objects::product_id::ProductId;

    #[test]
    fn result_file_path_is_namespaced_under_results() {
        assert_eq!(result_file_path("abc.json"), "results/abc.json");
    }

    #[test]
    fn product_file_path_uses_the_hash_of_the_product_id() {
        let pid = ProductId::from("widget".to_string());
        let hash = hash_product_id(pid.as_str());
        assert_eq!(product_file_path(&pid, "abc.json"), format!("results_by_product/{hash}/abc.json"));
    }
}
