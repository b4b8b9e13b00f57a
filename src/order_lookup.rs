//! Concurrent search for an order across a fixed set of record files.
//!
//! Every source is searched on its own scoped worker thread and the caller
//! joins all of them before returning. The first worker to find the order
//! wins an atomic election and publishes the record; any further match is a
//! consistency error reported once every worker has finished.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use parking_lot::Mutex;
use serde::Deserialize;
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::error::LookupError;
use crate::types::{Coordinates2D, OrderId, ProductId};

/// Delivery point and ordered product ids of one order.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderRecord {
    pub delivery_point: Coordinates2D,
    /// Product ids in record order; repeats mean several units.
    pub products: Vec<ProductId>,
}

#[derive(Deserialize)]
struct OrderEntry {
    order: OrderId,
    cx: f64,
    cy: f64,
    #[serde(default)]
    products: Vec<ProductId>,
}

/// Searches a fixed list of order record files.
#[derive(Clone, Debug, Default)]
pub struct OrderLookup {
    sources: Vec<PathBuf>,
}

struct SearchState {
    found: AtomicBool,
    result: Mutex<Option<OrderRecord>>,
    claimants: Mutex<Vec<PathBuf>>,
}

impl OrderLookup {
    pub fn new(sources: Vec<PathBuf>) -> Self {
        Self { sources }
    }

    /// Use every `*.yaml` / `*.yml` file in `dir`, sorted by file name.
    pub fn scan(dir: &Path) -> Result<Self, LookupError> {
        let entries = fs::read_dir(dir).map_err(|source| LookupError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut sources: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        sources.sort();
        debug!(dir = %dir.display(), sources = sources.len(), "order sources scanned");
        Ok(Self { sources })
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Look up `order_id` in all sources in parallel.
    ///
    /// Returns `Ok(None)` when no source holds the order. Sources that cannot
    /// be read or parsed are logged and count as holding no match.
    pub fn find(&self, order_id: OrderId) -> Result<Option<OrderRecord>, LookupError> {
        let state = SearchState {
            found: AtomicBool::new(false),
            result: Mutex::new(None),
            claimants: Mutex::new(Vec::new()),
        };

        thread::scope(|scope| {
            for (index, source) in self.sources.iter().enumerate() {
                let state = &state;
                let spawned = thread::Builder::new()
                    .name(format!("order-search-{index}"))
                    .spawn_scoped(scope, move || search_source(source, order_id, state));
                if let Err(err) = spawned {
                    // Fall back to searching inline so the source is not skipped.
                    warn!(source = %source.display(), error = %err, "failed to spawn order search worker");
                    search_source(source, order_id, state);
                }
            }
        });

        let claimants = state.claimants.into_inner();
        if claimants.len() > 1 {
            return Err(LookupError::DuplicateOrder {
                order_id,
                sources: claimants,
            });
        }
        Ok(state.result.into_inner())
    }
}

fn search_source(source: &Path, order_id: OrderId, state: &SearchState) {
    let entries = match read_entries(source) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(source = %source.display(), error = %err, "skipping unreadable order source");
            return;
        }
    };
    let Some(entry) = find_entry(source, entries, order_id) else {
        return;
    };

    state.claimants.lock().push(source.to_path_buf());
    if state
        .found
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
    {
        debug!(order_id, source = %source.display(), "order found");
        *state.result.lock() = Some(OrderRecord {
            delivery_point: Coordinates2D::new(entry.cx, entry.cy),
            products: entry.products,
        });
    } else {
        warn!(order_id, source = %source.display(), "order already claimed by another source");
    }
}

/// First entry for `order_id` that converts cleanly. Only matching entries
/// are converted, so a malformed neighbour cannot hide a valid order.
fn find_entry(source: &Path, entries: Vec<Value>, order_id: OrderId) -> Option<OrderEntry> {
    entries
        .into_iter()
        .filter(|entry| entry_order_id(entry) == Some(order_id))
        .find_map(|entry| match serde_yaml::from_value::<OrderEntry>(entry) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(order_id, source = %source.display(), error = %err, "skipping malformed order entry");
                None
            }
        })
}

fn entry_order_id(entry: &Value) -> Option<OrderId> {
    match entry.get("order")? {
        Value::Number(number) => number.as_u64().and_then(|id| OrderId::try_from(id).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn read_entries(source: &Path) -> anyhow::Result<Vec<Value>> {
    let content = fs::read_to_string(source)?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let entries: Option<Vec<Value>> = serde_yaml::from_str(&content)?;
    Ok(entries.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("write order file");
        path
    }

    fn fixture() -> TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            &dir,
            "orders_20201201.yaml",
            "- order: 1000001\n  cx: 748.944\n  cy: 474.71707\n  products: [902, 293, 142, 56, 894]\n",
        );
        write(
            &dir,
            "orders_20201202.yaml",
            "- order: 1000002\n  cx: 1.0\n  cy: 2.0\n  products: [1]\n- order: 1000003\n  cx: 3.0\n  cy: 4.0\n  products: [2, 2]\n",
        );
        write(&dir, "orders_20201203.yaml", "");
        write(&dir, "notes.txt", "- order: 1000004\n  cx: 0\n  cy: 0\n");
        dir
    }

    #[test]
    fn scan_picks_yaml_sources_in_name_order() {
        let dir = fixture();
        let lookup = OrderLookup::scan(dir.path()).expect("scan");
        let names: Vec<String> = lookup
            .sources()
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["orders_20201201.yaml", "orders_20201202.yaml", "orders_20201203.yaml"]
        );
    }

    #[test]
    fn missing_order_is_not_found() {
        let dir = fixture();
        let lookup = OrderLookup::scan(dir.path()).expect("scan");
        assert_eq!(lookup.find(66).expect("lookup"), None);
        // Records in non-YAML files are not searched.
        assert_eq!(lookup.find(1000004).expect("lookup"), None);
    }

    #[test]
    fn order_is_returned_exactly() {
        let dir = fixture();
        let lookup = OrderLookup::scan(dir.path()).expect("scan");
        let record = lookup.find(1000001).expect("lookup").expect("order found");
        assert_eq!(record.delivery_point, Coordinates2D::new(748.944, 474.71707));
        assert_eq!(record.products, vec![902, 293, 142, 56, 894]);

        let record = lookup.find(1000003).expect("lookup").expect("order found");
        assert_eq!(record.products, vec![2, 2]);
    }

    #[test]
    fn result_is_stable_across_repeated_searches() {
        let dir = fixture();
        let lookup = OrderLookup::scan(dir.path()).expect("scan");
        let first = lookup.find(1000002).expect("lookup");
        for _ in 0..20 {
            assert_eq!(lookup.find(1000002).expect("lookup"), first);
        }
    }

    #[test]
    fn order_in_two_sources_is_a_consistency_error() {
        let dir = fixture();
        write(
            &dir,
            "orders_20201204.yaml",
            "- order: 1000002\n  cx: 9.0\n  cy: 9.0\n  products: [3]\n",
        );
        let lookup = OrderLookup::scan(dir.path()).expect("scan");
        let err = lookup.find(1000002).expect_err("duplicate order");
        match err {
            LookupError::DuplicateOrder { order_id, mut sources } => {
                assert_eq!(order_id, 1000002);
                sources.sort();
                assert_eq!(sources.len(), 2);
                assert!(sources[0].ends_with("orders_20201202.yaml"));
                assert!(sources[1].ends_with("orders_20201204.yaml"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unreadable_sources_are_skipped() {
        let dir = fixture();
        let broken = write(&dir, "orders_broken.yaml", "- order: [unterminated\n");
        let lookup = OrderLookup::new(vec![
            broken,
            dir.path().join("missing.yaml"),
            dir.path().join("orders_20201201.yaml"),
        ]);
        assert!(lookup.find(1000001).expect("lookup").is_some());
    }

    #[test]
    fn first_matching_entry_in_a_source_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(
            &dir,
            "orders.yaml",
            "- order: 5\n  cx: 1.0\n  cy: 1.0\n  products: [1]\n- order: 5\n  cx: 2.0\n  cy: 2.0\n  products: [2]\n",
        );
        let record = OrderLookup::new(vec![path])
            .find(5)
            .expect("lookup")
            .expect("order found");
        assert_eq!(record.products, vec![1]);
    }

    #[test]
    fn malformed_neighbour_does_not_hide_an_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(
            &dir,
            "orders.yaml",
            "- order: 1\n  cx: bad\n  cy: 0.0\n  products: [1]\n\
             - order: 2\n  cx: 1.0\n  cy: 1.0\n  products: [1]\n\
             - order: 3\n  cx: 4.0\n  products: [1]\n",
        );
        let lookup = OrderLookup::new(vec![path]);
        let record = lookup.find(2).expect("lookup").expect("order 2 found");
        assert_eq!(record.delivery_point, Coordinates2D::new(1.0, 1.0));
        assert_eq!(record.products, vec![1]);
        // The malformed entries themselves are not found.
        assert_eq!(lookup.find(1).expect("lookup"), None);
        assert_eq!(lookup.find(3).expect("lookup"), None);
    }

    #[test]
    fn scanning_a_missing_directory_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = OrderLookup::scan(&dir.path().join("orders")).expect_err("missing dir");
        assert!(matches!(err, LookupError::Scan { .. }));
    }
}
