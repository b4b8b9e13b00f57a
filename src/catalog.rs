//! Products and parts known to the unit, loaded once from the configuration directory.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::CatalogError;
use crate::types::{Coordinates2D, PartId, ProductId};

/// A physical component with a pickup location.
#[derive(Clone, Debug, PartialEq)]
pub struct Part {
    pub id: PartId,
    pub name: String,
    pub coords: Coordinates2D,
}

/// A named item and the parts it requires, keyed by part id.
#[derive(Clone, Debug, PartialEq)]
pub struct Product {
    pub name: String,
    pub parts: BTreeMap<PartId, u32>,
}

#[derive(Deserialize)]
struct ProductRecord {
    id: ProductId,
    product: String,
    #[serde(default)]
    parts: Vec<PartRecord>,
}

#[derive(Deserialize)]
struct PartRecord {
    part: String,
    cx: f64,
    cy: f64,
}

/// Immutable collection of all products and parts.
///
/// Part ids are dense and follow the order in which parts are first seen in
/// the source. Product id 0 is reserved and never present.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    products: BTreeMap<ProductId, Product>,
    parts: Vec<Part>,
}

impl Catalog {
    /// Load the catalog from `path`.
    ///
    /// A missing file is not an error: it is logged and yields an empty
    /// catalog, so later orders fail their product lookups instead.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "catalog file not found; starting with an empty catalog");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(CatalogError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let catalog = Self::parse(&content).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            path = %path.display(),
            products = catalog.products.len(),
            parts = catalog.parts.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Parse catalog records from YAML text.
    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let records: Option<Vec<ProductRecord>> = serde_yaml::from_str(content)?;
        Ok(Self::from_records(records.unwrap_or_default()))
    }

    fn from_records(records: Vec<ProductRecord>) -> Self {
        let mut catalog = Self::default();
        let mut part_ids: HashMap<String, PartId> = HashMap::new();

        for record in records {
            if record.id == 0 {
                warn!(product = %record.product, "product id 0 is reserved; skipping record");
                continue;
            }
            let mut required = BTreeMap::new();
            for part in record.parts {
                let id = match part_ids.get(&part.part) {
                    Some(&id) => id,
                    None => {
                        let id = catalog.parts.len();
                        part_ids.insert(part.part.clone(), id);
                        catalog.parts.push(Part {
                            id,
                            name: part.part,
                            coords: Coordinates2D::new(part.cx, part.cy),
                        });
                        id
                    }
                };
                // Each listed occurrence of a part is one required unit.
                *required.entry(id).or_insert(0) += 1;
            }

            match catalog.products.entry(record.id) {
                Entry::Occupied(_) => {
                    warn!(id = record.id, product = %record.product, "duplicate product id; keeping the first record");
                }
                Entry::Vacant(slot) => {
                    debug!(id = record.id, product = %record.product, parts = required.len(), "product registered");
                    slot.insert(Product {
                        name: record.product,
                        parts: required,
                    });
                }
            }
        }
        catalog
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id)
    }

    /// Products in ascending id order.
    pub fn products(&self) -> impl Iterator<Item = (ProductId, &Product)> {
        self.products.iter().map(|(&id, product)| (id, product))
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
