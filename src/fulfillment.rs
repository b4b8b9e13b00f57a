//! Order fulfillment: resolve an order, aggregate its parts, plan the pickup
//! route, relocate the unit and write the delivery report.

use std::collections::BTreeMap;
use std::io::Write;

use tracing::{debug, info};

use crate::catalog::{Catalog, Part};
use crate::error::TaskError;
use crate::order_lookup::OrderRecord;
use crate::planner;
use crate::task::TaskContext;
use crate::types::{Coordinates2D, OrderId, PartId, Position, ProductId};

/// For each required part, the products that need it and how many units each.
///
/// Entries per part keep the order in which products were scanned; quantities
/// are never summed across products.
pub type PickList = BTreeMap<PartId, Vec<(ProductId, u32)>>;

/// Merge the part requirements of every ordered product.
pub fn aggregate(
    order_id: OrderId,
    products: &[ProductId],
    catalog: &Catalog,
) -> Result<PickList, TaskError> {
    let mut pick_list = PickList::new();
    for &product_id in products {
        let product = catalog.product(product_id).ok_or(TaskError::UnknownProduct {
            order_id,
            product_id,
        })?;
        for (&part_id, &quantity) in &product.parts {
            pick_list
                .entry(part_id)
                .or_default()
                .push((product_id, quantity));
        }
    }
    Ok(pick_list)
}

/// Waypoints of a pick list in ascending part-id order.
#[derive(Debug)]
pub struct WaypointIndex<'a> {
    parts: Vec<&'a Part>,
    coordinates: Vec<Coordinates2D>,
}

impl<'a> WaypointIndex<'a> {
    pub fn new(pick_list: &PickList, catalog: &'a Catalog) -> Self {
        let parts: Vec<&Part> = pick_list
            .keys()
            .filter_map(|&part_id| catalog.part(part_id))
            .collect();
        let coordinates = parts.iter().map(|part| part.coords).collect();
        Self { parts, coordinates }
    }

    /// Part id at waypoint position `index`.
    pub fn part_id(&self, index: usize) -> PartId {
        self.parts[index].id
    }

    pub fn part(&self, index: usize) -> &'a Part {
        self.parts[index]
    }

    pub fn coordinates(&self) -> &[Coordinates2D] {
        &self.coordinates
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Run the full pipeline for one order.
///
/// On any failure a visible `Error:` line is written and the unit position is
/// left untouched.
pub fn fulfill(
    order_id: OrderId,
    description: &str,
    ctx: &TaskContext<'_>,
    position: &mut Position,
    out: &mut dyn Write,
) -> Result<(), TaskError> {
    writeln!(out, "Working on order {order_id} ({description})")?;

    let record = match ctx.orders.find(order_id) {
        Ok(Some(record)) => record,
        Ok(None) => {
            writeln!(out, "Error: Order {order_id} not found")?;
            return Err(TaskError::OrderNotFound(order_id));
        }
        Err(err) => {
            writeln!(out, "Error: Order {order_id} could not be resolved: {err}")?;
            return Err(err.into());
        }
    };

    let pick_list = match aggregate(order_id, &record.products, ctx.catalog) {
        Ok(pick_list) => pick_list,
        Err(err) => {
            writeln!(out, "Error: {err}")?;
            return Err(err);
        }
    };
    let waypoints = WaypointIndex::new(&pick_list, ctx.catalog);
    let start = position.coords;
    let route = planner::plan(&start, waypoints.coordinates(), &record.delivery_point);
    debug!(order_id, waypoints = waypoints.len(), ?route, "pickup route planned");

    *position = Position::at(record.delivery_point);
    write_route(out, &start, &record, &route, &waypoints, &pick_list, ctx.catalog)?;
    info!(order_id, "order delivered");
    Ok(())
}

fn write_route(
    out: &mut dyn Write,
    start: &Coordinates2D,
    record: &OrderRecord,
    route: &[usize],
    waypoints: &WaypointIndex<'_>,
    pick_list: &PickList,
    catalog: &Catalog,
) -> std::io::Result<()> {
    writeln!(out, "Starting from position x: {}, y: {}", start.x, start.y)?;
    for &index in route {
        let part = waypoints.part(index);
        let Some(contributions) = pick_list.get(&waypoints.part_id(index)) else {
            continue;
        };
        for &(product_id, quantity) in contributions {
            let product_name = catalog
                .product(product_id)
                .map(|product| product.name.as_str())
                .unwrap_or_default();
            for _ in 0..quantity {
                writeln!(
                    out,
                    "Fetching '{}' for product '{}' (id {}) at x: {}, y: {}",
                    part.name, product_name, product_id, part.coords.x, part.coords.y
                )?;
            }
        }
    }
    writeln!(
        out,
        "Delivering to destination x: {}, y: {}",
        record.delivery_point.x, record.delivery_point.y
    )
}
