//! Task dispatch for a single autonomous mobile robot unit.
//!
//! Inbound messages become [`Task`]s in a shared [`TaskQueue`]; the [`Unit`]
//! drains the queue on one thread, moving on position updates and turning
//! order ids into shortest pickup-and-delivery routes.

pub mod catalog;
pub mod config;
pub mod error;
pub mod fulfillment;
pub mod logging;
pub mod message;
pub mod order_lookup;
pub mod planner;
pub mod task;
pub mod task_queue;
pub mod types;
pub mod unit;

pub use catalog::{Catalog, Part, Product};
pub use config::{Topics, UnitConfig};
pub use error::{CatalogError, ConfigError, LookupError, MessageError, TaskError};
pub use message::{Inbound, MessageAdapter};
pub use order_lookup::{OrderLookup, OrderRecord};
pub use task::{Task, TaskContext};
pub use task_queue::TaskQueue;
pub use types::{Coordinates2D, OrderId, PartId, Position, ProductId};
pub use unit::{DrainState, DrainSummary, Unit};
