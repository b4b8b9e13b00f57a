//! Units of work executed against the unit's state.

use std::io::Write;

use tracing::debug;

use crate::catalog::Catalog;
use crate::error::TaskError;
use crate::fulfillment;
use crate::order_lookup::OrderLookup;
use crate::types::{OrderId, Position};

/// Read-only collaborators a task may consult while executing.
#[derive(Clone, Copy)]
pub struct TaskContext<'a> {
    pub catalog: &'a Catalog,
    pub orders: &'a OrderLookup,
}

/// Work dispatched to the unit.
#[derive(Clone, Debug, PartialEq)]
pub enum Task {
    /// Relocate the unit.
    Move { target: Position },
    /// Pick up the parts of an order and deliver them.
    Order { order_id: OrderId, description: String },
}

impl Task {
    pub fn move_to(target: Position) -> Self {
        Task::Move { target }
    }

    pub fn order(order_id: OrderId, description: impl Into<String>) -> Self {
        Task::Order {
            order_id,
            description: description.into(),
        }
    }

    /// Execute the task, writing its report to `out`.
    pub fn execute(
        &self,
        ctx: &TaskContext<'_>,
        position: &mut Position,
        out: &mut dyn Write,
    ) -> Result<(), TaskError> {
        match self {
            Task::Move { target } => {
                *position = *target;
                debug!(x = target.coords.x, y = target.coords.y, yaw = target.yaw, "position updated");
                writeln!(
                    out,
                    "Moved to position x: {}, y: {}",
                    target.coords.x, target.coords.y
                )?;
                Ok(())
            }
            Task::Order {
                order_id,
                description,
            } => fulfillment::fulfill(*order_id, description, ctx, position, out),
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> String {
        match self {
            Task::Move { target } => format!("move({}, {})", target.coords.x, target.coords.y),
            Task::Order { order_id, .. } => format!("order({order_id})"),
        }
    }
}
