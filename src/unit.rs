//! The AMR unit: owns its position, the catalog and the task queue, and
//! drains the queue on a single consumer thread.

use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::catalog::Catalog;
use crate::config::UnitConfig;
use crate::order_lookup::OrderLookup;
use crate::task::TaskContext;
use crate::task_queue::TaskQueue;
use crate::types::Position;

/// Drain-loop state derived from a (shutdown, pending) snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainState {
    Running,
    /// Shutdown requested, tasks still pending.
    Draining,
    Stopped,
}

impl DrainState {
    pub fn from_snapshot(shutdown_requested: bool, pending: usize) -> Self {
        match (shutdown_requested, pending) {
            (false, _) => DrainState::Running,
            (true, 0) => DrainState::Stopped,
            (true, _) => DrainState::Draining,
        }
    }
}

/// Counters reported when the drain loop stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub executed: usize,
    pub failed: usize,
}

pub struct Unit {
    position: Position,
    catalog: Arc<Catalog>,
    orders: OrderLookup,
    queue: Arc<TaskQueue>,
    poll_interval: Duration,
    output: Box<dyn Write + Send>,
}

impl Unit {
    pub fn new(
        catalog: Arc<Catalog>,
        orders: OrderLookup,
        starting_position: Position,
        poll_interval: Duration,
    ) -> Self {
        Self {
            position: starting_position,
            catalog,
            orders,
            queue: Arc::new(TaskQueue::new()),
            poll_interval,
            output: Box::new(io::stdout()),
        }
    }

    /// Build a unit from its configuration: load the catalog and resolve the
    /// order record sources. Load failures are logged; the unit still starts.
    pub fn start(config: &UnitConfig) -> Self {
        let catalog = Catalog::load(&config.catalog_path()).unwrap_or_else(|err| {
            error!(error = %err, "catalog could not be loaded; starting with an empty catalog");
            Catalog::default()
        });
        let orders = match config.order_paths() {
            Some(paths) => OrderLookup::new(paths),
            None => OrderLookup::scan(&config.orders_dir()).unwrap_or_else(|err| {
                warn!(error = %err, "no order sources available");
                OrderLookup::default()
            }),
        };
        info!(
            working_directory = %config.working_directory.display(),
            order_sources = orders.sources().len(),
            "unit started"
        );
        Self::new(
            Arc::new(catalog),
            orders,
            config.starting_position,
            config.poll_interval(),
        )
    }

    /// Redirect task reports to `output`.
    pub fn with_output(mut self, output: Box<dyn Write + Send>) -> Self {
        self.output = output;
        self
    }

    /// Handle for producers and for requesting shutdown.
    pub fn queue(&self) -> Arc<TaskQueue> {
        Arc::clone(&self.queue)
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Execute queued tasks one at a time until shutdown is requested and the
    /// queue is empty.
    ///
    /// The stop decision is taken on the snapshot read before each pop, so
    /// every task queued before the shutdown request is observed still runs.
    pub fn run(&mut self) -> DrainSummary {
        let mut summary = DrainSummary::default();
        let mut state = DrainState::Running;
        loop {
            let (shutdown_requested, pending) = self.queue.snapshot();
            let next = DrainState::from_snapshot(shutdown_requested, pending);
            if next != state {
                debug!(from = ?state, to = ?next, pending, "drain state changed");
                state = next;
            }
            if state == DrainState::Stopped {
                break;
            }

            match self.queue.pop_if_available() {
                Some(task) => {
                    let ctx = TaskContext {
                        catalog: self.catalog.as_ref(),
                        orders: &self.orders,
                    };
                    summary.executed += 1;
                    if let Err(err) = task.execute(&ctx, &mut self.position, self.output.as_mut()) {
                        summary.failed += 1;
                        warn!(task = %task.label(), error = %err, "task failed");
                    }
                    if let Err(err) = self.output.flush() {
                        warn!(error = %err, "failed to flush task report");
                    }
                }
                None => {
                    self.queue.wait_for_work(self.poll_interval);
                }
            }
        }

        if let Err(err) = writeln!(self.output, "Received signal to shut down. Terminating.")
            .and_then(|()| self.output.flush())
        {
            warn!(error = %err, "failed to write shutdown report");
        }
        info!(executed = summary.executed, failed = summary.failed, "unit stopped");
        summary
    }

    /// Run the drain loop on a dedicated thread; the unit is handed back with
    /// the summary when it stops.
    pub fn spawn(mut self) -> io::Result<thread::JoinHandle<(Unit, DrainSummary)>> {
        thread::Builder::new()
            .name("amr-unit".to_string())
            .spawn(move || {
                let summary = self.run();
                (self, summary)
            })
    }
}
