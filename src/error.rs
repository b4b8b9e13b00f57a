//! Error types for catalog loading, order lookup, task execution and inbound messages.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{OrderId, ProductId};

/// Failure to build the catalog from its source file.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Failure of a concurrent order search.
#[derive(Error, Debug)]
pub enum LookupError {
    /// More than one record source claimed the same order.
    #[error("order {order_id} found in more than one record: {sources:?}")]
    DuplicateOrder {
        order_id: OrderId,
        sources: Vec<PathBuf>,
    },

    #[error("failed to list order directory {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while executing a task against the unit.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("order {order_id} references unknown product {product_id}")]
    UnknownProduct {
        order_id: OrderId,
        product_id: ProductId,
    },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("failed to write task report: {0}")]
    Report(#[from] std::io::Error),
}

/// An inbound message that could not be turned into a task.
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("message on {0} has an empty payload")]
    EmptyPayload(String),

    #[error("message on {topic} is not valid YAML: {source}")]
    Unparsable {
        topic: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("message on {0} is not a mapping")]
    NotAMapping(String),

    #[error("key '{key}' in message on {topic} is missing")]
    MissingField { topic: String, key: &'static str },

    #[error("key '{key}' in message on {topic} has an invalid value")]
    InvalidField { topic: String, key: &'static str },

    #[error("no handler for topic {0}")]
    UnknownTopic(String),
}

/// Failure to load the unit configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
