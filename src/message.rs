//! Inbound message handling: decode topic + payload pairs into tasks and feed
//! them to the task queue.
//!
//! Payloads are YAML mappings, e.g. `{x: 1.0, y: 2.0, yaw: 0.5}` on the
//! position topic or `{order_id: 7, description: "..."}` on the order topic.
//! The transport delivering them is pluggable; [`MessageAdapter::run_lines`]
//! reads one `<topic> <payload>` message per line.

use std::io::BufRead;
use std::sync::Arc;

use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

use crate::config::Topics;
use crate::error::MessageError;
use crate::task::Task;
use crate::task_queue::TaskQueue;
use crate::types::{OrderId, Position};

/// What an inbound message asks the unit to do.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    Task(Task),
    Shutdown,
}

const POSITION_KEYS: [&str; 3] = ["x", "y", "yaw"];
const ORDER_KEYS: [&str; 2] = ["order_id", "description"];

/// Decode one message. Warnings (missing yaw, unknown keys) are logged; hard
/// errors drop the message.
pub fn decode(topics: &Topics, topic: &str, payload: &str) -> Result<Inbound, MessageError> {
    if topic == topics.shutdown {
        return Ok(Inbound::Shutdown);
    }
    if topic != topics.current_position && topic != topics.next_order {
        return Err(MessageError::UnknownTopic(topic.to_string()));
    }
    if payload.trim().is_empty() {
        return Err(MessageError::EmptyPayload(topic.to_string()));
    }

    let value: Value = serde_yaml::from_str(payload).map_err(|source| MessageError::Unparsable {
        topic: topic.to_string(),
        source,
    })?;
    let Value::Mapping(map) = value else {
        return Err(MessageError::NotAMapping(topic.to_string()));
    };

    if topic == topics.current_position {
        warn_unknown_keys(topic, &map, &POSITION_KEYS);
        let x = required_f64(topic, &map, "x")?;
        let y = required_f64(topic, &map, "y")?;
        let yaw = match map.get("yaw") {
            Some(value) => as_f64(value).ok_or_else(|| invalid(topic, "yaw"))?,
            None => {
                warn!(topic, "key 'yaw' is missing; defaulting to 0");
                0.0
            }
        };
        Ok(Inbound::Task(Task::move_to(Position::new(x, y, yaw))))
    } else {
        warn_unknown_keys(topic, &map, &ORDER_KEYS);
        let order_id = map
            .get("order_id")
            .ok_or_else(|| missing(topic, "order_id"))
            .map(as_order_id)?
            .ok_or_else(|| invalid(topic, "order_id"))?;
        let description = match map.get("description").ok_or_else(|| missing(topic, "description"))? {
            Value::String(text) => text.clone(),
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            _ => return Err(invalid(topic, "description")),
        };
        Ok(Inbound::Task(Task::order(order_id, description)))
    }
}

fn required_f64(topic: &str, map: &Mapping, key: &'static str) -> Result<f64, MessageError> {
    let value = map.get(key).ok_or_else(|| missing(topic, key))?;
    as_f64(value).ok_or_else(|| invalid(topic, key))
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        _ => None,
    }
}

fn warn_unknown_keys(topic: &str, map: &Mapping, known: &[&str]) {
    for key in map.keys() {
        let name = match key {
            Value::String(name) => name.clone(),
            other => format!("{other:?}"),
        };
        if !known.contains(&name.as_str()) {
            warn!(topic, key = %name, "message has unexpected key");
        }
    }
}

/// Order ids arrive as integers or, from some publishers, as quoted strings.
fn as_order_id(value: &Value) -> Option<OrderId> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|id| OrderId::try_from(id).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn missing(topic: &str, key: &'static str) -> MessageError {
    MessageError::MissingField {
        topic: topic.to_string(),
        key,
    }
}

fn invalid(topic: &str, key: &'static str) -> MessageError {
    MessageError::InvalidField {
        topic: topic.to_string(),
        key,
    }
}

/// Feeds decoded messages into a unit's task queue.
pub struct MessageAdapter {
    queue: Arc<TaskQueue>,
    topics: Topics,
}

impl MessageAdapter {
    pub fn new(queue: Arc<TaskQueue>, topics: Topics) -> Self {
        Self { queue, topics }
    }

    /// Handle one message. Returns `false` once the message was a shutdown
    /// request; malformed messages are logged and dropped.
    pub fn handle(&self, topic: &str, payload: &str) -> bool {
        match decode(&self.topics, topic, payload) {
            Ok(Inbound::Task(task)) => {
                debug!(topic, task = %task.label(), "task queued");
                self.queue.push(task);
                true
            }
            Ok(Inbound::Shutdown) => {
                info!(topic, "shutdown requested");
                self.queue.request_shutdown();
                false
            }
            Err(err) => {
                warn!(error = %err, "dropping message");
                true
            }
        }
    }

    /// Read `<topic> <payload>` lines until a shutdown message or end of
    /// input; end of input also requests shutdown. Blank lines and lines
    /// starting with `#` are ignored.
    pub fn run_lines<R: BufRead>(&self, reader: R) {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!(error = %err, "inbound channel read failed");
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (topic, payload) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            if !self.handle(topic, payload.trim()) {
                return;
            }
        }
        info!("inbound channel closed");
        self.queue.request_shutdown();
    }
}
