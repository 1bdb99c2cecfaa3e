//! Opt-in shipping of client log events to a remote collector.
//!
//! Each forwarded event becomes one `GET {url}?m=<line>&c=<context>` request,
//! where both values are base64 encoded and the context is the JSON form of
//! [`LogContext`].

use std::{
    collections::BTreeMap,
    fmt::{self, Write as _},
    sync::{Arc, RwLock},
};

use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::{
    Event, Subscriber, debug,
    field::{Field, Visit},
};
use tracing_subscriber::{Layer, layer::Context};

use crate::error::ApiError;

const CRATE_TARGET: &str = "krumi";

/// Key/value pairs attached to every shipped line, such as the signed-in user.
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    values: Arc<RwLock<BTreeMap<String, String>>>,
}

impl LogContext {
    /// Empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any earlier value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.into(), value.into());
    }

    /// Copy of the current pairs.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.values
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

struct Shipment {
    line: String,
    context: BTreeMap<String, String>,
}

/// `tracing` layer forwarding this crate's events to a remote collector.
pub struct RemoteLog {
    sender: mpsc::UnboundedSender<Shipment>,
    context: LogContext,
}

impl RemoteLog {
    /// Spawn the shipping task on the current tokio runtime.
    pub fn start(url: &str, context: LogContext) -> Result<Self, ApiError> {
        let client = Client::builder()
            .build()
            .map_err(|source| ApiError::ClientBuilder { source })?;
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(ship(client, url.to_string(), receiver));

        Ok(Self { sender, context })
    }
}

impl<S: Subscriber> Layer<S> for RemoteLog {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !forwards(metadata.target()) {
            return;
        }

        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        let line = format!(
            "{} {}: {}{}",
            metadata.level(),
            metadata.target(),
            visitor.message,
            visitor.fields
        );

        // Fails only once the runtime is gone and the shipper with it.
        let _ = self.sender.send(Shipment {
            line,
            context: self.context.snapshot(),
        });
    }
}

/// Only this crate's own events travel, never the shipper's or its dependencies'.
fn forwards(target: &str) -> bool {
    let ours = target == CRATE_TARGET || target.starts_with("krumi::");
    ours && !target.starts_with(module_path!())
}

async fn ship(client: Client, url: String, mut receiver: mpsc::UnboundedReceiver<Shipment>) {
    while let Some(shipment) = receiver.recv().await {
        let context = serde_json::to_string(&shipment.context)
            .map(|json| STANDARD.encode(json))
            .unwrap_or_default();
        let query = [("m", STANDARD.encode(&shipment.line)), ("c", context)];

        match client.get(&url).query(&query).send().await {
            Ok(response) if !response.status().is_success() => {
                debug!(status = %response.status(), "log collector refused line");
            }
            Ok(_) => {}
            Err(err) => debug!(error = %err, "unable to ship log line"),
        }
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}
