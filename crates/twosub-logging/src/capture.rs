//! In-memory capture of tracing events for assertions.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// A captured tracing event.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    /// Event level.
    pub level: Level,
    /// Target module path.
    pub target: String,
    /// Formatted message.
    pub message: String,
    /// Remaining fields as `(name, value)` pairs.
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    /// Value of the named field, if recorded.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Shared handle to captured events and span names.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
    spans: Arc<Mutex<Vec<String>>>,
}

impl CapturedLogs {
    /// Snapshot of all captured events.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    /// Whether any event at `level` contains `message_contains`.
    pub fn has_event(&self, level: Level, message_contains: &str) -> bool {
        self.events
            .lock()
            .iter()
            .any(|e| e.level == level && e.message.contains(message_contains))
    }

    /// Whether a span called `name` was created.
    pub fn has_span(&self, name: &str) -> bool {
        self.spans.lock().iter().any(|s| s == name)
    }

    /// Values of `field` across events whose message contains `message_contains`,
    /// in emission order.
    pub fn field_values(&self, message_contains: &str, field: &str) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.message.contains(message_contains))
            .filter_map(|e| e.field(field).map(str::to_owned))
            .collect()
    }

    /// Whether any event message or field value contains `needle`.
    pub fn contains_text(&self, needle: &str) -> bool {
        self.events.lock().iter().any(|e| {
            e.message.contains(needle) || e.fields.iter().any(|(_, v)| v.contains(needle))
        })
    }
}

struct CaptureLayer {
    logs: CapturedLogs,
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let val = format!("{value:?}");
        if field.name() == "message" {
            self.message = val;
        } else {
            self.fields.push((field.name().to_owned(), val));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            value.clone_into(&mut self.message);
        } else {
            self.fields.push((field.name().to_owned(), value.to_owned()));
        }
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        self.logs.events.lock().push(CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_owned(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }

    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: Context<'_, S>,
    ) {
        self.logs.spans.lock().push(attrs.metadata().name().to_owned());
    }
}

/// Install a thread-local subscriber that records every event.
///
/// Keep the returned guard alive for the duration of the test. Works with
/// `#[tokio::test]` on the default current-thread runtime.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let layer = CaptureLayer { logs: logs.clone() };

    let subscriber = tracing_subscriber::registry()
        .with(layer)
        .with(LevelFilter::TRACE);

    let guard = subscriber.set_default();
    (logs, guard)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_level_and_fields() {
        let (logs, _guard) = capture_logs();
        tracing::info!(step = "upload_parts", attempt = 3, "step started");
        tracing::warn!("retrying");

        assert!(logs.has_event(Level::INFO, "step started"));
        assert!(logs.has_event(Level::WARN, "retrying"));
        assert_eq!(logs.field_values("step started", "step"), vec!["upload_parts"]);
        assert_eq!(logs.field_values("step started", "attempt"), vec!["3"]);
    }

    #[test]
    fn captures_span_names() {
        let (logs, _guard) = capture_logs();
        let span = tracing::info_span!("fetch", provider = "bijian");
        let _entered = span.enter();
        assert!(logs.has_span("fetch"));
        assert!(!logs.has_span("parse"));
    }

    #[test]
    fn contains_text_searches_fields() {
        let (logs, _guard) = capture_logs();
        tracing::debug!(url = "http://localhost/x", "request");
        assert!(logs.contains_text("localhost"));
        assert!(!logs.contains_text("secret"));
    }
}
