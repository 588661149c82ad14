use serde::Serialize;

/// Severity of an administrative status event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Status/log event published to the administrative stream. Delivery and
/// backpressure are the sink's concern, not the publisher's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminEvent {
    pub level: EventLevel,
    pub message: String,
}

impl AdminEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: EventLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: EventLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: EventLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: EventLevel::Error,
            message: message.into(),
        }
    }
}

/// Push channel for administrative events. Publishing is infallible from the
/// core's perspective; sinks drop or buffer as they see fit.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: AdminEvent);
}

/// Sink that discards everything; the default when no stream is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn publish(&self, _event: AdminEvent) {}
}
