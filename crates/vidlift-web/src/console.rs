#![forbid(unsafe_code)]

//! `tracing` output for a process without stdout.
//!
//! [`ConsoleLayer`] renders each event as one line,
//! `[vidlift] WARN target: message key=value`, and hands it to a
//! [`ConsoleSink`]. On the web the sink is the devtools console, picked per
//! level so the browser's own level filter applies.

use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

/// Prefix on every line, so extension output is easy to filter from page
/// output.
pub const LOG_PREFIX: &str = "[vidlift]";

/// Destination for rendered lines.
pub trait ConsoleSink: Send + Sync + 'static {
    fn write_line(&self, level: Level, line: &str);
}

/// Layer forwarding events at or above `max_level` to a sink.
#[derive(Debug)]
pub struct ConsoleLayer<S> {
    sink: S,
    max_level: Level,
}

impl<S: ConsoleSink> ConsoleLayer<S> {
    pub fn new(sink: S, max_level: Level) -> Self {
        Self { sink, max_level }
    }
}

impl<S: ConsoleSink, C: Subscriber> Layer<C> for ConsoleLayer<S> {
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, C>) -> bool {
        *metadata.level() <= self.max_level
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, C>) {
        let metadata = event.metadata();
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        let line = format!(
            "{LOG_PREFIX} {} {}: {}{}",
            metadata.level(),
            metadata.target(),
            visitor.message,
            visitor.fields
        );
        self.sink.write_line(*metadata.level(), &line);
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
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }
}

/// Install a registry with a [`ConsoleLayer`] as the global subscriber.
/// Returns `false` if a global subscriber was already set.
pub fn install<S: ConsoleSink>(sink: S, max_level: Level) -> bool {
    let subscriber = tracing_subscriber::registry().with(ConsoleLayer::new(sink, max_level));
    tracing::subscriber::set_global_default(subscriber).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<(Level, String)>>>);

    impl ConsoleSink for Captured {
        fn write_line(&self, level: Level, line: &str) {
            self.0.lock().unwrap().push((level, line.to_owned()));
        }
    }

    fn capture(max_level: Level, emit: impl FnOnce()) -> Vec<(Level, String)> {
        let sink = Captured::default();
        let subscriber =
            tracing_subscriber::registry().with(ConsoleLayer::new(sink.clone(), max_level));
        tracing::subscriber::with_default(subscriber, emit);
        sink.0.lock().unwrap().clone()
    }

    #[test]
    fn event_renders_as_one_prefixed_line() {
        let lines = capture(Level::DEBUG, || {
            tracing::warn!(target: "vidlift", overlay = 3, reason = "gone", "slot missing");
        });
        assert_eq!(
            lines,
            vec![(
                Level::WARN,
                "[vidlift] WARN vidlift: slot missing overlay=3 reason=gone".to_owned()
            )]
        );
    }

    #[test]
    fn display_fields_use_display_formatting() {
        let error = "SecurityError";
        let lines = capture(Level::INFO, || {
            tracing::info!(target: "vidlift", %error, "rejected");
        });
        assert_eq!(lines[0].1, "[vidlift] INFO vidlift: rejected error=SecurityError");
    }

    #[test]
    fn events_below_max_level_are_dropped() {
        let lines = capture(Level::INFO, || {
            tracing::debug!(target: "vidlift", "noise");
            tracing::trace!(target: "vidlift", "more noise");
            tracing::error!(target: "vidlift", "kept");
        });
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, Level::ERROR);
    }
}
