//! Definition-time tracing.
//!
//! Building a record type resolves its fields and synthesizes its operations.
//! The [`DefinitionTracer`] trait has hook points for each step so callers can
//! see which fields were merged, which ones moved, and which operations were
//! generated or kept from the user's declaration.
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | No-op (default) |
//! | [`StderrTracer`] | Human-readable definition log to stderr |
//! | [`RecordingTracer`] | Full event recording for assertions and post-mortem |
//!
//! ```ignore
//! let mut decorator = Decorator::new().with_tracer(RecordingTracer::new());
//! let pet = decorator.apply(decl)?;
//! for event in decorator.tracer().events() { ... }
//! ```

use crate::synth::Operation;

/// Event emitted while a record type is defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// Field resolution started.
    ResolveStart {
        class: String,
        /// Number of ancestor tables merged, the whole linearization.
        ancestors: usize,
    },
    /// A field was merged into the table.
    FieldMerged {
        class: String,
        field: String,
        /// True when an earlier entry of the same name was replaced in place.
        overridden: bool,
    },
    /// Partitioning moved a required field ahead of defaulted ones.
    FieldReordered {
        class: String,
        field: String,
        from: usize,
        to: usize,
    },
    /// Field resolution finished.
    ResolveEnd { class: String, fields: usize },
    /// An operation was generated.
    Synthesized { class: String, op: Operation },
    /// A user-defined operation took precedence over generation.
    UserDefinedKept { class: String, op: Operation },
}

/// Trait for definition tracing.
///
/// All methods have default no-op implementations; implementations only
/// override the hooks they care about.
pub trait DefinitionTracer: std::fmt::Debug {
    #[inline(always)]
    fn on_resolve_start(&mut self, _class: &str, _ancestors: usize) {}

    /// Called once per merged field, in merge order.
    #[inline(always)]
    fn on_field_merged(&mut self, _class: &str, _field: &str, _overridden: bool) {}

    #[inline(always)]
    fn on_field_reordered(&mut self, _class: &str, _field: &str, _from: usize, _to: usize) {}

    #[inline(always)]
    fn on_resolve_end(&mut self, _class: &str, _fields: usize) {}

    #[inline(always)]
    fn on_synthesize(&mut self, _class: &str, _op: Operation) {}

    #[inline(always)]
    fn on_user_defined_kept(&mut self, _class: &str, _op: Operation) {}
}

/// A tracer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl DefinitionTracer for NoopTracer {}

/// Tracer that prints a human-readable definition log to stderr.
///
/// Output format:
/// ```text
/// === resolve Dog (1 ancestors)
///   + name
///   ~ fluffy (override)
///   > name 1 -> 0
/// === Dog: 3 fields
///   * init
///   = repr (user-defined)
/// ```
#[derive(Debug)]
pub struct StderrTracer {
    /// Maximum number of lines to print. None = unlimited.
    limit: Option<usize>,
    count: usize,
    stopped: bool,
}

impl StderrTracer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            limit: None,
            count: 0,
            stopped: false,
        }
    }

    /// Creates a stderr tracer that stops after `limit` lines.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            count: 0,
            stopped: false,
        }
    }

    fn line(&mut self, text: std::fmt::Arguments<'_>) {
        if self.stopped {
            return;
        }
        eprintln!("{text}");
        self.count += 1;
        if let Some(limit) = self.limit
            && self.count >= limit
        {
            eprintln!("--- trace limit reached ({limit} lines) ---");
            self.stopped = true;
        }
    }
}

impl Default for StderrTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionTracer for StderrTracer {
    fn on_resolve_start(&mut self, class: &str, ancestors: usize) {
        self.line(format_args!("=== resolve {class} ({ancestors} ancestors)"));
    }

    fn on_field_merged(&mut self, _class: &str, field: &str, overridden: bool) {
        if overridden {
            self.line(format_args!("  ~ {field} (override)"));
        } else {
            self.line(format_args!("  + {field}"));
        }
    }

    fn on_field_reordered(&mut self, _class: &str, field: &str, from: usize, to: usize) {
        self.line(format_args!("  > {field} {from} -> {to}"));
    }

    fn on_resolve_end(&mut self, class: &str, fields: usize) {
        self.line(format_args!("=== {class}: {fields} fields"));
    }

    fn on_synthesize(&mut self, _class: &str, op: Operation) {
        self.line(format_args!("  * {op}"));
    }

    fn on_user_defined_kept(&mut self, _class: &str, op: Operation) {
        self.line(format_args!("  = {op} (user-defined)"));
    }
}

/// Tracer that records every event in order.
#[derive(Debug)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
    limit: Option<usize>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            limit: None,
        }
    }

    /// Creates a recording tracer that stops recording after `limit` events.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            events: Vec::with_capacity(limit.min(1024)),
            limit: Some(limit),
        }
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }

    /// Drops all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    fn push(&mut self, event: TraceEvent) {
        if self.limit.is_some_and(|l| self.events.len() >= l) {
            return;
        }
        self.events.push(event);
    }
}

impl Default for RecordingTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionTracer for RecordingTracer {
    fn on_resolve_start(&mut self, class: &str, ancestors: usize) {
        self.push(TraceEvent::ResolveStart {
            class: class.to_owned(),
            ancestors,
        });
    }

    fn on_field_merged(&mut self, class: &str, field: &str, overridden: bool) {
        self.push(TraceEvent::FieldMerged {
            class: class.to_owned(),
            field: field.to_owned(),
            overridden,
        });
    }

    fn on_field_reordered(&mut self, class: &str, field: &str, from: usize, to: usize) {
        self.push(TraceEvent::FieldReordered {
            class: class.to_owned(),
            field: field.to_owned(),
            from,
            to,
        });
    }

    fn on_resolve_end(&mut self, class: &str, fields: usize) {
        self.push(TraceEvent::ResolveEnd {
            class: class.to_owned(),
            fields,
        });
    }

    fn on_synthesize(&mut self, class: &str, op: Operation) {
        self.push(TraceEvent::Synthesized {
            class: class.to_owned(),
            op,
        });
    }

    fn on_user_defined_kept(&mut self, class: &str, op: Operation) {
        self.push(TraceEvent::UserDefinedKept {
            class: class.to_owned(),
            op,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_tracer_respects_limit() {
        let mut tracer = RecordingTracer::with_limit(2);
        tracer.on_resolve_start("A", 0);
        tracer.on_field_merged("A", "x", false);
        tracer.on_resolve_end("A", 1);
        assert_eq!(tracer.events().len(), 2);
        assert_eq!(
            tracer.events()[1],
            TraceEvent::FieldMerged {
                class: "A".to_owned(),
                field: "x".to_owned(),
                overridden: false
            }
        );
    }
}
