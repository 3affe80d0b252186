//! Trace-correlation enrichment for log records.
//!
//! Every record leaving the logger carries the id of the distributed trace
//! it was emitted in, so log lines can be joined with spans in the tracing
//! backend. The id is read from the OpenTelemetry data that
//! `tracing-opentelemetry` attaches to each `tracing` span.

use opentelemetry::trace::{TraceContextExt, TraceId};
use tracing_opentelemetry::OtelData;
use tracing_subscriber::registry::{LookupSpan, Scope, SpanRef};

use crate::observability::record::LogRecord;

/// Trace field value used when no valid trace context is active.
pub const NO_TRACE_ID: &str = "0";

/// Render a trace id the way the log formats expect it.
///
/// Valid ids become 32 lowercase hex characters (zero padded); a missing or
/// all-zero id becomes [`NO_TRACE_ID`].
pub fn format_trace_id(trace_id: Option<TraceId>) -> String {
    match trace_id {
        Some(id) if id != TraceId::INVALID => {
            format!("{:032x}", u128::from_be_bytes(id.to_bytes()))
        }
        _ => NO_TRACE_ID.to_string(),
    }
}

/// Stamps records with the active trace id. Never drops a record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceIdFilter;

impl TraceIdFilter {
    pub fn enrich(&self, mut record: LogRecord, trace_id: Option<TraceId>) -> LogRecord {
        record.trace_id = format_trace_id(trace_id);
        record
    }
}

/// Trace id of a single span.
///
/// A span with a valid parent context (local parent, or a remote parent set
/// from request headers) belongs to the parent's trace. A root span uses the
/// trace id allocated for it when it was created.
pub fn span_trace_id<'a, R>(span: &SpanRef<'a, R>) -> Option<TraceId>
where
    R: LookupSpan<'a>,
{
    let extensions = span.extensions();
    let data = extensions.get::<OtelData>()?;

    let parent = data.parent_cx.span();
    let parent_context = parent.span_context();
    if parent_context.is_valid() {
        return Some(parent_context.trace_id());
    }
    data.builder.trace_id.filter(|id| *id != TraceId::INVALID)
}

/// Trace id of the innermost span in `scope` that has one.
pub fn scope_trace_id<'a, R>(scope: Option<Scope<'a, R>>) -> Option<TraceId>
where
    R: LookupSpan<'a>,
{
    scope?.find_map(|span| span_trace_id(&span))
}
