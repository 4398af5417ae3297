// FairMine - core/xes.rs
//
// Event log loading. XES import is delegated to the `process_mining` crate;
// this module maps its attribute-based structure onto `EventLog`, derives the
// protected flag, and normalises timestamps.

use crate::core::model::{Case, Event, EventLog, TimestampMode};
use crate::util::constants;
use crate::util::error::ParseError;
use chrono::{DateTime, TimeZone, Utc};
use process_mining::event_log::event_log_struct::AttributeValue;
use process_mining::{import_xes_file, XESImportOptions};
use std::path::Path;

/// Options controlling how an XES file becomes an `EventLog`.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub timestamp_mode: TimestampMode,

    /// Trace attribute holding the protected flag (without `case:` prefix).
    pub protected_attribute: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            timestamp_mode: TimestampMode::default(),
            protected_attribute: constants::DEFAULT_PROTECTED_ATTRIBUTE.to_string(),
        }
    }
}

/// Load an XES event log from `path`.
///
/// Fails if the file is missing, is not valid XES, or a trace/event lacks its
/// `concept:name`. Errors are returned to the caller unchanged; a log that
/// cannot be read aborts that log's run.
pub fn load_log(path: &Path, options: &LoadOptions) -> Result<EventLog, ParseError> {
    if !path.is_file() {
        return Err(ParseError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let started = std::time::Instant::now();
    let path_str = path.to_string_lossy().into_owned();
    let raw = import_xes_file(path_str.as_str(), XESImportOptions::default()).map_err(|e| {
        ParseError::Xes {
            path: path.to_path_buf(),
            reason: format!("{e:?}"),
        }
    })?;

    let mut cases = Vec::with_capacity(raw.traces.len());
    let mut record_index: i64 = 0;
    let mut missing_flag = 0usize;

    for (trace_index, trace) in raw.traces.iter().enumerate() {
        let id = trace
            .attributes
            .iter()
            .find(|a| a.key == constants::CONCEPT_NAME_KEY)
            .and_then(|a| value_as_string(&a.value))
            .ok_or_else(|| ParseError::MissingCaseId {
                path: path.to_path_buf(),
                trace_index,
            })?;

        let protected = match trace
            .attributes
            .iter()
            .find(|a| a.key == options.protected_attribute)
        {
            Some(a) => value_as_flag(&a.value),
            None => {
                missing_flag += 1;
                false
            }
        };

        let mut events = Vec::with_capacity(trace.events.len());
        for (event_index, event) in trace.events.iter().enumerate() {
            let activity = event
                .attributes
                .iter()
                .find(|a| a.key == constants::CONCEPT_NAME_KEY)
                .and_then(|a| value_as_string(&a.value))
                .ok_or_else(|| ParseError::MissingActivity {
                    path: path.to_path_buf(),
                    case_id: id.clone(),
                    event_index,
                })?;

            let timestamp = match options.timestamp_mode {
                TimestampMode::RecordOrder => record_order_timestamp(record_index),
                TimestampMode::Source => event
                    .attributes
                    .iter()
                    .find(|a| a.key == constants::TIMESTAMP_KEY)
                    .and_then(|a| value_as_timestamp(&a.value))
                    .ok_or_else(|| ParseError::MissingTimestamp {
                        path: path.to_path_buf(),
                        case_id: id.clone(),
                        event_index,
                    })?,
            };
            record_index += 1;

            events.push(Event {
                activity,
                timestamp,
            });
        }

        // Stable: equal timestamps keep their record order.
        events.sort_by_key(|e| e.timestamp);

        cases.push(Case {
            id,
            protected,
            events,
        });
    }

    if missing_flag > 0 {
        tracing::warn!(
            log = %path.display(),
            attribute = %options.protected_attribute,
            cases = missing_flag,
            "Cases without a protected attribute are treated as not protected"
        );
    }

    let log = EventLog::new(cases, Some(path.to_path_buf()));
    tracing::info!(
        log = %path.display(),
        cases = log.case_count(),
        events = log.event_count(),
        activities = log.activities().len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Event log loaded"
    );
    Ok(log)
}

/// Timestamp derived from an event's position in the file.
fn record_order_timestamp(index: i64) -> DateTime<Utc> {
    Utc.timestamp_nanos(index)
}

fn value_as_string(value: &AttributeValue) -> Option<String> {
    match value {
        AttributeValue::String(s) => Some(s.clone()),
        AttributeValue::Int(i) => Some(i.to_string()),
        _ => None,
    }
}

fn value_as_flag(value: &AttributeValue) -> bool {
    match value {
        AttributeValue::Boolean(b) => *b,
        AttributeValue::String(s) => parse_flag(s),
        AttributeValue::Int(i) => *i != 0,
        _ => false,
    }
}

fn value_as_timestamp(value: &AttributeValue) -> Option<DateTime<Utc>> {
    match value {
        AttributeValue::Date(d) => Some(d.with_timezone(&Utc)),
        AttributeValue::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        _ => None,
    }
}

/// Interpret a string-typed protected flag.
fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}
