//! Reduction of an ordered event sequence into one logical result.
//!
//! Strategies are tried in strict priority order; the first match
//! wins:
//!
//! 1. an error event → failure text
//! 2. a single explicit query-result event → its carried result
//! 3. chunk events → merged `{columns, data, row_count}` table
//! 4. a completion event → its carried result
//! 5. fallback: the entire ordered sequence, stringified
//!
//! Progress events never participate; they only show up in the
//! fallback rendering of the raw sequence.

use serde_json::{Value, json};

use graphlink_types::{StreamEvent, StreamEventKind, ToolResult};

/// Reduce an ordered event sequence to one result.
pub fn aggregate_events(events: &[StreamEvent]) -> ToolResult {
    if let Some(error) = events.iter().find(|e| e.kind == StreamEventKind::Error) {
        let message = error
            .error_message()
            .map(str::to_string)
            .unwrap_or_else(|| stringify(&error.payload));
        return ToolResult::error(message);
    }

    let data_events: Vec<&StreamEvent> = events
        .iter()
        .filter(|e| e.kind == StreamEventKind::Data)
        .collect();
    if let [single] = data_events.as_slice() {
        let carried = single.payload.get("result").unwrap_or(&single.payload);
        return ToolResult::text(stringify(carried));
    }

    if let Some(table) = merge_chunks(events) {
        return ToolResult::text(stringify(&table));
    }

    if let Some(completion) = events.iter().find(|e| e.kind == StreamEventKind::Completion) {
        let carried = completion.payload.get("result").unwrap_or(&completion.payload);
        return ToolResult::text(stringify(carried));
    }

    let sequence: Vec<&Value> = events.iter().map(|e| &e.payload).collect();
    ToolResult::text(stringify(&json!(sequence)))
}

/// Merge chunk events into one table, or `None` when no chunk carried
/// either a column list or any rows.
fn merge_chunks(events: &[StreamEvent]) -> Option<Value> {
    let mut columns: Option<Value> = None;
    let mut data: Vec<Value> = Vec::new();
    let mut saw_content = false;

    for event in events.iter().filter(|e| e.kind == StreamEventKind::Chunk) {
        if columns.is_none() {
            if let Some(cols) = event.payload.get("columns") {
                columns = Some(cols.clone());
                saw_content = true;
            }
        }
        if let Some(Value::Array(rows)) = event.payload.get("data") {
            if !rows.is_empty() {
                saw_content = true;
            }
            data.extend(rows.iter().cloned());
        }
    }

    if !saw_content {
        return None;
    }
    Some(json!({
        "columns": columns.unwrap_or(Value::Null),
        "data": data,
        "row_count": data.len(),
    }))
}

/// Render a value for the text result: strings pass through, anything
/// structured is pretty-printed.
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
