//! Plain-text record layouts.
//!
//! Every record starts with a blank line and a `-----` separator so that
//! consecutive appends stay readable. `Time:` is the moment the record is
//! rendered, as read from the pipeline's clock.

use std::fmt::Write;

use chrono::{DateTime, Local};

use crate::clock::format_timestamp;
use crate::context::FieldMap;
use crate::event::{FaultEvent, UncaughtException};

pub const RECORD_SEPARATOR: &str = "-----";

const RULE_WIDTH: usize = 52;

/// Fault record for the `other` and `deprecated` buckets
pub fn render_fault(
    event: &FaultEvent,
    display_name: &str,
    server: &FieldMap,
    now: &DateTime<Local>,
) -> String {
    let mut out = format!("\n{}\n", RECORD_SEPARATOR);
    let _ = writeln!(out, "Time:  {}", format_timestamp(now));
    let _ = writeln!(out, "Level: {} ({})", event.level(), display_name);
    let _ = writeln!(out, "Error: {}", event.message());
    let _ = writeln!(out, "File:  {}", event.source_file());
    let _ = writeln!(out, "Line:  {}", event.source_line());
    out.push_str("Server:\n");
    write_fields(&mut out, server);
    out
}

/// Exception record with type name and indented stack trace
pub fn render_exception(
    exc: &UncaughtException,
    server: &FieldMap,
    now: &DateTime<Local>,
) -> String {
    let mut out = format!("\n{}\n", RECORD_SEPARATOR);
    let _ = writeln!(out, "Time:      {}", format_timestamp(now));
    let _ = writeln!(out, "Exception: {}", exc.type_name);
    let _ = writeln!(out, "Message:   {}", exc.message);
    let _ = writeln!(out, "File:      {}", exc.file);
    let _ = writeln!(out, "Line:      {}", exc.line);
    out.push_str("Trace:\n");
    for line in exc.trace.lines() {
        let _ = writeln!(out, "  {}", line);
    }
    out.push_str("Server:\n");
    write_fields(&mut out, server);
    out
}

/// Full dump for an unrecoverable fault
pub fn render_fatal(
    event: &FaultEvent,
    display_name: &str,
    request: &FieldMap,
    server: &FieldMap,
    now: &DateTime<Local>,
) -> String {
    let mut out = format!("\n{}\n", RECORD_SEPARATOR);
    let _ = writeln!(out, "Time: {}", format_timestamp(now));
    let _ = writeln!(out, "Type: {} ({})", event.level(), display_name);
    let _ = writeln!(out, "Message: {}", event.message());
    let _ = writeln!(out, "File: {}", event.source_file());
    let _ = writeln!(out, "Line: {}", event.source_line());
    out.push_str(&section_rule("Request"));
    write_fields(&mut out, request);
    out.push_str(&section_rule("Server"));
    write_fields(&mut out, server);
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push('\n');
    out
}

fn section_rule(title: &str) -> String {
    let head = format!("======= {} ", title);
    let pad = RULE_WIDTH.saturating_sub(head.len());
    format!("{}{}\n", head, "=".repeat(pad))
}

fn write_fields(out: &mut String, fields: &FieldMap) {
    for (key, value) in fields {
        let _ = writeln!(out, "  {}: {}", key, value);
    }
}
