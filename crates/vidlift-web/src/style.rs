#![forbid(unsafe_code)]

//! Inline declaration values with their priority folded in.
//!
//! The core snapshots and restores inline style values as plain strings. The
//! CSSOM keeps the `!important` flag apart from the value, so the web host
//! joins the two on read and splits them again on write. A declaration
//! written back is then identical to the one that was read.

const IMPORTANT: &str = "important";

/// Join a CSSOM value and priority (`getPropertyPriority`) into one string.
pub fn join_priority(value: String, priority: &str) -> String {
    if value.is_empty() || !priority.eq_ignore_ascii_case(IMPORTANT) {
        value
    } else {
        format!("{value} !{IMPORTANT}")
    }
}

/// Split a trailing `!important` off `value`, returning the bare value and
/// the priority to pass to `setProperty`.
pub fn split_priority(value: &str) -> (&str, &'static str) {
    let trimmed = value.trim_end();
    let Some(bang) = trimmed.rfind('!') else {
        return (trimmed, "");
    };
    if trimmed[bang + 1..].trim().eq_ignore_ascii_case(IMPORTANT) {
        (trimmed[..bang].trim_end(), IMPORTANT)
    } else {
        (trimmed, "")
    }
}
