//! Stdio output for control messages.
//!
//! # Important
//!
//! - **stdout**: control messages only (one JSON document per line)
//! - **stderr**: logs via `tracing`, never parsed by the parent
//! - **Never use `println!`**: It may add `\r\n` on Windows

use std::io::Write;

/// Write `line` followed by a single `\n` and flush.
pub fn write_line<W: Write>(writer: &mut W, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Write a line to stdout.
///
/// Uses explicit `\n` and flushes immediately so the parent sees the
/// complete line.
///
/// # Errors
///
/// Returns IO error if write or flush fails.
pub fn write_stdout_line(line: &str) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write_line(&mut handle, line)
}

/// Write a JSON value to stdout as a single line.
///
/// # Errors
///
/// Returns error if serialization or write fails.
pub fn write_stdout_json<T: serde::Serialize>(value: &T) -> crate::error::Result<()> {
    let json = serde_json::to_string(value)?;
    write_stdout_line(&json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_line_appends_single_newline() {
        let mut out = Vec::new();
        write_line(&mut out, r#"{"ready":true}"#).unwrap();
        write_line(&mut out, "second").unwrap();
        assert_eq!(out, b"{\"ready\":true}\nsecond\n");
    }

    #[test]
    fn test_write_stdout_json_serializes() {
        use serde::Serialize;

        #[derive(Serialize)]
        struct Status {
            written: u64,
        }

        assert!(write_stdout_json(&Status { written: 3 }).is_ok());
    }
}
