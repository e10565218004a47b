//! JSON line output for CLI commands

use std::io::Write;

use serde::Serialize;

use super::errors::CliResult;

/// Write one value as a single JSON line and flush
pub fn write_json_line<W: Write, T: Serialize>(out: &mut W, value: &T) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
