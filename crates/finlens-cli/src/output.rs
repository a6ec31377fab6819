use std::io::Write;

use crate::envelope::Envelope;
use crate::error::CliError;

/// Write the envelope as one JSON document on stdout.
pub fn render(envelope: &Envelope, pretty: bool) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write_envelope(&mut handle, envelope, pretty)?;
    handle.flush()?;
    Ok(())
}

fn write_envelope<W: Write>(
    writer: &mut W,
    envelope: &Envelope,
    pretty: bool,
) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, envelope)?;
    } else {
        serde_json::to_writer(&mut *writer, envelope)?;
    }
    writeln!(writer)?;
    Ok(())
}
