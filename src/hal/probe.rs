use tracing::{debug, warn};

use super::traits::HardwareStream;

/// Whether any advertised physical format of `stream` is compressed.
/// A failed query counts as no support.
pub fn supports_compressed(stream: &dyn HardwareStream) -> bool {
    let formats = match stream.available_physical_formats() {
        Ok(formats) => formats,
        Err(e) => {
            warn!(stream = %stream.id(), error = %e, "could not get stream formats");
            return false;
        }
    };

    formats.iter().any(|format| {
        debug!(stream = %stream.id(), %format, "advertised format");
        format.is_compressed()
    })
}
