//! CSV output for expanded address lists.

use crate::error::{Error, Result};
use chrono::{DateTime, TimeZone};
use csv::{Writer, WriterBuilder};
use std::fmt::Display;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Default timestamp layout embedded in generated file names.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Build `<prefix>_<timestamp>.csv` for the time `now`.
pub fn output_file_name<Tz>(prefix: &str, timestamp_format: &str, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("{}_{}.csv", prefix, now.format(timestamp_format))
}

/// Write one single-field record per address to `path`.
///
/// An optional `header` record goes first. Returns the number of address
/// records written.
pub fn write_csv<I, S>(addresses: I, path: &Path, header: Option<&str>) -> Result<usize>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let output_error = |source| Error::Output {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = open_writer(path).map_err(output_error)?;

    if let Some(header) = header {
        writer.write_record([header]).map_err(output_error)?;
    }

    let mut written = 0;
    for address in addresses {
        writer
            .write_record([address.as_ref()])
            .map_err(output_error)?;
        written += 1;
    }

    writer
        .flush()
        .map_err(|e| output_error(csv::Error::from(e)))?;

    debug!("Wrote {} records to {}", written, path.display());
    Ok(written)
}

fn open_writer(path: &Path) -> std::result::Result<Writer<File>, csv::Error> {
    WriterBuilder::new().has_headers(false).from_path(path)
}
