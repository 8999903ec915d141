use std::{fs, path::Path};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::ModelError;

/// Serializes `value` with the four-space indentation used by every file
/// this tool reads and writes.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    Ok(buf)
}

/// Writes `value` to `path`, replacing any previous content.
pub fn write_pretty_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ModelError> {
    let bytes = to_pretty_json(value)?;
    write_encoded(path, &bytes)
}

/// Writes JSON already produced by [`to_pretty_json`], replacing any
/// previous content.
pub fn write_encoded(path: &Path, bytes: &[u8]) -> Result<(), ModelError> {
    fs::write(path, bytes).map_err(|source| ModelError::Write {
        path: path.to_path_buf(),
        source,
    })
}
