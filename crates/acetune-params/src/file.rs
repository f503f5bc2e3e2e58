use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum FileError {
    #[display("failed to access {kind} file {}: {source}", path.display())]
    Io {
        kind: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    #[display("failed to parse {kind} file {}: {source}", path.display())]
    Json {
        kind: &'static str,
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl FileError {
    fn io(kind: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            kind,
            path: path.to_owned(),
            source,
        }
    }
}

/// Reads a JSON document of type `T` from `path`.
///
/// `kind` names the file in error messages (e.g. `"parameter"`).
pub fn read_json<T>(kind: &'static str, path: &Path) -> Result<T, FileError>
where
    T: DeserializeOwned,
{
    let file = File::open(path).map_err(|e| FileError::io(kind, path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| FileError::Json {
        kind,
        path: path.to_owned(),
        source,
    })
}

/// Writes `value` as 4-space indented JSON to `path`.
///
/// The document is written to a sibling temporary file first and then renamed over `path`,
/// so readers never observe a partially written file. The temporary file is removed if any
/// step fails.
pub fn write_json<T>(kind: &'static str, path: &Path, value: &T) -> Result<(), FileError>
where
    T: Serialize + ?Sized,
{
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let result = write_pretty(kind, &tmp_path, value)
        .and_then(|()| fs::rename(&tmp_path, path).map_err(|e| FileError::io(kind, path, e)));
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_pretty<T>(kind: &'static str, path: &Path, value: &T) -> Result<(), FileError>
where
    T: Serialize + ?Sized,
{
    let file = File::create(path).map_err(|e| FileError::io(kind, path, e))?;
    let mut writer = BufWriter::new(file);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|source| FileError::Json {
            kind,
            path: path.to_owned(),
            source,
        })?;
    writeln!(writer).map_err(|e| FileError::io(kind, path, e))?;
    writer.flush().map_err(|e| FileError::io(kind, path, e))
}
