use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tempfile::NamedTempFile;

use crate::error::CorpusError;

/// Extension of persisted corpus files.
pub const CORPUS_EXTENSION: &str = "json";

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
pub fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents.lines().map(str::to_owned).collect())
}

/// Builds the path of the persisted image of a corpus.
///
/// Example:
/// `data` + `"comments"` → `data/comments.json`
///
/// The extension is appended, never substituted, so `notes.a` and `notes.b`
/// map to two different files.
pub fn corpus_path<P: AsRef<Path>>(data_dir: P, name: &str) -> PathBuf {
	data_dir.as_ref().join(format!("{name}.{CORPUS_EXTENSION}"))
}

/// Lists all files with a given extension in a directory.
///
/// Returns file names only (no paths), sorted.
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();

		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}

	files.sort();
	Ok(files)
}

/// Reads and deserializes a JSON file.
///
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
/// - [`CorpusError::Read`] if the file exists but cannot be opened or read
/// - [`CorpusError::Malformed`] if its content is not valid for `T`
pub fn read_json<T, P>(path: P) -> Result<Option<T>, CorpusError>
where
	T: DeserializeOwned,
	P: AsRef<Path>,
{
	let path = path.as_ref();
	let file = match File::open(path) {
		Ok(file) => file,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
		Err(source) => return Err(CorpusError::Read { path: path.to_owned(), source }),
	};

	serde_json::from_reader(BufReader::new(file))
		.map(Some)
		.map_err(|source| {
			if source.is_io() {
				CorpusError::Read { path: path.to_owned(), source: source.into() }
			} else {
				CorpusError::Malformed { path: path.to_owned(), source }
			}
		})
}

/// Serializes `value` as tab-indented JSON and atomically replaces `path`.
///
/// # Behavior
/// - Creates the parent directory if needed.
/// - Writes into a temporary file next to `path`, then renames it over
///   `path`, so a failed write leaves the previous content in place.
///
/// # Errors
/// Returns [`CorpusError::Write`] on any I/O or serialization failure.
pub fn write_json<T, P>(path: P, value: &T) -> Result<(), CorpusError>
where
	T: Serialize + ?Sized,
	P: AsRef<Path>,
{
	let path = path.as_ref();
	let write_error = |source: io::Error| CorpusError::Write { path: path.to_owned(), source };

	let parent = match path.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => parent,
		_ => Path::new("."),
	};
	fs::create_dir_all(parent).map_err(write_error)?;

	let temp_file = NamedTempFile::new_in(parent).map_err(write_error)?;
	{
		let mut writer = BufWriter::new(temp_file.as_file());
		let mut serializer = Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"\t"));
		value.serialize(&mut serializer).map_err(|e| write_error(e.into()))?;
		writer.flush().map_err(write_error)?;
	}

	temp_file.persist(path).map_err(|e| write_error(e.error))?;
	Ok(())
}
