use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TSV writing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Field {column} of a row for '{path}' contains a tab or line break")]
    UnsafeField { path: String, column: usize },
    #[error("Writer lock was poisoned by a panicking thread")]
    Poisoned,
}

/// Path of the `part`-th rotated file: `hits.tsv` → `hits_part2.tsv`.
pub fn rotated_path(base: &Path, part: usize) -> PathBuf {
    if part == 0 {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = match base.extension() {
        Some(ext) => format!("{stem}_part{part}.{}", ext.to_string_lossy()),
        None => format!("{stem}_part{part}"),
    };
    base.with_file_name(file_name)
}

struct RotationState {
    writer: csv::Writer<BufWriter<File>>,
    path: PathBuf,
    rows_in_file: usize,
    part: usize,
    files: Vec<PathBuf>,
}

/// Tab-separated writer that starts a new file every `max_rows` data rows.
///
/// Every file repeats the header. `max_rows == 0` disables rotation. Calls
/// from different threads are serialized internally, so a row is never
/// interleaved with another. Fields are written unquoted; a field holding a
/// tab or line break is rejected with [`WriterError::UnsafeField`].
pub struct RotatingTsvWriter {
    base: PathBuf,
    header: Vec<String>,
    max_rows: usize,
    state: Mutex<RotationState>,
}

impl RotatingTsvWriter {
    /// Creates the base file and writes its header immediately.
    pub fn create(
        base: impl Into<PathBuf>,
        header: &[&str],
        max_rows: usize,
    ) -> Result<Self, WriterError> {
        let base = base.into();
        let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
        let writer = open_with_header(&base, &header)?;
        Ok(Self {
            state: Mutex::new(RotationState {
                writer,
                path: base.clone(),
                rows_in_file: 0,
                part: 0,
                files: vec![base.clone()],
            }),
            base,
            header,
            max_rows,
        })
    }

    pub fn write_row<I, S>(&self, fields: I) -> Result<(), WriterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let fields: Vec<S> = fields.into_iter().collect();
        if let Some(column) = fields
            .iter()
            .position(|f| f.as_ref().iter().any(|b| matches!(b, b'\t' | b'\n' | b'\r')))
        {
            return Err(WriterError::UnsafeField {
                path: self.base.to_string_lossy().to_string(),
                column,
            });
        }

        let mut state = self.state.lock().map_err(|_| WriterError::Poisoned)?;

        if self.max_rows > 0 && state.rows_in_file >= self.max_rows {
            state.writer.flush().map_err(|e| WriterError::Io {
                path: state.path.to_string_lossy().to_string(),
                source: e,
            })?;
            let part = state.part + 1;
            let path = rotated_path(&self.base, part);
            debug!(path = %path.display(), "Rotating output file.");
            state.writer = open_with_header(&path, &self.header)?;
            state.files.push(path.clone());
            state.path = path;
            state.part = part;
            state.rows_in_file = 0;
        }

        let path = state.path.clone();
        state
            .writer
            .write_record(fields)
            .map_err(|e| WriterError::Csv {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;
        state.rows_in_file += 1;
        Ok(())
    }

    pub fn flush(&self) -> Result<(), WriterError> {
        let mut state = self.state.lock().map_err(|_| WriterError::Poisoned)?;
        let path = state.path.to_string_lossy().to_string();
        state
            .writer
            .flush()
            .map_err(|e| WriterError::Io { path, source: e })
    }

    /// Flushes and returns every file written, in creation order.
    pub fn finish(self) -> Result<Vec<PathBuf>, WriterError> {
        self.flush()?;
        let state = self.state.into_inner().map_err(|_| WriterError::Poisoned)?;
        Ok(state.files)
    }
}

fn open_with_header(
    path: &Path,
    header: &[String],
) -> Result<csv::Writer<BufWriter<File>>, WriterError> {
    let file = File::create(path).map_err(|e| WriterError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(BufWriter::new(file));
    writer
        .write_record(header)
        .map_err(|e| WriterError::Csv {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn rotated_paths_insert_the_part_before_the_extension() {
        let base = Path::new("/tmp/out/hits.tsv");
        assert_eq!(rotated_path(base, 0), base);
        assert_eq!(rotated_path(base, 2), Path::new("/tmp/out/hits_part2.tsv"));
        assert_eq!(
            rotated_path(Path::new("hits"), 1),
            Path::new("hits_part1")
        );
    }

    #[test]
    fn zero_rows_still_produce_a_header_only_file() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("empty.tsv");
        let writer = RotatingTsvWriter::create(&base, &["a", "b"], 2).unwrap();
        let files = writer.finish().unwrap();
        assert_eq!(files, vec![base.clone()]);
        assert_eq!(fs::read_to_string(base).unwrap(), "a\tb\n");
    }

    #[test]
    fn fields_with_separators_are_rejected_without_touching_the_file() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("strict.tsv");
        let writer = RotatingTsvWriter::create(&base, &["a", "b"], 0).unwrap();
        writer.write_row(["ok", "fine"]).unwrap();
        assert!(matches!(
            writer.write_row(["ok", "two\tcolumns"]),
            Err(WriterError::UnsafeField { column: 1, .. })
        ));
        assert!(matches!(
            writer.write_row(["line\nbreak", "x"]),
            Err(WriterError::UnsafeField { column: 0, .. })
        ));
        writer.finish().unwrap();
        assert_eq!(fs::read_to_string(base).unwrap(), "a\tb\nok\tfine\n");
    }

    #[test]
    fn unlimited_writer_never_rotates() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("all.tsv");
        let writer = RotatingTsvWriter::create(&base, &["x"], 0).unwrap();
        for i in 0..50 {
            writer.write_row([i.to_string()]).unwrap();
        }
        let files = writer.finish().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(fs::read_to_string(base).unwrap().lines().count(), 51);
    }

    #[test]
    fn concurrent_rows_are_never_interleaved() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("threads.tsv");
        let writer = RotatingTsvWriter::create(&base, &["thread", "row"], 0).unwrap();
        std::thread::scope(|s| {
            for t in 0..4 {
                let writer = &writer;
                s.spawn(move || {
                    for r in 0..100 {
                        writer
                            .write_row([format!("t{t}"), format!("{}", "r".repeat(r % 7 + 1))])
                            .unwrap();
                    }
                });
            }
        });
        writer.finish().unwrap();
        let content = fs::read_to_string(base).unwrap();
        assert_eq!(content.lines().count(), 401);
        for line in content.lines().skip(1) {
            let fields: Vec<_> = line.split('\t').collect();
            assert_eq!(fields.len(), 2);
            assert!(fields[0].starts_with('t'));
            assert!(fields[1].chars().all(|c| c == 'r'));
        }
    }
}
