use crate::core::models::fragment::FragmentRecord;
use crate::core::models::ids::FragType;
use crate::core::store::{DownsampledStore, FragmentStore, FragmentStoreBuilder, StoreError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const READER_LABEL: &str = "<reader>";
const WRITER_LABEL: &str = "<writer>";
const EMPTY_POSITIONS_KEY: &str = "empty-positions";

/// Defines how a synthon store is persisted as a tab-separated container.
///
/// The container has one row per fragment with the columns
/// `reaction`, `position`, `fragment`, `structure` and `price` (empty when
/// unknown). Lines starting with `#` carry metadata and are otherwise ignored.
/// Positions without any record are listed in an
/// `# empty-positions=<reaction>:<position>,...` line so they survive a round
/// trip.
pub trait StoreFile: Sized {
    /// Reads a store from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid TSV, a row is malformed,
    /// a fragment id repeats within a position, or required metadata is missing.
    fn read_from(reader: &mut impl BufRead) -> Result<Self, StoreError> {
        Self::read_labelled(reader, READER_LABEL)
    }

    /// Writes the store to a writer.
    fn write_to(&self, writer: &mut impl Write) -> Result<(), StoreError> {
        self.write_labelled(writer, WRITER_LABEL)
    }

    #[doc(hidden)]
    fn read_labelled(reader: &mut impl BufRead, label: &str) -> Result<Self, StoreError>;

    #[doc(hidden)]
    fn write_labelled(&self, writer: &mut impl Write, label: &str) -> Result<(), StoreError>;

    /// Reads a store from a file path.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| io_error(path, e))?;
        let mut reader = BufReader::new(file);
        Self::read_labelled(&mut reader, &path.to_string_lossy())
    }

    /// Writes the store to a file path, replacing any existing file.
    fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| io_error(path, e))?;
        let mut writer = BufWriter::new(file);
        self.write_labelled(&mut writer, &path.to_string_lossy())?;
        writer.flush().map_err(|e| io_error(path, e))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreRow {
    reaction: String,
    position: usize,
    fragment: String,
    structure: String,
    price: Option<f64>,
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_string_lossy().to_string(),
        source,
    }
}

fn csv_error(label: &str, source: csv::Error) -> StoreError {
    StoreError::Csv {
        path: label.to_string(),
        source,
    }
}

/// Splits leading `# key=value` lines from the body.
fn read_metadata(
    reader: &mut impl BufRead,
    label: &str,
) -> Result<(Vec<(String, String)>, String), StoreError> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|e| StoreError::Io {
            path: label.to_string(),
            source: e,
        })?;

    let metadata = content
        .lines()
        .take_while(|line| line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.trim_start_matches('#').split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect();
    Ok((metadata, content))
}

fn read_rows(
    content: &str,
    metadata: &[(String, String)],
    label: &str,
) -> Result<FragmentStore, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .from_reader(content.as_bytes());

    let mut builder = FragmentStoreBuilder::new();
    for (key, value) in metadata {
        if key == EMPTY_POSITIONS_KEY {
            for frag_type in parse_positions(value, label)? {
                builder.declare_position(&frag_type);
            }
        }
    }
    for row in reader.deserialize::<StoreRow>() {
        let row = row.map_err(|e| csv_error(label, e))?;
        let mut record = FragmentRecord::new(
            FragType::new(row.reaction, row.position),
            row.fragment,
            row.structure,
        );
        record.price = row.price;
        builder.insert(record)?;
    }
    Ok(builder.build())
}

fn parse_positions(value: &str, label: &str) -> Result<Vec<FragType>, StoreError> {
    value
        .split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| {
            let parsed = entry
                .trim()
                .rsplit_once(':')
                .and_then(|(reaction, position)| Some((reaction, position.parse::<usize>().ok()?)));
            match parsed {
                Some((reaction, position)) if !reaction.is_empty() => Ok(FragType::new(reaction, position)),
                _ => Err(StoreError::Header {
                    path: label.to_string(),
                    message: format!("invalid {EMPTY_POSITIONS_KEY} entry '{entry}'"),
                }),
            }
        })
        .collect()
}

fn write_rows(
    store: &FragmentStore,
    writer: &mut impl Write,
    label: &str,
) -> Result<(), StoreError> {
    let empty: Vec<String> = store
        .frag_types()
        .filter(|frag_type| store.records_of(frag_type).is_empty())
        .map(|frag_type| format!("{}:{}", frag_type.reaction, frag_type.position))
        .collect();
    if !empty.is_empty() {
        writeln!(writer, "# {EMPTY_POSITIONS_KEY}={}", empty.join(",")).map_err(|e| StoreError::Io {
            path: label.to_string(),
            source: e,
        })?;
    }

    let mut tsv = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    for frag_type in store.frag_types() {
        for record in store.records_of(&frag_type) {
            tsv.serialize(StoreRow {
                reaction: record.reaction().to_string(),
                position: record.position(),
                fragment: record.id.to_string(),
                structure: record.structure.clone(),
                price: record.price,
            })
            .map_err(|e| csv_error(label, e))?;
        }
    }
    tsv.flush().map_err(|e| StoreError::Io {
        path: label.to_string(),
        source: e,
    })
}

impl StoreFile for FragmentStore {
    fn read_labelled(reader: &mut impl BufRead, label: &str) -> Result<Self, StoreError> {
        let (metadata, content) = read_metadata(reader, label)?;
        read_rows(&content, &metadata, label)
    }

    fn write_labelled(&self, writer: &mut impl Write, label: &str) -> Result<(), StoreError> {
        write_rows(self, writer, label)
    }
}

impl StoreFile for DownsampledStore {
    fn read_labelled(reader: &mut impl BufRead, label: &str) -> Result<Self, StoreError> {
        let (metadata, content) = read_metadata(reader, label)?;
        let lookup = |key: &str| {
            metadata
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| StoreError::Header {
                    path: label.to_string(),
                    message: format!("missing '{key}'"),
                })
        };
        let algorithm = lookup("algorithm")?;
        let min_similarity = lookup("min-similarity")?
            .parse::<f64>()
            .map_err(|e| StoreError::Header {
                path: label.to_string(),
                message: format!("invalid min-similarity: {e}"),
            })?;
        let store = read_rows(&content, &metadata, label)?;
        Ok(DownsampledStore::new(store, algorithm, min_similarity))
    }

    fn write_labelled(&self, writer: &mut impl Write, label: &str) -> Result<(), StoreError> {
        let header = format!(
            "# algorithm={}\n# min-similarity={}\n",
            self.algorithm(),
            self.min_similarity()
        );
        writer
            .write_all(header.as_bytes())
            .map_err(|e| StoreError::Io {
                path: label.to_string(),
                source: e,
            })?;
        write_rows(self.store(), writer, label)
    }
}
