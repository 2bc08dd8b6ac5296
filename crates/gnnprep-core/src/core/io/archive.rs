use crate::core::graph::features::Features;
use crate::core::graph::{Graph, GraphLevel, NodeKey};
use crate::core::models::structure::Structure;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// File signature of a graph archive.
pub const MAGIC: &[u8; 8] = b"GNNPREP\0";
/// Container layout version written by this crate.
pub const FORMAT_VERSION: u32 = 1;
/// Conventional file extension of graph archives.
pub const ARCHIVE_EXTENSION: &str = "gnn";

const HEADER_LEN: u64 = 12;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Record encoding error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("'{path}' is not a graph archive")]
    InvalidHeader { path: PathBuf },
    #[error("'{path}' uses unsupported archive version {version}")]
    UnsupportedVersion { path: PathBuf, version: u32 },
    #[error("'{path}' ends in the middle of a record")]
    Truncated { path: PathBuf },
    #[error("Duplicate record key '{0}'")]
    DuplicateRecord(String),
    #[error("Feature '{name}' in {namespace} is missing or has inconsistent width")]
    InconsistentFeature {
        namespace: &'static str,
        name: String,
    },
    #[error("Graph node {0:?} does not belong to the structure")]
    UnknownNode(NodeKey),
}

/// A row-major block of feature values: `values.len() == width * rows`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureArray {
    pub width: usize,
    pub values: Vec<f64>,
}

impl FeatureArray {
    pub fn rows(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.values.len() / self.width
        }
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        let start = index.checked_mul(self.width)?;
        self.values.get(start..start + self.width)
    }
}

/// The persisted form of a [`Graph`], keyed by its identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub id: String,
    pub level: GraphLevel,
    /// Human-readable label of each node, in node order.
    pub node_labels: Vec<String>,
    pub node_features: BTreeMap<String, FeatureArray>,
    /// Edge endpoints as node indices.
    pub edge_index: Vec<[u32; 2]>,
    pub edge_features: BTreeMap<String, FeatureArray>,
    pub targets: BTreeMap<String, f64>,
}

impl GraphRecord {
    /// Flattens a graph into its persisted form.
    ///
    /// Every feature must be present with the same width on every node (or every edge).
    pub fn from_graph(graph: &Graph, structure: &Structure) -> Result<Self, ArchiveError> {
        let mut node_labels = Vec::with_capacity(graph.node_count());
        for key in graph.node_keys() {
            let label = match key {
                NodeKey::Residue(rid) if structure.residue(rid).is_some() => {
                    structure.residue_label(rid)
                }
                NodeKey::Atom(aid) if structure.atom(aid).is_some() => structure.atom_label(aid),
                _ => return Err(ArchiveError::UnknownNode(key)),
            };
            node_labels.push(label);
        }

        let mut edge_index = Vec::with_capacity(graph.edge_count());
        for (edge, _) in graph.edges() {
            let [a, b] = edge.items();
            let (Some(pa), Some(pb)) = (graph.node_position(a), graph.node_position(b)) else {
                return Err(ArchiveError::UnknownNode(a));
            };
            edge_index.push([pa as u32, pb as u32]);
        }

        Ok(Self {
            id: graph.id().to_string(),
            level: graph.level(),
            node_labels,
            node_features: stack_features("node_features", graph.nodes().map(|(_, f)| f))?,
            edge_index,
            edge_features: stack_features("edge_features", graph.edges().map(|(_, f)| f))?,
            targets: graph.targets().clone(),
        })
    }

    pub fn node_count(&self) -> usize {
        self.node_labels.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_index.len()
    }
}

fn stack_features<'a>(
    namespace: &'static str,
    rows: impl Iterator<Item = &'a Features>,
) -> Result<BTreeMap<String, FeatureArray>, ArchiveError> {
    let rows: Vec<&Features> = rows.collect();
    let Some(first) = rows.first() else {
        return Ok(BTreeMap::new());
    };

    let mut arrays = BTreeMap::new();
    for (name, value) in first.iter() {
        let width = value.width();
        let mut values = Vec::with_capacity(width * rows.len());
        for row in &rows {
            match row.get(name) {
                Some(v) if v.width() == width => values.extend_from_slice(v.as_slice()),
                _ => {
                    return Err(ArchiveError::InconsistentFeature {
                        namespace,
                        name: name.to_string(),
                    });
                }
            }
        }
        arrays.insert(name.to_string(), FeatureArray { width, values });
    }

    if let Some(extra) = rows
        .iter()
        .find_map(|row| row.names().find(|name| !arrays.contains_key(*name)))
    {
        return Err(ArchiveError::InconsistentFeature {
            namespace,
            name: extra.to_string(),
        });
    }
    Ok(arrays)
}

/// Appends records to an archive file.
///
/// Each record is written whole, as a little-endian `u64` length followed by the encoded
/// record, so an archive can be extended after it was closed.
pub struct ArchiveWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    keys: HashSet<String>,
}

impl ArchiveWriter {
    /// Creates (or truncates) an archive at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();
        let mut writer = BufWriter::new(File::create(&path)?);
        write_header(&mut writer)?;
        Ok(Self {
            path,
            writer,
            keys: HashSet::new(),
        })
    }

    /// Opens an archive for appending, creating it when absent or empty.
    pub fn open_append<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();
        let existing_len = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if existing_len == 0 {
            return Self::create(path);
        }

        let keys = ArchiveReader::open(&path)?
            .map(|record| record.map(|r| r.id))
            .collect::<Result<HashSet<_>, _>>()?;
        let file = OpenOptions::new().append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            keys,
        })
    }

    /// Writes one record.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::DuplicateRecord`] if a record with the same id is already in
    /// the archive; nothing is written in that case.
    pub fn append(&mut self, record: &GraphRecord) -> Result<(), ArchiveError> {
        if self.keys.contains(&record.id) {
            return Err(ArchiveError::DuplicateRecord(record.id.clone()));
        }
        let payload = bincode::serialize(record)?;
        self.writer.write_all(&(payload.len() as u64).to_le_bytes())?;
        self.writer.write_all(&payload)?;
        self.keys.insert(record.id.clone());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes buffered records and returns the archive path.
    pub fn finish(mut self) -> Result<PathBuf, ArchiveError> {
        self.writer.flush()?;
        Ok(self.path)
    }
}

fn write_header(writer: &mut impl Write) -> Result<(), ArchiveError> {
    writer.write_all(MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    Ok(())
}

/// Streams records out of an archive in file order.
pub struct ArchiveReader {
    path: PathBuf,
    reader: BufReader<File>,
    done: bool,
}

impl ArchiveReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();
        let mut reader = BufReader::new(File::open(&path)?);

        let mut header = [0u8; HEADER_LEN as usize];
        if reader.read_exact(&mut header).is_err() || &header[..8] != MAGIC {
            return Err(ArchiveError::InvalidHeader { path });
        }
        let mut version_bytes = [0u8; 4];
        version_bytes.copy_from_slice(&header[8..]);
        let version = u32::from_le_bytes(version_bytes);
        if version != FORMAT_VERSION {
            return Err(ArchiveError::UnsupportedVersion { path, version });
        }

        Ok(Self {
            path,
            reader,
            done: false,
        })
    }

    fn read_next(&mut self) -> Result<Option<GraphRecord>, ArchiveError> {
        let mut len_bytes = [0u8; 8];
        let mut filled = 0;
        while filled < len_bytes.len() {
            match self.reader.read(&mut len_bytes[filled..])? {
                0 if filled == 0 => return Ok(None),
                0 => {
                    return Err(ArchiveError::Truncated {
                        path: self.path.clone(),
                    });
                }
                n => filled += n,
            }
        }

        // The length comes from the file, so the buffer only grows as bytes actually arrive.
        let len = u64::from_le_bytes(len_bytes);
        let mut payload = Vec::new();
        let read = (&mut self.reader).take(len).read_to_end(&mut payload)?;
        if (read as u64) < len {
            return Err(ArchiveError::Truncated {
                path: self.path.clone(),
            });
        }
        Ok(Some(bincode::deserialize(&payload)?))
    }
}

impl Iterator for ArchiveReader {
    type Item = Result<GraphRecord, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Reads every record of an archive, rejecting duplicate keys.
pub fn read_archive<P: AsRef<Path>>(path: P) -> Result<Vec<GraphRecord>, ArchiveError> {
    let mut keys = HashSet::new();
    let mut records = Vec::new();
    for record in ArchiveReader::open(path)? {
        let record = record?;
        if !keys.insert(record.id.clone()) {
            return Err(ArchiveError::DuplicateRecord(record.id));
        }
        records.push(record);
    }
    Ok(records)
}

/// Record keys of an archive, in file order.
pub fn archive_keys<P: AsRef<Path>>(path: P) -> Result<Vec<String>, ArchiveError> {
    ArchiveReader::open(path)?
        .map(|record| record.map(|r| r.id))
        .collect()
}

/// Writes the key-space union of `inputs` into a new archive at `output`.
///
/// Inputs are copied in order. A key present in more than one input is an error, and the
/// partially written output is removed.
pub fn merge_archives<P: AsRef<Path>>(inputs: &[P], output: &Path) -> Result<usize, ArchiveError> {
    match write_merged(inputs, output) {
        Ok(count) => {
            info!(
                inputs = inputs.len(),
                records = count,
                output = %output.display(),
                "Merged graph archives."
            );
            Ok(count)
        }
        Err(e) => {
            debug!(error = %e, "Merge failed; removing partial output.");
            let _ = std::fs::remove_file(output);
            Err(e)
        }
    }
}

fn write_merged<P: AsRef<Path>>(inputs: &[P], output: &Path) -> Result<usize, ArchiveError> {
    let mut writer = ArchiveWriter::create(output)?;
    for input in inputs {
        for record in ArchiveReader::open(input)? {
            writer.append(&record?)?;
        }
    }
    let count = writer.len();
    writer.finish()?;
    Ok(count)
}
