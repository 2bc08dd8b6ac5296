use crate::error::{CliError, Result};
use gnnprep::core::graph::GraphLevel;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A query manifest as written on disk.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileManifest {
    #[serde(default)]
    pub settings: FileSettings,
    #[serde(default)]
    pub queries: Vec<FileQuery>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSettings {
    pub output_prefix: Option<PathBuf>,
    pub workers: Option<usize>,
    pub combine_output: Option<bool>,
    pub query_timeout_secs: Option<u64>,
    pub features: Option<Vec<String>>,
    pub warn_duplicates: Option<bool>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FileQueryKind {
    Interface,
    Variant,
}

/// A residue position, written either as a bare number or as a string with an
/// insertion code (`"27B"`).
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum FileResidue {
    Number(i32),
    Text(String),
}

/// One `[[queries]]` entry. Which fields are required depends on `kind`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileQuery {
    pub structure: PathBuf,
    pub kind: FileQueryKind,
    pub level: Option<GraphLevel>,

    // Interface queries
    pub chain1: Option<String>,
    pub chain2: Option<String>,

    // Variant queries
    pub chain: Option<String>,
    pub residue: Option<FileResidue>,
    pub wildtype: Option<String>,
    pub variant: Option<String>,
    pub radius: Option<f64>,

    pub cutoff: Option<f64>,
    #[serde(default)]
    pub targets: BTreeMap<String, f64>,
    /// PSSM file per chain id.
    #[serde(default)]
    pub pssm: BTreeMap<String, PathBuf>,
}

impl FileManifest {
    /// Parses a manifest and resolves its relative paths against the manifest's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading query manifest from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut manifest: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        manifest.resolve_paths(base_dir);
        Ok(manifest)
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        if let Some(prefix) = self.settings.output_prefix.take() {
            self.settings.output_prefix = Some(resolve(base_dir, prefix));
        }
        for query in &mut self.queries {
            query.structure = resolve(base_dir, std::mem::take(&mut query.structure));
            for path in query.pssm.values_mut() {
                *path = resolve(base_dir, std::mem::take(path));
            }
        }
    }
}

fn resolve(base_dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}
