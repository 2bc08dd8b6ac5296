use crate::cli::InspectArgs;
use crate::error::Result;
use gnnprep::core::io::archive::{ArchiveReader, FeatureArray, GraphRecord};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

pub async fn run(args: InspectArgs) -> Result<()> {
    info!("Reading graph archive {:?}", &args.archive);
    for line in render(&args.archive, args.keys)? {
        println!("{}", line);
    }
    Ok(())
}

/// Reads the whole archive before printing anything, so a corrupt tail is reported
/// instead of a partial listing.
fn render(path: &Path, keys_only: bool) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    let mut count = 0;
    for record in ArchiveReader::open(path)? {
        let record = record?;
        count += 1;
        if keys_only {
            lines.push(record.id);
        } else {
            lines.extend(describe(&record));
        }
    }
    if !keys_only {
        lines.push(format!("{} record(s) in {}", count, path.display()));
    }
    Ok(lines)
}

fn describe(record: &GraphRecord) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}): {} nodes, {} edges",
        record.id,
        record.level,
        record.node_count(),
        record.edge_count()
    )];
    lines.push(format!("  node features: {}", list_features(&record.node_features)));
    lines.push(format!("  edge features: {}", list_features(&record.edge_features)));
    if !record.targets.is_empty() {
        let targets: Vec<String> = record
            .targets
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        lines.push(format!("  targets: {}", targets.join(", ")));
    }
    lines
}

fn list_features(features: &BTreeMap<String, FeatureArray>) -> String {
    if features.is_empty() {
        return "-".to_string();
    }
    features
        .iter()
        .map(|(name, array)| format!("{name}[{}]", array.width))
        .collect::<Vec<_>>()
        .join(", ")
}
