use super::defaults::DefaultsConfig;
use super::file::{FileManifest, FileQuery, FileQueryKind, FileResidue};
use super::models::AppConfig;
use crate::cli::ProcessArgs;
use crate::error::{CliError, Result};
use gnnprep::core::models::amino_acid::AminoAcid;
use gnnprep::core::models::residue::ResidueLocus;
use gnnprep::engine::config::ProcessConfigBuilder;
use gnnprep::workflows::collection::QueryCollection;
use gnnprep::workflows::query::Query;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Resolves the final run configuration. Precedence: command-line flags, then `--set`
/// values, then the manifest, then [`DefaultsConfig`].
pub fn build_config(args: &ProcessArgs, threads: Option<usize>) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let manifest = FileManifest::from_file(&args.manifest)?;
    let manifest = apply_set_values(manifest, &args.set_values)?;
    let settings = manifest.settings;

    let output_prefix = args
        .output_prefix
        .clone()
        .or(settings.output_prefix)
        .unwrap_or_else(|| defaults.output_prefix.clone());

    let combine_output = match (args.combine.combine, args.combine.no_combine) {
        (true, false) => true,
        (false, true) => false,
        _ => settings.combine_output.unwrap_or(defaults.combine_output),
    };

    let timeout_secs = args
        .timeout
        .or(settings.query_timeout_secs)
        .unwrap_or(defaults.query_timeout_secs);

    let mut builder = ProcessConfigBuilder::new()
        .output_prefix(output_prefix)
        .combine_output(combine_output)
        .query_timeout(Duration::from_secs(timeout_secs));
    if let Some(workers) = threads.or(settings.workers) {
        builder = builder.worker_count(workers);
    }
    if let Some(features) = args.features.clone().or(settings.features) {
        builder = builder.features(features);
    }
    let process = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    if manifest.queries.is_empty() {
        return Err(CliError::Config(format!(
            "Manifest '{}' defines no queries",
            args.manifest.display()
        )));
    }

    let warn_duplicates = settings
        .warn_duplicates
        .unwrap_or(defaults.warn_duplicates);
    let mut collection = QueryCollection::new();
    for (index, file_query) in manifest.queries.into_iter().enumerate() {
        let query = to_query(index, file_query, &defaults)?;
        let id = collection.add(query, warn_duplicates);
        debug!("Query #{} registered as '{}'", index + 1, id);
    }

    Ok(AppConfig {
        collection,
        process,
    })
}

fn to_query(index: usize, file: FileQuery, defaults: &DefaultsConfig) -> Result<Query> {
    let invalid = |reason: String| CliError::Config(format!("Query #{}: {}", index + 1, reason));
    let require = |value: Option<String>, key: &str| {
        value.ok_or_else(|| invalid(format!("`{key}` is required for this kind of query")))
    };

    let level = file.level.unwrap_or(defaults.level);
    let mut query = match file.kind {
        FileQueryKind::Interface => {
            if let Some(key) = [
                ("chain", file.chain.is_some()),
                ("residue", file.residue.is_some()),
                ("wildtype", file.wildtype.is_some()),
                ("variant", file.variant.is_some()),
                ("radius", file.radius.is_some()),
            ]
            .iter()
            .find_map(|&(key, set)| set.then_some(key))
            {
                return Err(invalid(format!("`{key}` only applies to variant queries")));
            }
            let chain1 = require(file.chain1, "chain1")?;
            let chain2 = require(file.chain2, "chain2")?;
            Query::interface(file.structure, level, &chain1, &chain2)
        }
        FileQueryKind::Variant => {
            if file.chain1.is_some() || file.chain2.is_some() {
                return Err(invalid(
                    "`chain1` and `chain2` only apply to interface queries".to_string(),
                ));
            }
            let chain = require(file.chain, "chain")?;
            let residue = file.residue.ok_or_else(|| {
                invalid("`residue` is required for this kind of query".to_string())
            })?;
            let locus = parse_locus(&residue).map_err(invalid)?;
            let wildtype =
                parse_amino_acid(&require(file.wildtype, "wildtype")?).map_err(invalid)?;
            let variant =
                parse_amino_acid(&require(file.variant, "variant")?).map_err(invalid)?;
            let query = Query::variant(file.structure, level, &chain, locus, wildtype, variant);
            match file.radius {
                Some(radius) => query.with_radius(radius),
                None => query,
            }
        }
    };

    if let Some(cutoff) = file.cutoff {
        query = query.with_cutoff(cutoff);
    }
    for (name, value) in file.targets {
        query = query.with_target(&name, value);
    }
    for (chain, path) in file.pssm {
        query = query.with_pssm(&chain, path);
    }
    Ok(query)
}

/// Parses `27`, `-3` or `27B` into a residue position.
fn parse_locus(residue: &FileResidue) -> std::result::Result<ResidueLocus, String> {
    let text = match residue {
        FileResidue::Number(number) => return Ok(ResidueLocus::from(*number)),
        FileResidue::Text(text) => text.trim(),
    };

    let (digits, insertion_code) = match text.chars().last() {
        Some(last) if last.is_ascii_alphabetic() => (&text[..text.len() - 1], Some(last)),
        _ => (text, None),
    };
    let number = digits
        .parse::<i32>()
        .map_err(|_| format!("Invalid residue position '{text}'. Expected e.g. '27' or '27B'."))?;
    Ok(ResidueLocus::new(number, insertion_code))
}

/// Accepts one-letter (`K`) or three-letter (`LYS`) codes, in any case.
fn parse_amino_acid(code: &str) -> std::result::Result<&'static AminoAcid, String> {
    let code = code.trim();
    let mut chars = code.chars();
    let found = match (chars.next(), chars.next()) {
        (Some(letter), None) => AminoAcid::from_one_letter_code(letter),
        _ => AminoAcid::from_three_letter_code(&code.to_ascii_uppercase()),
    };
    found.ok_or_else(|| format!("Unknown amino acid '{code}'"))
}

fn apply_set_values(mut config: FileManifest, set_values: &[String]) -> Result<FileManifest> {
    if set_values.is_empty() {
        return Ok(config);
    }
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        let settings = &mut config.settings;
        match key {
            "settings.output-prefix" => {
                settings.output_prefix = Some(PathBuf::from(value_str));
            }
            "settings.workers" => {
                settings.workers = Some(value_str.parse().map_err(|_| {
                    CliError::Config(format!("Invalid integer value for {}: {}", key, value_str))
                })?);
            }
            "settings.combine-output" => {
                settings.combine_output = Some(value_str.parse().map_err(|_| {
                    CliError::Config(format!("Invalid boolean value for {}: {}", key, value_str))
                })?);
            }
            "settings.query-timeout-secs" => {
                settings.query_timeout_secs = Some(value_str.parse().map_err(|_| {
                    CliError::Config(format!("Invalid integer value for {}: {}", key, value_str))
                })?);
            }
            "settings.features" => {
                settings.features = Some(
                    value_str
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect(),
                );
            }
            "settings.warn-duplicates" => {
                settings.warn_duplicates = Some(value_str.parse().map_err(|_| {
                    CliError::Config(format!("Invalid boolean value for {}: {}", key, value_str))
                })?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
