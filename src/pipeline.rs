//! The driver: build directory, then merge, partition and render, in order.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::build_dir::BuildDir;
use crate::config::{Config, Layout};
use crate::error::Error;
use crate::merge::merge_bibtex;
use crate::output::write_by_year;
use crate::partition::{parse_bibtex, partition_bibtex, YearPartition};
use crate::render::render_bibtex;
use crate::writer::BibWriter;

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub build_dir: PathBuf,
    pub inputs: Vec<PathBuf>,
    pub merged: PathBuf,
    /// Year partitions, most recent first (by-year layout only).
    pub partitions: Vec<YearPartition>,
    /// Normalized single bibliography (single layout only).
    pub parsed: Option<PathBuf>,
    /// Markdown files written by the converter, in render order.
    pub rendered: Vec<PathBuf>,
    /// The final Markdown document.
    pub output: PathBuf,
    /// Keys of entries left out for lack of a usable year.
    pub skipped: Vec<String>,
}

/// Every regular file directly inside `dir`, sorted by path.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let listing =
        fs::read_dir(dir).map_err(|e| Error::fs("cannot list input directory", dir, e))?;

    let mut inputs = Vec::new();
    for entry in listing {
        let entry = entry.map_err(|e| Error::fs("cannot list input directory", dir, e))?;
        let path = entry.path();
        if path.is_file() {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

/// The configured inputs, or every file in the input directory.
pub fn resolve_inputs(config: &Config) -> Result<Vec<PathBuf>, Error> {
    if !config.inputs.is_empty() {
        return Ok(config.inputs.clone());
    }
    let inputs = discover_inputs(&config.bib_root)?;
    if inputs.is_empty() {
        return Err(Error::NoInputs {
            dir: Some(config.bib_root.clone()),
        });
    }
    Ok(inputs)
}

/// Output names land inside the build directory, so only a single file
/// name component is accepted.
pub fn check_output_name(name: &str) -> Result<(), Error> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(Error::InvalidOutputName {
            name: name.to_string(),
        }),
    }
}

/// File name of the rendered Markdown for one year.
pub fn year_output_name(year: i32, output: &str) -> String {
    format!("{}{}", year, output)
}

/// Runs the whole pipeline. The first failure aborts the run; whatever the
/// build directory holds at that point stays there.
pub fn run(config: &Config) -> Result<RunReport, Error> {
    check_output_name(&config.output)?;
    let inputs = resolve_inputs(config)?;
    let build = BuildDir::create(&config.build_root)?;
    let _span = info_span!("run", build_dir = %build.path().display()).entered();
    info!(inputs = inputs.len(), layout = ?config.layout, "starting run");

    let merged = merge_bibtex(&inputs, build.path(), &config.merge)?;
    let writer = BibWriter::new(config.entry_order);

    let report = match config.layout {
        Layout::ByYear => {
            let outcome =
                partition_bibtex(&merged, build.path(), config.missing_year, &writer)?;
            if outcome.partitions.is_empty() {
                warn!("no dated entries; the output will be empty");
            }

            let mut rendered = Vec::with_capacity(outcome.partitions.len());
            for partition in &outcome.partitions {
                let name = year_output_name(partition.year, &config.output);
                rendered.push(render_bibtex(
                    &partition.path,
                    build.path(),
                    &name,
                    &config.render,
                )?);
            }

            let output = build.join(&config.output);
            let sections: Vec<(i32, &Path)> = outcome
                .partitions
                .iter()
                .zip(&rendered)
                .map(|(partition, path)| (partition.year, path.as_path()))
                .collect();
            write_by_year(&sections, &output)?;

            RunReport {
                build_dir: build.path().to_path_buf(),
                inputs,
                merged,
                partitions: outcome.partitions,
                parsed: None,
                rendered,
                output,
                skipped: outcome.skipped,
            }
        }
        Layout::Single => {
            let parsed = parse_bibtex(&merged, build.path(), &writer)?;
            let output = render_bibtex(&parsed, build.path(), &config.output, &config.render)?;

            RunReport {
                build_dir: build.path().to_path_buf(),
                inputs,
                merged,
                partitions: Vec::new(),
                parsed: Some(parsed),
                rendered: vec![output.clone()],
                output,
                skipped: Vec::new(),
            }
        }
    };

    info!(output = %report.output.display(), "run complete");
    Ok(report)
}
