//! Year extraction and per-year partitioning of a merged bibliography.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::bibliography::{BibParser, Bibliography, Entry};
use crate::error::Error;
use crate::normalize::convert_to_unicode;
use crate::writer::BibWriter;

/// File name of the single-file variant's output.
pub const PARSED_FILE: &str = "parsed.bib";

/// What to do with an entry whose `year` is missing or not an integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MissingYearPolicy {
    /// Abort the run.
    #[default]
    Fail,
    /// Log a warning and leave the entry out of every partition.
    Skip,
}

/// One written year partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearPartition {
    pub year: i32,
    pub path: PathBuf,
    pub entries: usize,
}

/// Result of partitioning a merged file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartitionOutcome {
    /// Written partitions, most recent year first.
    pub partitions: Vec<YearPartition>,
    /// Keys of entries left out under [`MissingYearPolicy::Skip`].
    pub skipped: Vec<String>,
}

/// File name of the partition holding `year`.
pub fn partition_file_name(year: i32) -> String {
    format!("{}{}", year, PARSED_FILE)
}

/// Parses the `year` field of `entry` as an integer.
pub fn entry_year(entry: &Entry) -> Result<i32, Error> {
    let raw = entry.get("year").ok_or_else(|| Error::MissingField {
        key: entry.key.clone(),
        field: "year",
    })?;

    raw.trim()
        .trim_matches(|c| c == '{' || c == '}')
        .trim()
        .parse::<i32>()
        .map_err(|_| Error::InvalidYear {
            key: entry.key.clone(),
            value: raw.to_string(),
        })
}

/// Year of `entry` under `policy`: `Ok(None)` means the entry is skipped.
fn year_under_policy(entry: &Entry, policy: MissingYearPolicy) -> Result<Option<i32>, Error> {
    match (entry_year(entry), policy) {
        (Ok(year), _) => Ok(Some(year)),
        (Err(e), MissingYearPolicy::Skip) => {
            warn!(key = %entry.key, error = %e, "skipping entry without a usable year");
            Ok(None)
        }
        (Err(e), MissingYearPolicy::Fail) => Err(e),
    }
}

/// Distinct years of `bibliography`, most recent first.
pub fn extract_years(
    bibliography: &Bibliography,
    policy: MissingYearPolicy,
) -> Result<Vec<i32>, Error> {
    let mut years = BTreeSet::new();
    for entry in bibliography {
        if let Some(year) = year_under_policy(entry, policy)? {
            years.insert(year);
        }
    }
    Ok(years.into_iter().rev().collect())
}

/// Per-year split of a bibliography.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearSplit {
    /// One bibliography per distinct year, most recent first.
    pub years: Vec<(i32, Bibliography)>,
    /// Keys of entries without a usable year (skip policy only).
    pub skipped: Vec<String>,
}

/// Splits `bibliography` into one collection per distinct year.
///
/// Each collection holds exactly the entries of its year, in input order.
pub fn split_by_year(
    bibliography: &Bibliography,
    policy: MissingYearPolicy,
) -> Result<YearSplit, Error> {
    let mut dated: Vec<(i32, &Entry)> = Vec::with_capacity(bibliography.len());
    let mut skipped = Vec::new();
    for entry in bibliography {
        match year_under_policy(entry, policy)? {
            Some(year) => dated.push((year, entry)),
            None => skipped.push(entry.key.clone()),
        }
    }

    let distinct: BTreeSet<i32> = dated.iter().map(|(year, _)| *year).collect();
    let years = distinct
        .into_iter()
        .rev()
        .map(|year| {
            let entries: Bibliography = dated
                .iter()
                .filter(|(y, _)| *y == year)
                .map(|(_, entry)| (*entry).clone())
                .collect();
            (year, entries)
        })
        .collect();

    Ok(YearSplit { years, skipped })
}

fn unicode_parser() -> BibParser {
    BibParser::new().with_customization(convert_to_unicode)
}

/// Loads the merged file with Unicode normalization and writes one
/// `<year>parsed.bib` per distinct year into `build_dir`.
pub fn partition_bibtex(
    merged: &Path,
    build_dir: &Path,
    policy: MissingYearPolicy,
    writer: &BibWriter,
) -> Result<PartitionOutcome, Error> {
    let bibliography = unicode_parser().load(merged)?;
    let split = split_by_year(&bibliography, policy)?;

    let mut partitions = Vec::with_capacity(split.years.len());
    for (year, entries) in &split.years {
        let path = build_dir.join(partition_file_name(*year));
        writer.write_file(entries, &path)?;
        partitions.push(YearPartition {
            year: *year,
            path,
            entries: entries.len(),
        });
    }

    info!(
        years = partitions.len(),
        entries = bibliography.len(),
        skipped = split.skipped.len(),
        "partitioned bibliography by year"
    );

    Ok(PartitionOutcome {
        partitions,
        skipped: split.skipped,
    })
}

/// Loads the merged file with Unicode normalization and writes every entry
/// to `parsed.bib` in `build_dir`.
pub fn parse_bibtex(merged: &Path, build_dir: &Path, writer: &BibWriter) -> Result<PathBuf, Error> {
    let bibliography = unicode_parser().load(merged)?;
    let path = build_dir.join(PARSED_FILE);
    writer.write_file(&bibliography, &path)?;
    info!(entries = bibliography.len(), path = %path.display(), "normalized bibliography");
    Ok(path)
}
