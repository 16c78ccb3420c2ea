//! Merging input bibliographies with the external merge tool.
//!
//! The tool combines its inputs into one stream without deduplication;
//! duplicate keys pass through unmodified and its warnings are not inspected.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Error;
use crate::tool::Invocation;

/// File name of the merged bibliography inside the build directory.
pub const MERGED_FILE: &str = "merged.bib";

/// Merge tool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Program name or path of the merge tool.
    pub program: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            program: "bibtool".to_string(),
        }
    }
}

/// The merge tool invocation for `inputs`: `<tool> -s <inputs...>`.
pub fn merge_invocation(inputs: &[PathBuf], config: &MergeConfig) -> Invocation {
    Invocation::new(&config.program).arg("-s").args(inputs)
}

/// Every input must be an existing regular file.
fn check_inputs(inputs: &[PathBuf]) -> Result<(), Error> {
    for input in inputs {
        let meta = fs::metadata(input).map_err(|e| Error::fs("cannot read input", input, e))?;
        if !meta.is_file() {
            return Err(Error::fs(
                "input is not a regular file",
                input,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
    }
    Ok(())
}

/// Merges `inputs` into `build_dir/merged.bib` and returns its path.
///
/// # Errors
///
/// - [`Error::NoInputs`] when `inputs` is empty (the tool would read stdin)
/// - [`Error::Filesystem`] when an input is missing or the output cannot be created
/// - [`Error::ExternalTool`] when the tool is missing or exits non-zero
pub fn merge_bibtex(
    inputs: &[PathBuf],
    build_dir: &Path,
    config: &MergeConfig,
) -> Result<PathBuf, Error> {
    if inputs.is_empty() {
        return Err(Error::NoInputs { dir: None });
    }
    check_inputs(inputs)?;

    let merged = build_dir.join(MERGED_FILE);
    let file = File::create(&merged).map_err(|e| Error::fs("cannot create", &merged, e))?;
    merge_invocation(inputs, config).run_with_stdout(file)?;

    info!(inputs = inputs.len(), path = %merged.display(), "merged bibliographies");
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use tempfile::tempdir;

    #[test]
    fn test_merge_invocation_arguments() {
        let inputs = vec![PathBuf::from("bib/a.bib"), PathBuf::from("bib/b.bib")];

        let inv = merge_invocation(&inputs, &MergeConfig::default());

        assert_eq!(inv.program(), "bibtool");
        assert_eq!(
            inv.arguments(),
            &[
                OsString::from("-s"),
                OsString::from("bib/a.bib"),
                OsString::from("bib/b.bib")
            ]
        );
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let dir = tempdir().unwrap();

        let err = merge_bibtex(&[], dir.path(), &MergeConfig::default()).unwrap_err();

        assert!(matches!(err, Error::NoInputs { .. }), "{:?}", err);
        assert!(!dir.path().join(MERGED_FILE).exists());
    }

    #[test]
    fn test_missing_input_rejected_before_merging() {
        // Given: one input that does not exist
        let dir = tempdir().unwrap();
        let inputs = vec![dir.path().join("absent.bib")];

        // When: we merge
        let err = merge_bibtex(&inputs, dir.path(), &MergeConfig::default()).unwrap_err();

        // Then: it is a filesystem error and nothing was written
        assert!(matches!(err, Error::Filesystem { .. }), "{:?}", err);
        assert!(!dir.path().join(MERGED_FILE).exists());
    }

    #[test]
    fn test_directory_input_rejected() {
        let dir = tempdir().unwrap();
        let inputs = vec![dir.path().to_path_buf()];

        let err = merge_bibtex(&inputs, dir.path(), &MergeConfig::default()).unwrap_err();

        assert!(matches!(err, Error::Filesystem { .. }), "{:?}", err);
    }

    #[cfg(unix)]
    #[test]
    fn test_merge_captures_tool_stdout() {
        // `cat -s` squeezes blank lines, close enough to a merge for this test.
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.bib");
        let b = dir.path().join("b.bib");
        fs::write(&a, "@misc{a, year = {2020}}\n").unwrap();
        fs::write(&b, "@misc{b, year = {2021}}\n").unwrap();
        let config = MergeConfig {
            program: "cat".to_string(),
        };

        let merged = merge_bibtex(&[a, b], dir.path(), &config).unwrap();

        assert_eq!(merged, dir.path().join(MERGED_FILE));
        let text = fs::read_to_string(&merged).unwrap();
        assert!(text.contains("@misc{a"));
        assert!(text.contains("@misc{b"));
    }

    #[test]
    fn test_missing_tool_is_external_tool_error() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("a.bib");
        fs::write(&input, "@misc{a, year = {2020}}\n").unwrap();
        let config = MergeConfig {
            program: "bib2md-no-such-merge-tool".to_string(),
        };

        let err = merge_bibtex(&[input], dir.path(), &config).unwrap_err();

        assert!(matches!(err, Error::ExternalTool(_)), "{:?}", err);
    }
}
