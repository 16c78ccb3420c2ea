//! Rendering bibliographies to Markdown with the external document converter.
//!
//! The converter reads a fixed template document that cites the whole
//! bibliography and writes the formatted reference list as Markdown. The
//! template's content is supplied by the user.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Error;
use crate::tool::Invocation;

/// Markdown dialect produced: native divs, raw HTML and citation syntax off.
pub const MARKDOWN_FORMAT: &str = "markdown-native_divs-raw_html-citations";

/// Converter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Program name or path of the converter.
    pub program: String,
    /// Template document rendered for every bibliography.
    pub template: PathBuf,
    /// Citation filter passed as `--filter=`; `None` uses the converter's
    /// built-in `--citeproc` instead.
    pub citation_filter: Option<String>,
    /// Enable typographic quotes and dashes on both formats.
    pub smart: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            program: "pandoc".to_string(),
            template: PathBuf::from("skeleton.tex"),
            citation_filter: Some("pandoc-citeproc".to_string()),
            smart: true,
        }
    }
}

/// Converter invocation rendering `bibliography` into `output`.
pub fn render_invocation(bibliography: &Path, output: &Path, config: &RenderConfig) -> Invocation {
    let smart = if config.smart { "+smart" } else { "" };

    let citeproc = match config.citation_filter.as_deref() {
        Some(filter) if !filter.is_empty() => format!("--filter={}", filter),
        _ => "--citeproc".to_string(),
    };

    let mut bibliography_arg = std::ffi::OsString::from("--bibliography=");
    bibliography_arg.push(bibliography);

    Invocation::new(&config.program)
        .arg("-f")
        .arg(format!("latex{}", smart))
        .arg("-t")
        .arg(format!("{}{}", MARKDOWN_FORMAT, smart))
        .arg(citeproc)
        .arg(bibliography_arg)
        .arg("--wrap=none")
        .arg("-o")
        .arg(output)
        .arg(&config.template)
}

/// Renders `bibliography` to `build_dir/output_name` and returns its path.
///
/// # Errors
///
/// - [`Error::Filesystem`] when the template does not exist
/// - [`Error::ExternalTool`] when the converter is missing or exits non-zero
pub fn render_bibtex(
    bibliography: &Path,
    build_dir: &Path,
    output_name: &str,
    config: &RenderConfig,
) -> Result<PathBuf, Error> {
    fs::metadata(&config.template)
        .map_err(|e| Error::fs("cannot read template", &config.template, e))?;

    let output = build_dir.join(output_name);
    render_invocation(bibliography, &output, config).run()?;

    info!(
        bibliography = %bibliography.display(),
        output = %output.display(),
        "rendered markdown"
    );
    Ok(output)
}
