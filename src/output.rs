//! Final document assembly.
//!
//! In the by-year layout every partition is rendered on its own; this module
//! joins those Markdown bodies into one publication list with a heading per
//! year.

use std::fs;
use std::path::Path;

use crate::error::Error;

/// Heading prefix put in front of each year.
pub const YEAR_HEADING: &str = "##";

/// Joins `(year, markdown)` sections, in the given order, under year headings.
///
/// Sections whose body is empty still get their heading so that a year with
/// entries never silently disappears from the list.
pub fn assemble_by_year(sections: &[(i32, String)]) -> String {
    let mut output = String::new();

    for (year, body) in sections {
        if !output.is_empty() {
            output.push_str("\n\n");
        }
        output.push_str(YEAR_HEADING);
        output.push(' ');
        output.push_str(&year.to_string());

        let body = body.trim();
        if !body.is_empty() {
            output.push_str("\n\n");
            output.push_str(body);
        }
    }

    if !output.is_empty() {
        output.push('\n');
    }
    output
}

/// Reads rendered per-year files and writes the assembled document to `output`.
pub fn write_by_year(rendered: &[(i32, &Path)], output: &Path) -> Result<(), Error> {
    let mut sections = Vec::with_capacity(rendered.len());
    for (year, path) in rendered {
        let body = fs::read_to_string(path)
            .map_err(|e| Error::fs("cannot read rendered markdown", *path, e))?;
        sections.push((*year, body));
    }

    fs::write(output, assemble_by_year(&sections))
        .map_err(|e| Error::fs("cannot write output", output, e))
}
