//! BibTeX loading.
//!
//! Entries are read with the `biblatex` crate's raw parser. Field values keep
//! their source text, LaTeX commands included, so that the per-record
//! customization hook sees exactly what the file says. Duplicate citation keys
//! are kept as separate entries.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use biblatex::{Pair, RawBibliography, RawChunk, Spanned};
use tracing::debug;

use crate::error::Error;

/// One bibliographic record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The citation key (e.g. "doe2021").
    pub key: String,
    /// Lower-case entry type (e.g. "article").
    pub entry_type: String,
    /// Lower-case field names mapped to BibTeX-ready values, without the
    /// outer delimiters.
    pub fields: BTreeMap<String, String>,
}

impl Entry {
    pub fn new(key: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Entry {
            key: key.into(),
            entry_type: entry_type.into().to_lowercase(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field, lower-casing its name.
    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// An ordered collection of entries loaded from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bibliography {
    entries: Vec<Entry>,
}

impl Bibliography {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.key == key)
    }
}

impl From<Vec<Entry>> for Bibliography {
    fn from(entries: Vec<Entry>) -> Self {
        Bibliography { entries }
    }
}

impl FromIterator<Entry> for Bibliography {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Bibliography {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Bibliography {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A record customization applied to every parsed entry.
pub type Customization = fn(Entry) -> Entry;

/// BibTeX parser with an optional record customization hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct BibParser {
    customization: Option<Customization>,
}

impl BibParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customization(mut self, customization: Customization) -> Self {
        self.customization = Some(customization);
        self
    }

    /// Parses BibTeX source text.
    ///
    /// `@string` abbreviations are expanded and `#` concatenations joined.
    /// Bare words with no matching `@string` (month names) are kept as written.
    ///
    /// # Errors
    ///
    /// Returns the parser's message when the text is not well-formed BibTeX.
    pub fn parse(&self, src: &str) -> Result<Bibliography, String> {
        let raw = RawBibliography::parse(src).map_err(|e| e.to_string())?;

        let bibliography = raw
            .entries
            .iter()
            .map(|spanned| {
                let record = &spanned.v;
                let fields = record
                    .fields
                    .iter()
                    .map(|pair| {
                        let value = field_text(&pair.value.v, &raw.abbreviations);
                        (pair.key.v.to_lowercase(), value)
                    })
                    .collect();
                let entry = Entry {
                    key: record.key.v.to_string(),
                    entry_type: record.kind.v.to_lowercase(),
                    fields,
                };
                match self.customization {
                    Some(customize) => customize(entry),
                    None => entry,
                }
            })
            .collect();

        Ok(bibliography)
    }

    /// Reads and parses a BibTeX file.
    pub fn load(&self, path: &Path) -> Result<Bibliography, Error> {
        let src = fs::read_to_string(path)
            .map_err(|e| Error::fs("cannot read bibliography", path, e))?;
        let bibliography = self.parse(&src).map_err(|message| Error::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        debug!(path = %path.display(), entries = bibliography.len(), "loaded bibliography");
        Ok(bibliography)
    }
}

/// Joins the pieces of a raw field value into one line of BibTeX text.
///
/// An abbreviation only resolves against `@string`s defined before the one
/// being expanded, so self-references terminate.
fn field_text(value: &[Spanned<RawChunk<'_>>], abbreviations: &[Pair<'_>]) -> String {
    let mut out = String::new();
    for chunk in value {
        match &chunk.v {
            RawChunk::Normal(text) => out.push_str(text),
            RawChunk::Abbreviation(name) => {
                let found = abbreviations
                    .iter()
                    .rposition(|abbr| abbr.key.v.eq_ignore_ascii_case(name));
                match found {
                    Some(i) => out.push_str(&field_text(
                        &abbreviations[i].value.v,
                        &abbreviations[..i],
                    )),
                    None => out.push_str(name),
                }
            }
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
@article{doe2021,
  author = {Doe, John},
  title = {A Study of Things},
  journal = {Journal of Stuff},
  year = {2021}
}

@book{roe2020,
  author = {Roe, Richard},
  title = {Collected Things},
  publisher = {Things Press},
  year = 2020
}
"#;

    fn create_temp_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_entries_in_order() {
        // Given: two well-formed entries
        // When: we parse them
        let bib = BibParser::new().parse(SAMPLE).unwrap();

        // Then: both come back in source order with their types and keys
        assert_eq!(bib.len(), 2);
        assert_eq!(bib.entries()[0].key, "doe2021");
        assert_eq!(bib.entries()[0].entry_type, "article");
        assert_eq!(bib.entries()[1].key, "roe2020");
        assert_eq!(bib.entries()[1].entry_type, "book");
    }

    #[test]
    fn test_parse_braced_and_bare_years() {
        let bib = BibParser::new().parse(SAMPLE).unwrap();

        assert_eq!(bib.get("doe2021").unwrap().get("year"), Some("2021"));
        assert_eq!(bib.get("roe2020").unwrap().get("year"), Some("2020"));
    }

    #[test]
    fn test_parse_keeps_plain_field_text() {
        let bib = BibParser::new().parse(SAMPLE).unwrap();

        let entry = bib.get("doe2021").unwrap();
        assert_eq!(entry.get("title"), Some("A Study of Things"));
        assert_eq!(entry.get("journal"), Some("Journal of Stuff"));
    }

    #[test]
    fn test_parse_empty_source() {
        let bib = BibParser::new().parse("").unwrap();
        assert!(bib.is_empty());
    }

    #[test]
    fn test_parse_malformed_source_fails() {
        let result = BibParser::new().parse("@article{broken,\n  title = {Unclosed\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_customization_runs_for_every_entry() {
        fn tag(mut entry: Entry) -> Entry {
            entry.fields.insert("note".to_string(), "seen".to_string());
            entry
        }

        let bib = BibParser::new().with_customization(tag).parse(SAMPLE).unwrap();

        assert!(bib.iter().all(|e| e.get("note") == Some("seen")));
    }

    #[test]
    fn test_load_reports_missing_file_as_filesystem_error() {
        let err = BibParser::new()
            .load(Path::new("/nonexistent/path/merged.bib"))
            .unwrap_err();
        assert!(matches!(err, Error::Filesystem { .. }), "{:?}", err);
    }

    #[test]
    fn test_load_reports_bad_syntax_as_parse_error() {
        let file = create_temp_file("@article{broken,\n  title = {Unclosed\n");

        let err = BibParser::new().load(file.path()).unwrap_err();

        match err {
            Error::Parse { path, .. } => assert_eq!(path, file.path()),
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_keys_are_kept() {
        // Given: the same key twice, as merging two files can produce
        let src = "@article{same2021, title = {First}, year = {2021}}\n\
                   @misc{same2021, title = {Second}, year = {2020}}\n";

        // When: we parse
        let bib = BibParser::new().parse(src).unwrap();

        // Then: both entries survive, in source order
        assert_eq!(bib.len(), 2);
        assert_eq!(bib.entries()[0].get("title"), Some("First"));
        assert_eq!(bib.entries()[1].get("title"), Some("Second"));
    }

    #[test]
    fn test_latex_commands_kept_verbatim() {
        let src = r#"@article{k, author = {Mart{\'\i}nez, Ana and M\"{u}ller, J.}, note = {Smith \& Sons}}"#;

        let bib = BibParser::new().parse(src).unwrap();

        let entry = bib.get("k").unwrap();
        assert_eq!(entry.get("author"), Some(r#"Mart{\'\i}nez, Ana and M\"{u}ller, J."#));
        assert_eq!(entry.get("note"), Some(r"Smith \& Sons"));
    }

    #[test]
    fn test_quoted_values_and_concatenation() {
        let src = "@string{jt = {Journal of Tests}}\n\
                   @article{k, journal = jt # { Letters}, title = \"Quoted {Title}\", month = jan}";

        let bib = BibParser::new().parse(src).unwrap();

        let entry = bib.get("k").unwrap();
        assert_eq!(entry.get("journal"), Some("Journal of Tests Letters"));
        assert_eq!(entry.get("title"), Some("Quoted {Title}"));
        assert_eq!(entry.get("month"), Some("jan"));
    }

    #[test]
    fn test_multiline_values_collapse_to_one_line() {
        let src = "@misc{k, title = {A title\n    spread over\n    lines}}";

        let bib = BibParser::new().parse(src).unwrap();

        assert_eq!(
            bib.get("k").unwrap().get("title"),
            Some("A title spread over lines")
        );
    }

    #[test]
    fn test_self_referencing_string_terminates() {
        let src = "@string{loop = loop}\n@misc{k, note = loop}";

        let bib = BibParser::new().parse(src).unwrap();

        assert_eq!(bib.get("k").unwrap().get("note"), Some("loop"));
    }

    #[test]
    fn test_entry_builder_lowercases() {
        let entry = Entry::new("k", "Article").with_field("YEAR", "2021");
        assert_eq!(entry.entry_type, "article");
        assert_eq!(entry.get("year"), Some("2021"));
    }
}
