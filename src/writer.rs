//! BibTeX serialization.

use std::fs;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bibliography::{Bibliography, Entry};
use crate::error::Error;

/// Order in which entries are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EntryOrder {
    /// Grouped by entry type, alphabetically; input order within a type.
    #[default]
    EntryType,
    /// By citation key.
    Key,
    /// As loaded.
    Preserve,
}

/// Writes bibliographies back to BibTeX text.
#[derive(Debug, Clone)]
pub struct BibWriter {
    order: EntryOrder,
    indent: String,
}

impl Default for BibWriter {
    fn default() -> Self {
        BibWriter {
            order: EntryOrder::default(),
            indent: " ".to_string(),
        }
    }
}

impl BibWriter {
    pub fn new(order: EntryOrder) -> Self {
        BibWriter {
            order,
            ..Self::default()
        }
    }

    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    pub fn order(&self) -> EntryOrder {
        self.order
    }

    /// Serializes `bibliography`, fields alphabetically within each entry.
    pub fn write(&self, bibliography: &Bibliography) -> String {
        let mut entries: Vec<&Entry> = bibliography.iter().collect();
        match self.order {
            // Stable: entries of one type keep their input order.
            EntryOrder::EntryType => entries.sort_by(|a, b| a.entry_type.cmp(&b.entry_type)),
            EntryOrder::Key => entries.sort_by(|a, b| a.key.cmp(&b.key)),
            EntryOrder::Preserve => {}
        }

        let mut out = String::new();
        for entry in entries {
            self.write_entry(entry, &mut out);
        }
        out
    }

    fn write_entry(&self, entry: &Entry, out: &mut String) {
        out.push('@');
        out.push_str(&entry.entry_type);
        out.push('{');
        out.push_str(&entry.key);

        for (name, value) in &entry.fields {
            out.push_str(",\n");
            out.push_str(&self.indent);
            out.push_str(name);
            out.push_str(" = {");
            out.push_str(value);
            out.push('}');
        }
        out.push_str("\n}\n\n");
    }

    /// Serializes `bibliography` into the file at `path`.
    pub fn write_file(&self, bibliography: &Bibliography, path: &Path) -> Result<(), Error> {
        fs::write(path, self.write(bibliography))
            .map_err(|e| Error::fs("cannot write bibliography", path, e))?;
        debug!(path = %path.display(), entries = bibliography.len(), "wrote bibliography");
        Ok(())
    }
}
