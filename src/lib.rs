//! bib2md: turn a collection of BibTeX files into a year-partitioned Markdown
//! publication list.
//!
//! The pipeline:
//! - merges the input files with an external merge tool (`bibtool`)
//! - parses the merged file, decoding LaTeX escapes to Unicode
//! - writes one bibliography per publication year, most recent first
//! - renders each with an external document converter (`pandoc`)

pub mod bibliography;
pub mod build_dir;
pub mod config;
pub mod error;
pub mod merge;
pub mod normalize;
pub mod output;
pub mod partition;
pub mod pipeline;
pub mod render;
pub mod tool;
pub mod writer;

pub use bibliography::{BibParser, Bibliography, Entry};
pub use build_dir::BuildDir;
pub use config::{Config, ConfigError, Layout};
pub use error::Error;
pub use merge::merge_bibtex;
pub use normalize::{convert_to_unicode, decode_latex};
pub use output::assemble_by_year;
pub use partition::{
    entry_year, extract_years, parse_bibtex, partition_bibtex, split_by_year, MissingYearPolicy,
    PartitionOutcome, YearPartition,
};
pub use pipeline::{run, RunReport};
pub use render::render_bibtex;
pub use tool::{Invocation, ToolError};
pub use writer::{BibWriter, EntryOrder};
