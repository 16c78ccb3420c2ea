//! Shared fixtures and fake external tools for integration tests.
//!
//! The real merge tool and converter are replaced by small shell scripts:
//! - the fake merge tool drops `-s` and concatenates its inputs to stdout
//! - the fake converter writes the number of entries of its `--bibliography`
//!   into its `-o` file and appends the bibliography path to a log file

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Three entries from 2021 and one from 2020.
pub const FIRST_BIB: &str = r#"@article{alpha2021,
  author = {Alpha, Ann},
  title = {First Article},
  journal = {Journal of Tests},
  year = {2021}
}

@inproceedings{beta2021,
  author = {Beta, Bob},
  title = {A Conference Paper},
  booktitle = {Proceedings of Testing},
  year = {2021}
}

@misc{gamma2021,
  author = {Gamma, Gus},
  title = {A Preprint},
  year = 2021
}

@article{delta2020,
  author = {Delta, Dora},
  title = {Older Article},
  journal = {Journal of Tests},
  year = {2020}
}
"#;

/// One entry from 2021, with LaTeX-escaped accents.
pub const SECOND_BIB: &str = r#"@article{jegou2021,
  author = {J{\'e}gou, Herv{\'e} and M\"{u}ller, J\"org},
  title = {Radioactive Data},
  journal = {Journal of Tests},
  year = {2021}
}
"#;

/// An entry with no year at all.
pub const UNDATED_BIB: &str = r#"@misc{undated,
  author = {Nobody, N.},
  title = {Timeless}
}
"#;

/// Paths of the fake tools installed in a test directory.
pub struct FakeTools {
    pub merge: PathBuf,
    pub render: PathBuf,
    /// One line per converter run: the bibliography it was given.
    pub render_log: PathBuf,
}

impl FakeTools {
    /// Bibliographies handed to the converter so far, one per run.
    pub fn render_calls(&self) -> Vec<String> {
        fs::read_to_string(&self.render_log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

#[cfg(unix)]
fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    fs::write(path, body).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

/// Installs the fake merge tool and converter into `dir`.
#[cfg(unix)]
pub fn install_fake_tools(dir: &Path) -> FakeTools {
    let merge = dir.join("fake-bibtool");
    write_script(
        &merge,
        "#!/bin/sh\n[ \"$1\" = \"-s\" ] && shift\ncat \"$@\"\n",
    );

    let render_log = dir.join("render.log");
    let render = dir.join("fake-pandoc");
    write_script(
        &render,
        &format!(
            r#"#!/bin/sh
out=""
bib=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    --bibliography=*) bib="${{1#--bibliography=}}"; shift ;;
    *) shift ;;
  esac
done
echo "$bib" >> "{log}"
printf '%s entries\n' "$(grep -c '^@' "$bib")" > "$out"
"#,
            log = render_log.display()
        ),
    );

    FakeTools {
        merge,
        render,
        render_log,
    }
}

/// Installs a merge tool that always fails with exit code 3.
#[cfg(unix)]
pub fn install_failing_merge(dir: &Path) -> PathBuf {
    let path = dir.join("failing-bibtool");
    write_script(&path, "#!/bin/sh\necho 'bibtool: broken' >&2\nexit 3\n");
    path
}

/// Writes `content` to `dir/name` and returns the path.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Count of entries in a BibTeX file.
pub fn entry_count(path: &Path) -> usize {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| l.starts_with('@'))
        .count()
}

/// Names of all files in `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

/// The single run directory under `build_root`.
pub fn only_run_dir(build_root: &Path) -> PathBuf {
    let runs: Vec<PathBuf> = fs::read_dir(build_root)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(runs.len(), 1, "expected exactly one run dir: {:?}", runs);
    runs.into_iter().next().unwrap()
}
