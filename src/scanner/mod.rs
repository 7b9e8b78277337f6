//! Module source scanner for finding imports

mod classify;
mod python;
mod stdlib;

pub use classify::{Classifier, ImportClass};
pub use python::{ExtractError, PythonImport, PythonImportParser};
pub use stdlib::is_stdlib;

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::ScanSettings;
use crate::domain::{ImportSet, Module, normalize_name};
use crate::error::ErrorKind;
use crate::workspace::ModuleRegistry;

/// Result of scanning one module's sources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Internal and external imports, minus the module itself
    pub imports: ImportSet,

    /// Standard library modules used (top-level names)
    pub stdlib: BTreeSet<String>,

    /// Relative import targets (`.`, `..pkg`)
    pub local: BTreeSet<String>,

    pub files_scanned: usize,

    /// Files that were skipped because they could not be read or parsed
    pub issues: Vec<ScanIssue>,
}

/// A file the scanner could not use
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanIssue {
    /// Path relative to the module root
    pub path: PathBuf,
    pub kind: ErrorKind,
    pub message: String,
}

/// Scans module directories and classifies what they import
pub struct ImportScanner {
    classifier: Classifier,
    exclude_patterns: GlobSet,
    extensions: Vec<String>,
}

impl ImportScanner {
    /// Create a scanner that classifies against the modules of `registry`
    pub fn new(registry: &ModuleRegistry, settings: &ScanSettings) -> Self {
        Self::with_classifier(Classifier::new(registry.known_names(), settings), settings)
    }

    pub fn with_classifier(classifier: Classifier, settings: &ScanSettings) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in &settings.exclude {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => warn!("Ignoring invalid exclude pattern '{}': {}", pattern, e),
            }
        }

        Self {
            classifier,
            exclude_patterns: builder.build().unwrap_or_else(|_| GlobSet::empty()),
            extensions: settings
                .source_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Scan a module's directory. Never fails; unusable files become issues.
    pub fn scan(&self, module: &Module) -> ScanReport {
        self.scan_dir(&module.root_path, Some(&module.name))
    }

    /// Scan an arbitrary directory, dropping imports of `self_name`
    pub fn scan_dir(&self, root: &Path, self_name: Option<&str>) -> ScanReport {
        let mut report = ScanReport::default();
        let self_name = self_name.map(normalize_name);

        let mut parser = match PythonImportParser::new() {
            Ok(parser) => parser,
            Err(e) => {
                warn!("Cannot scan {}: {}", root.display(), e);
                report.issues.push(ScanIssue {
                    path: PathBuf::new(),
                    kind: ErrorKind::ParseError,
                    message: e.to_string(),
                });
                return report;
            }
        };

        let excludes = self.exclude_patterns.clone();
        let walker = WalkBuilder::new(root)
            .hidden(true)
            .parents(false)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                entry.depth() == 0 || !excludes.is_match(entry.file_name())
            })
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) || !self.is_source(path) {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();

            let source = match std::fs::read_to_string(path) {
                Ok(source) => source,
                Err(e) => {
                    let kind = if e.kind() == io::ErrorKind::InvalidData {
                        ErrorKind::ParseError
                    } else {
                        ErrorKind::IoError
                    };
                    warn!("Skipping {}: {}", path.display(), e);
                    report.issues.push(ScanIssue {
                        path: relative,
                        kind,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            match parser.extract(&source) {
                Ok(imports) => {
                    report.files_scanned += 1;
                    for import in imports {
                        self.record(import, self_name.as_deref(), &mut report);
                    }
                }
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    report.issues.push(ScanIssue {
                        path: relative,
                        kind: ErrorKind::ParseError,
                        message: e.to_string(),
                    });
                }
            }
        }

        debug!(
            "Scanned {} file(s) in {}: {} internal, {} external",
            report.files_scanned,
            root.display(),
            report.imports.internal.len(),
            report.imports.external.len()
        );

        report
    }

    fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
    }

    fn record(&self, import: PythonImport, self_name: Option<&str>, report: &mut ScanReport) {
        match import {
            PythonImport::Relative(target) => {
                report.local.insert(target);
            }
            PythonImport::Module(dotted) => self.record_dotted(&dotted, self_name, report),
            PythonImport::From { module, names } => {
                // `from managers import config_manager` names the module itself
                if self.classifier.is_namespace(&module) && !names.is_empty() {
                    for name in names {
                        self.record_dotted(&format!("{}.{}", module, name), self_name, report);
                    }
                } else {
                    self.record_dotted(&module, self_name, report);
                }
            }
        }
    }

    fn record_dotted(&self, dotted: &str, self_name: Option<&str>, report: &mut ScanReport) {
        match self.classifier.classify(dotted) {
            ImportClass::Internal(name) => {
                if self_name != Some(name.as_str()) {
                    report.imports.internal.insert(name);
                }
            }
            ImportClass::External(name) => {
                report.imports.external.insert(name);
            }
            ImportClass::StandardLibrary => {
                let top = dotted.split('.').next().unwrap_or(dotted);
                report.stdlib.insert(top.to_string());
            }
            ImportClass::Namespace => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scanner(known: &[&str]) -> ImportScanner {
        let settings = ScanSettings::default();
        let known = known.iter().map(|s| s.to_string()).collect();
        ImportScanner::with_classifier(Classifier::new(known, &settings), &settings)
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn classifies_imports_across_files() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "session_manager.py",
            "import os\nimport yaml\nfrom managers import config_manager\nfrom . import helpers\n",
        );
        write(
            tmp.path(),
            "sub/worker.py",
            "from logger_util import get_logger\nimport requests\n",
        );
        write(tmp.path(), "notes.txt", "import not_python\n");

        let report = scanner(&["logger_util", "config_manager"]).scan_dir(tmp.path(), None);

        assert_eq!(report.files_scanned, 2);
        assert_eq!(
            report.imports.internal,
            ["config_manager", "logger_util"].iter().map(|s| s.to_string()).collect()
        );
        assert_eq!(
            report.imports.external,
            ["pyyaml", "requests"].iter().map(|s| s.to_string()).collect()
        );
        assert!(report.stdlib.contains("os"));
        assert!(report.local.contains("."));
        assert!(report.issues.is_empty());
    }

    #[test]
    fn self_imports_are_dropped() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "core.py",
            "from managers.session_manager import api\nimport managers.other_manager\n",
        );

        let report = scanner(&[]).scan_dir(tmp.path(), Some("Session_Manager"));

        assert_eq!(
            report.imports.internal,
            ["other_manager"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn excluded_directories_are_skipped() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "main.py", "import rich\n");
        write(tmp.path(), ".venv/lib/site.py", "import venv_only\n");
        write(tmp.path(), "build/lib/copy.py", "import build_only\n");
        write(tmp.path(), "__pycache__/main.py", "import cache_only\n");

        let report = scanner(&[]).scan_dir(tmp.path(), None);

        assert_eq!(report.files_scanned, 1);
        assert_eq!(
            report.imports.external,
            ["rich"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn broken_files_become_issues() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "good.py", "import click\n");
        write(tmp.path(), "bad.py", "import flask\ndef oops(:\n");
        fs::write(tmp.path().join("binary.py"), [0xff, 0xfe, 0x00, 0x9f]).unwrap();

        let report = scanner(&[]).scan_dir(tmp.path(), None);

        assert_eq!(report.files_scanned, 1);
        assert_eq!(
            report.imports.external,
            ["click"].iter().map(|s| s.to_string()).collect()
        );
        let paths: Vec<_> = report.issues.iter().map(|i| i.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("bad.py"), PathBuf::from("binary.py")]);
        assert!(report.issues.iter().all(|i| i.kind == ErrorKind::ParseError));
    }

    #[test]
    fn scanning_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.py", "import numpy\nfrom utils import logger_util\n");
        write(tmp.path(), "b/c.py", "import json\nimport PIL.Image\n");

        let scanner = scanner(&[]);
        assert_eq!(
            scanner.scan_dir(tmp.path(), None),
            scanner.scan_dir(tmp.path(), None)
        );
    }
}
