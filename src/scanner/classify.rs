//! Import classification against the module registry

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::stdlib;
use crate::config::ScanSettings;
use crate::domain::normalize_name;

/// Where an import comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", content = "name", rename_all = "snake_case")]
pub enum ImportClass {
    /// A workspace module, by normalized name
    Internal(String),
    /// A third-party package, by normalized distribution name
    External(String),
    StandardLibrary,
    /// A bare namespace package such as `managers`, naming no module
    Namespace,
}

/// Classifies dotted import names.
///
/// Rules, in order:
/// 1. the top-level segment is a registered module name -> internal
/// 2. the top-level segment is a namespace prefix (`managers`, ...) -> the
///    next segment is the internal module name
/// 3. the top-level segment is in the standard library table -> stdlib
/// 4. anything else is external, mapped through the alias table
#[derive(Debug, Clone)]
pub struct Classifier {
    known_modules: BTreeSet<String>,
    prefixes: BTreeSet<String>,
    aliases: BTreeMap<String, String>,
    stdlib_extra: HashSet<String>,
}

impl Classifier {
    pub fn new(known_modules: BTreeSet<String>, settings: &ScanSettings) -> Self {
        Self {
            known_modules,
            prefixes: settings.internal_prefixes.iter().cloned().collect(),
            aliases: settings.package_aliases.clone(),
            stdlib_extra: settings.stdlib_extra.iter().cloned().collect(),
        }
    }

    pub fn classify(&self, dotted: &str) -> ImportClass {
        let dotted = dotted.trim();
        let mut segments = dotted.split('.');
        let top = segments.next().unwrap_or_default();
        if top.is_empty() {
            return ImportClass::Namespace;
        }

        let top_normalized = normalize_name(top);
        if self.known_modules.contains(&top_normalized) {
            return ImportClass::Internal(top_normalized);
        }

        if self.prefixes.contains(top) {
            return match segments.next().filter(|s| !s.is_empty()) {
                Some(module) => ImportClass::Internal(normalize_name(module)),
                None => ImportClass::Namespace,
            };
        }

        if stdlib::is_stdlib(top) || self.stdlib_extra.contains(top) {
            return ImportClass::StandardLibrary;
        }

        ImportClass::External(self.distribution_name(dotted, top))
    }

    /// Whether `module` is exactly a namespace prefix, so that
    /// `from <module> import x` names the internal module `x`
    pub fn is_namespace(&self, module: &str) -> bool {
        self.prefixes.contains(module.trim())
    }

    /// Longest dotted prefix with an alias wins: `google.protobuf.x` -> `protobuf`
    fn distribution_name(&self, dotted: &str, top: &str) -> String {
        let mut candidate = dotted;
        loop {
            if let Some(dist) = self.aliases.get(candidate) {
                return normalize_name(dist);
            }
            match candidate.rfind('.') {
                Some(idx) => candidate = &candidate[..idx],
                None => break,
            }
        }
        normalize_name(top)
    }
}
