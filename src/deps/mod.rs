//! Declared versus actual dependency comparison

use serde::Serialize;
use std::collections::BTreeSet;

use crate::domain::{ImportSet, Manifest, normalize_name};

/// Differences between what a module imports and what its manifest declares
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyFinding {
    pub module_name: String,

    /// Imported workspace modules the manifest does not declare
    pub missing_internal: BTreeSet<String>,

    /// Imported packages the manifest does not declare
    pub missing_external: BTreeSet<String>,

    /// Declared workspace modules that are never imported (advisory)
    pub unused_internal: BTreeSet<String>,

    /// Declared packages that are never imported (advisory)
    pub unused_external: BTreeSet<String>,
}

impl DependencyFinding {
    /// Nothing imported is undeclared. Unused declarations do not count.
    pub fn is_clean(&self) -> bool {
        self.missing_internal.is_empty() && self.missing_external.is_empty()
    }
}

/// Compare a module's imports with its manifest. Pure set arithmetic.
pub fn compare(module_name: &str, imports: &ImportSet, manifest: &Manifest) -> DependencyFinding {
    let internal = normalized(&imports.internal);
    let external = normalized(&imports.external);
    let declared_internal = normalized(&manifest.declared_internal);
    let declared_external = normalized(&manifest.external_names());

    DependencyFinding {
        module_name: module_name.to_string(),
        missing_internal: internal.difference(&declared_internal).cloned().collect(),
        missing_external: external.difference(&declared_external).cloned().collect(),
        unused_internal: declared_internal.difference(&internal).cloned().collect(),
        unused_external: declared_external.difference(&external).cloned().collect(),
    }
}

fn normalized(names: &BTreeSet<String>) -> BTreeSet<String> {
    names.iter().map(|n| normalize_name(n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn imports(internal: &[&str], external: &[&str]) -> ImportSet {
        ImportSet {
            internal: set(internal),
            external: set(external),
        }
    }

    #[test]
    fn reports_missing_and_unused() {
        let mut manifest = Manifest::default();
        manifest.declare_internal("logger_util");
        manifest.declare_internal("legacy_util");
        manifest.declare_external("PyYAML", Some(">=6".into()));
        manifest.declare_external("rich", None);

        let finding = compare(
            "session_manager",
            &imports(&["logger_util", "config_manager"], &["pyyaml", "requests"]),
            &manifest,
        );

        assert_eq!(finding.module_name, "session_manager");
        assert_eq!(finding.missing_internal, set(&["config_manager"]));
        assert_eq!(finding.missing_external, set(&["requests"]));
        assert_eq!(finding.unused_internal, set(&["legacy_util"]));
        assert_eq!(finding.unused_external, set(&["rich"]));
        assert!(!finding.is_clean());
    }

    #[test]
    fn empty_manifest_marks_everything_missing() {
        let finding = compare(
            "m",
            &imports(&["a_util"], &["numpy"]),
            &Manifest::default(),
        );
        assert_eq!(finding.missing_internal, set(&["a_util"]));
        assert_eq!(finding.missing_external, set(&["numpy"]));
        assert!(finding.unused_internal.is_empty());
        assert!(finding.unused_external.is_empty());
    }

    #[test]
    fn comparison_is_case_and_separator_insensitive() {
        let mut manifest = Manifest::default();
        manifest.declare_external("python-dateutil", None);

        let finding = compare("m", &imports(&[], &["Python_Dateutil"]), &manifest);

        assert!(finding.is_clean());
        assert!(finding.unused_external.is_empty());
    }

    #[test]
    fn unused_declarations_keep_finding_clean() {
        let mut manifest = Manifest::default();
        manifest.declare_internal("logger_util");

        let finding = compare("m", &ImportSet::default(), &manifest);

        assert!(finding.is_clean());
        assert_eq!(finding.unused_internal, set(&["logger_util"]));
    }

    #[test]
    fn set_algebra_partitions_imports() {
        let mut manifest = Manifest::default();
        for name in ["a", "b", "c"] {
            manifest.declare_internal(name);
        }
        let imported = imports(&["b", "c", "d", "e"], &[]);

        let finding = compare("m", &imported, &manifest);

        // Every import is either declared or missing, never both
        for name in &imported.internal {
            let declared = manifest.declared_internal.contains(name);
            assert_ne!(declared, finding.missing_internal.contains(name));
        }
        assert_eq!(finding.unused_internal, set(&["a"]));
    }
}
