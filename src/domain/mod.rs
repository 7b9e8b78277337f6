//! Core domain types

pub mod manifest;
mod module;

pub use manifest::{Manifest, ManifestError, ManifestFile, Requirement, normalize_name};
pub use module::{ImportSet, Module, ModuleIssue};
