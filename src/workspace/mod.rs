//! Workspace module discovery
//!
//! The workspace module provides:
//! - ModuleRegistry: the modules of one workspace, discovered from disk

mod registry;

pub use registry::ModuleRegistry;
