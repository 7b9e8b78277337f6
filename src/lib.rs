//! modscope - module introspection for multi-repository workspaces
//!
//! A workspace holds many small Python modules, each in its own directory
//! (and usually its own git repository) under a category folder such as
//! `managers/` or `utils/`. modscope answers three questions about them:
//!
//! 1. **What is there?** The [`workspace::ModuleRegistry`] discovers modules
//!    from their manifests.
//! 2. **Do declared dependencies match real imports?** The
//!    [`scanner::ImportScanner`] extracts imports with a real parser and
//!    [`deps::compare`] reconciles them with the manifest.
//! 3. **What is the git state across all of them?** The
//!    [`git::GitAggregator`] runs one action over many repositories with
//!    bounded concurrency and per-module isolation.
//!
//! The [`tools::ToolService`] bundles these as four tools, exposed by the
//! CLI and by a line-delimited JSON-RPC stdio [`server`].

pub mod config;
pub mod deps;
pub mod domain;
pub mod error;
pub mod git;
pub mod scaffold;
pub mod scanner;
pub mod server;
pub mod tools;
pub mod workspace;

pub use domain::*;
pub use error::{ErrorKind, ToolError};
