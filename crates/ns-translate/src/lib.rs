//! # ns-translate
//!
//! Format translators for NextStat.
//!
//! Reads pyhf JSON workspaces (bare or wrapped in a named container file) and
//! turns them into [`HistFactoryModel`]s for inference.

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod pyhf;

pub use pyhf::*;
