//! pyhf JSON format parser

mod build;
mod interp;
pub mod model;
pub mod schema;
pub mod simplemodels;
pub mod workspace_file;

#[cfg(test)]
mod tests;

pub use model::*;
pub use schema::*;
pub use workspace_file::*;
