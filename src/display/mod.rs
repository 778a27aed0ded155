//! Display module for turning collected state into report documents.
pub mod report;
pub use report::*;
