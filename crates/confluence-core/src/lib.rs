//! # Confluence Core
//!
//! Filesystem-free logic for Confluence: the file record model, language
//! tags, content transforms, the prompt query model, relevance scoring,
//! ranking, and word-budget packing.
//!
//! This crate performs no filesystem or process I/O. The application crate
//! walks directories, loads bytes, and drives the worker pool; everything it
//! hands to the pool or gets back from it is defined here.

pub mod error;
pub mod keywords;
pub mod language;
pub mod models;
pub mod pack;
pub mod query;
pub mod rank;
pub mod score;
pub mod snippet;
pub mod transform;

pub use error::CoreError;
