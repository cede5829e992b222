//! # Confluence
//!
//! Select, normalise, score and pack the files of a project tree into a
//! bounded context bundle for an LLM prompt.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────────────┐   ┌──────────┐   ┌────────┐
//! │  Rules   │──▶│ Worker pool (per file):   │──▶│   Rank   │──▶│  Pack  │
//! │  (walk)  │   │ load → transform → score  │   │          │   │        │
//! └──────────┘   └───────────────────────────┘   └──────────┘   └───┬────┘
//!                                                                     ▼
//!                                                         JSON report + flat text
//! ```
//!
//! Filesystem-free logic (record model, transforms, query model, scoring,
//! ranking, packing) lives in the `confluence-core` crate; this crate does
//! the I/O and orchestration.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and validation |
//! | [`rules`] | Presets, discovery rules, directory walk |
//! | [`loader`] | Size limits, binary sniffing, encoding detection |
//! | [`executor`] | Per-file task pipeline and worker pool |
//! | [`pipeline`] | End-to-end run and run summary |
//! | [`report`] | JSON report and flat text output |
//! | [`progress`] | Progress events on stderr |

pub mod config;
pub mod executor;
pub mod loader;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod rules;

pub use confluence_core as core;
