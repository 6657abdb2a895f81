//! # Orrery
//!
//! A snapshot ingestion and aggregation pipeline for org-wide content sites.
//!
//! Orrery pulls an organization's repository listing, materializes each
//! repository's tarball snapshot into a versioned on-disk cache, loads the
//! article markdown and JSON metadata from the current snapshot, and folds
//! everything into the derived indices a content site renders from:
//! category forest, tag index, contributor index, and difficulty buckets.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌────────────────┐
//! │  GitHub  │──▶│ SnapshotStore │──▶│ Loaders        │
//! │ org+tar  │   │ root/<r>/<v>/ │   │ meta + markup  │
//! └──────────┘   └───────────────┘   └───────┬────────┘
//!                                            ▼
//!                              ┌──────────────────────────┐
//!                              │ RepoRegistry (shared)    │
//!                              └──────┬──────────┬────────┘
//!                                     ▼          ▼
//!                              ┌────────────┐ ┌──────────┐
//!                              │ Aggregator │ │ Composer │
//!                              └────────────┘ └──────────┘
//! ```
//!
//! Aggregation runs strictly after all per-repository loading has settled
//! and rebuilds every index from scratch, so re-running the pipeline over
//! an unchanged registry yields structurally identical indices.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Pipeline error kinds |
//! | [`models`] | Repository record and metadata types |
//! | [`registry`] | Shared in-memory repository map |
//! | [`github`] | Org listing and tarball fetch |
//! | [`store`] | Versioned snapshot extraction |
//! | [`version`] | Current-version resolution |
//! | [`loader`] | Metadata and markup loading |
//! | [`difficulty`] | Difficulty classification |
//! | [`aggregate`] | Cross-repository index construction |
//! | [`compose`] | Article and index view composition |
//! | [`pipeline`] | Batch orchestration |

pub mod aggregate;
pub mod compose;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod github;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod store;
pub mod version;
