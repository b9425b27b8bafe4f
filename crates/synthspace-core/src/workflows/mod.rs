//! # Workflows Module
//!
//! High-level entry points that tie a fragment store, a chemistry toolkit,
//! the scheduler and the output writers together into complete runs.
//!
//! ## Overview
//!
//! Each workflow prepares its inputs, validates what can be validated up
//! front, reports progress through a [`ProgressReporter`](crate::engine::progress::ProgressReporter)
//! and persists its results.
//!
//! - **Seed search** ([`seed_search`]) - random assembly of every eligible
//!   reaction, filtered by property thresholds and shape similarity, with
//!   hits streamed to rotating TSV files.
//! - **Batch optimization** ([`optimize`]) - beam refinement of many seeds in
//!   parallel, one result row per seed.
//! - **Downsampling** ([`downsample`]) - reduces a persisted store to
//!   representative synthons and writes it back with provenance headers.
//! - **Search registry** ([`registry`]) - named substructure, similarity and
//!   remote search providers over one store.

pub mod downsample;
pub mod optimize;
pub mod registry;
pub mod seed_search;
