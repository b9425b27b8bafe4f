//! # Engine Module
//!
//! This module implements the search and optimization machinery that runs on
//! top of a fragment store: split matching, downsampling, seed discovery and
//! local beam refinement, plus the scheduler that executes them in parallel.
//!
//! ## Overview
//!
//! Every algorithm in the engine is written against the chemistry capability
//! traits from [`crate::core::chem`] and receives its parameters through a
//! validated configuration value. Algorithms return immutable result values;
//! aggregation and I/O happen on a single collector thread owned by the
//! [`scheduler`].
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`], [`settings`]) - Validated builders and the TOML run file
//! - **Scheduling** ([`scheduler`]) - Per-run worker pool, completion queue and cancellation
//! - **Beam State** ([`state`]) - Candidate ranking and the working beam
//! - **Statistics** ([`stats`]) - Seed-finder counters and downsampling totals
//! - **Progress Monitoring** ([`progress`]) - Progress reporting for embedding applications
//! - **Error Handling** ([`error`]) - Engine-level error type wrapping every layer below
//! - **Tasks** ([`tasks`]) - The split matcher, downsampler, seed finder and beam optimizer
//!
//! ## Key Capabilities
//!
//! - **Reproducible randomness** through per-reaction and per-job RNG streams
//! - **Fail-fast parallelism** with a single wrapped error and retained partial output
//! - **Recoverable chemistry failures** that skip one record or attempt, never a run

pub mod config;
pub mod error;
pub mod progress;
pub mod scheduler;
pub mod settings;
pub mod state;
pub mod stats;
pub mod tasks;
pub(crate) mod utils;
