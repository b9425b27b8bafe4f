//! The four algorithms of the engine.
//!
//! Each task is a plain function over shared, read-only inputs (a store, a
//! toolkit, a configuration) that returns an owned result value. Tasks never
//! write files or touch global state; the workflows decide how results are
//! scheduled, collected and persisted.

pub mod beam_search;
pub mod downsample;
pub mod seed_finder;
pub mod split_match;
