//! # Synthspace Core Library
//!
//! Search and optimization over synthon combinatorial spaces: virtual
//! product libraries defined by reactions whose positions are filled with
//! building-block fragments ("synthons") carrying labelled connectors.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (ids, fragment
//!   records, stores, hits), the chemistry capability traits every algorithm
//!   is written against, the fingerprint index and I/O for stores and run
//!   output.
//!
//! - **[`engine`]: The Logic Core.** Configuration and builders, errors,
//!   progress reporting, statistics, the parallel scheduler and the
//!   algorithm tasks: split matching, k-centers downsampling, seed finding
//!   and beam optimization.
//!
//! - **[`workflows`]: The Public API.** Complete runs that load inputs,
//!   schedule the tasks and persist results.
//!
//! [`logging`] sets up a `tracing` subscriber for embedding applications.

pub mod core;
pub mod engine;
pub mod logging;
pub mod workflows;

#[cfg(test)]
pub(crate) mod testing;
