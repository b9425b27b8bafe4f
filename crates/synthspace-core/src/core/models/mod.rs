//! # Core Models Module
//!
//! This module contains the data structures that describe a combinatorial
//! synthon space and the results computed over it.
//!
//! ## Overview
//!
//! A synthon space is a set of reactions, each with a handful of positions
//! ("frag types") that are filled with interchangeable fragments. The models
//! here are plain, immutable values:
//!
//! - [`ids`] - Reaction, fragment and frag-type identifiers
//! - [`fragment`] - Fragment records and connector configurations
//! - [`fingerprint`] - Packed structural fingerprints used for screening
//! - [`hit`] - Combinatorial hits produced by the split matcher
//! - [`assembly`] - Concrete assemblies, seed hits and optimization results
//!
//! ## Usage
//!
//! ```ignore
//! use synthspace::core::models::{fragment::FragmentRecord, ids::FragType};
//!
//! let record = FragmentRecord::new(FragType::new("amide", 0), "EN300-1", "1CC(=O)O")
//!     .with_price(12.0);
//! ```

pub mod assembly;
pub mod fingerprint;
pub mod fragment;
pub mod hit;
pub mod ids;
