//! # Core Module
//!
//! This module provides the stateless building blocks of the synthon space
//! engine: the data model, the fragment store, the chemistry capability
//! interfaces and persistence.
//!
//! ## Architecture
//!
//! - **Data Model** ([`models`]) - Identifiers, fragment records, fingerprints, hits and assemblies
//! - **Fragment Store** ([`store`]) - The read-only reaction → position → records map
//! - **Fingerprint Index** ([`index`]) - Parsed records and screening fingerprints per position
//! - **Chemistry Capabilities** ([`chem`]) - Traits the embedding toolkit implements
//! - **Persistence** ([`io`]) - Store containers and rotating result writers
//!
//! ## Key Capabilities
//!
//! - **Immutable, thread-shareable stores** with a canonical iteration order
//! - **Toolkit-agnostic chemistry** through narrow capability traits
//! - **Crash-safe output** written row by row with optional file rotation

pub mod chem;
pub mod index;
pub mod io;
pub mod models;
pub mod store;
