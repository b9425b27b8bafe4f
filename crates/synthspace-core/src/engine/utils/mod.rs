//! Utility functions for the engine module.
//!
//! Deterministic seeding and sampling helpers shared by the downsampler, the
//! seed finder and the beam optimizer.

pub mod sampling;
