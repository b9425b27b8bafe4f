//! Persistence for synthon stores and run output.
//!
//! Stores are exchanged as tab-separated containers ([`store_file`]). Run
//! output (seed hits, optimization results) is written through a rotating
//! TSV writer ([`tsv_writer`]) that is safe to share between threads.

pub mod hit_writer;
pub mod result_writer;
pub mod store_file;
pub mod tsv_writer;
