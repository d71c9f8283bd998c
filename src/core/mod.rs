//! Core topology logic: types, parsing, graph construction, ordering, emission.

pub mod builder;
pub mod emitter;
pub mod error;
pub mod fingerprint;
pub mod graph;
pub mod parser;
pub mod resolver;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;
