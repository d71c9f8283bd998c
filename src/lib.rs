//! Topoforge: three-tier cloud topology generation.
//!
//! One declarative config in; a validated resource graph and a
//! dependency-ordered, fingerprinted manifest out.

pub mod cli;
pub mod core;
pub mod resources;
