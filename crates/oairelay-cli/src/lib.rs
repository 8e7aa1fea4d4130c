//! Command-line front end for oairelay.
//!
//! Argument parsing and logging setup live here so they can be tested; the
//! binary only wires them together.

#![deny(unused_crate_dependencies)]

// Used by main.rs binary
use dotenvy as _;
use oairelay_axum as _;
use tokio as _;
use tokio_util as _;
use tracing as _;

pub mod logging;
pub mod parser;

pub use logging::init_tracing;
pub use parser::Cli;
