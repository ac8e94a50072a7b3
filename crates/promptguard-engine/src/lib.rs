//! # promptguard-engine
//!
//! Detection and transformation engine: scanner, AST providers, the
//! declarative shape matcher, detectors, transformer, analysis pipeline,
//! env scanner, and the orchestrator that drives init/apply/disable/enable/revert.

pub mod detectors;
pub mod envscan;
pub mod errors;
pub mod orchestrator;
pub mod parsers;
pub mod patterns;
pub mod pipeline;
pub mod scanner;
pub mod transform;

pub use orchestrator::{InitOptions, Orchestrator, RevertOptions};
