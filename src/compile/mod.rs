// src/compile/mod.rs

//! Turning change batches into regenerated outputs.
//!
//! - [`unit`] reduces a [`ChangeBatch`](crate::watch::ChangeBatch) to a
//!   [`CompileUnit`] (newest event per path wins).
//! - [`backend`] abstracts the external compiler so tests can swap in a fake;
//!   [`ProcessCompiler`] is the real one.
//! - [`invoker`] applies a unit: stale outputs are removed first, then the
//!   compiler runs once over everything left to compile.
//! - [`persistent`] owns a compiler running in its own watch mode.

pub mod backend;
pub mod invoker;
pub mod persistent;
pub mod unit;

pub use backend::{locate_compiler, CompileOutcome, CompileRequest, CompilerBackend, ProcessCompiler};
pub use invoker::{spawn_compile_worker, BatchCompiler, BatchReport};
pub use persistent::{PersistentCompiler, PersistentExit, PersistentSpec};
pub use unit::{CompileUnit, OutputMapper};
