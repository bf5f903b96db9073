//! A context-sensitive, interprocedural live-variables analysis for
//! resolving indirect jumps in disassembled binaries.
//!
//! The core (`middle`) only ever consumes a caller-supplied CFG, IR
//! grammar, and architecture descriptor (`front`); it never lifts or
//! disassembles anything itself. See `src/bin/ctxlive.rs` for a
//! hand-built, CFG-free demonstration of wiring the pieces together.

pub mod back;
pub mod common;
pub mod front;
pub mod middle;
