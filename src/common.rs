//! Common definitions shared across `front`, `middle`, and `back`.

// Use sorted maps and sets so that iteration order (and therefore Debug output
// and test fixtures) is deterministic regardless of hashing.
pub use std::collections::{BTreeMap as Map, BTreeSet as Set};

/// A byte address in the analyzed binary's address space.
pub type Addr = u64;

/// A byte offset. Used both for register-file offsets and frame-space offsets,
/// which may be negative relative to a function's entry-time stack pointer.
pub type Offset = i64;

pub use crate::back::error::{AnalysisError, AnalysisResult};
