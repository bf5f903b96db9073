//! External inputs consumed by the analysis core.
//!
//! Everything in this module is a description of what the core *consumes*
//! from its collaborators (an IR lifter, a CFG, an architecture descriptor),
//! not an implementation of any of them. See `ir`, `arch`, and `cfg`.

pub mod arch;
pub mod cfg;
pub mod ir;

pub use arch::Arch;
pub use cfg::{Cfg, CfgNode};
pub use ir::{Block, Expr, IrType, Jumpkind, Stmt};
