//! Diagnostics emitted for "lift gap" conditions (spec §7): an unimplemented
//! `Stmt`/`Expr` variant, or an SP/BP arithmetic pattern the transfer
//! function does not recognize. These are not errors — the affected
//! variable set is treated as empty and the analysis continues — but
//! callers may want to know what was approximated, so the driver
//! accumulates them rather than only logging through `log::warn!`.

use crate::common::Addr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// A statement or expression variant the transfer function does not
    /// implement; its effects were treated as empty.
    Unimplemented,
    /// A block failed to lift and was skipped (only when not `fail_fast`).
    SkippedBlock,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub addr: Option<Addr>,
}

impl Diagnostic {
    pub fn unimplemented(message: impl Into<String>, addr: Option<Addr>) -> Diagnostic {
        Diagnostic { severity: Severity::Unimplemented, message: message.into(), addr }
    }

    pub fn skipped_block(addr: Addr, reason: impl Into<String>) -> Diagnostic {
        Diagnostic { severity: Severity::SkippedBlock, message: reason.into(), addr: Some(addr) }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.addr {
            Some(addr) => write!(f, "[{:?}] 0x{:x}: {}", self.severity, addr, self.message),
            None => write!(f, "[{:?}] {}", self.severity, self.message),
        }
    }
}
