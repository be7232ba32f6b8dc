//! Purpose: Internal JSON parsing boundary shared by the decode entry points.
//! Exports: `parse` module with decode helpers used by envelope, chat, and CLI code.
//! Role: Single seam for parser details so callsites avoid ad hoc decode logic.
//! Invariants: Caller-supplied bytes are decoded through this module only.
//! Invariants: Helper APIs stay small and deterministic (no hidden global state).

pub(crate) mod parse;
