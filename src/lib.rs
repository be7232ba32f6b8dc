//! Purpose: Shared library crate used by the `lcwire` CLI and by API consumers.
//! Exports: `api` (stable surface), `core` (envelopes, promoters, partitioner, errors), `notice`.
//! Role: Decode polymorphic chat users and events from already-received JSON bytes.
//! Invariants: Decoding is pure and synchronous; no component holds mutable shared state.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
mod json;
pub mod notice;
