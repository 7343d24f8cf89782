//! Domain model for notes.
//!
//! # Responsibility
//! - Define the canonical note record and its insert shape.
//! - Own input validation applied at the host boundary.
//!
//! # Invariants
//! - Every stored note is identified by a store-assigned `NoteId`.
//! - Deletion is a hard delete; reminders are cancelled separately.

pub mod note;
