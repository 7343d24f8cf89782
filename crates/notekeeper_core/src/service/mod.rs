//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate note store writes and reminder scheduling.
//! - Keep host layers decoupled from storage details.

pub mod note_service;
