//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into transaction-scoped use-cases.
//! - Keep HTTP/CLI layers decoupled from storage details.

pub mod sync_service;
