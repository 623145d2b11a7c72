//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep bridge/UI layers decoupled from storage details.

pub mod person_service;
