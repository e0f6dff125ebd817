//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into use-case level APIs.
//! - Keep the excluded HTTP/identity layers decoupled from storage details.

pub mod recommendation_service;
