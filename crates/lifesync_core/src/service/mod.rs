//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate the entity store and persistence gateway into use-case APIs.
//! - Keep UI/FFI/CLI layers decoupled from storage details.

pub mod life_service;
