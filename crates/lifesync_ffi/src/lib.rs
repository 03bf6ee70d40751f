//! Flutter-facing bindings for the LifeSync engine.
//! Use-case functions live in `api`; the shared engine session in `session`.

pub mod api;
mod session;
