//! Flutter-facing bindings for the pedigree core.

pub mod api;
