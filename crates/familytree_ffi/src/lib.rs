//! Flutter-facing bindings over `familytree_core`.

pub mod api;
