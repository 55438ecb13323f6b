//! Public facade crate for `aptcache`.
//!
//! This crate intentionally contains no IO logic of its own. It re-exports
//! the backend-agnostic types/traits from `aptcache-core` and the
//! filesystem/reqwest engine from `aptcache-local` under one surface.

pub use aptcache_core::*;
pub use aptcache_local as engine;
