//! Core building blocks shared by the cache and CMS modules: error types,
//! configuration and the per-request context.

pub mod config;
pub mod context;
pub mod error;
