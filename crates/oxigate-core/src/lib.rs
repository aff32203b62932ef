//! Core building blocks shared by the Oxigate crates.
//!
//! - [`config`]: JSON config schema + loader with env overrides
//! - [`secrets`]: per-user secret store boundary
//! - [`headers`]: header-injection policy for outgoing upstream URLs
//! - [`types`]: chat message types used to build captioning bodies
//! - [`utils`]: path and URL helpers

pub mod config;
pub mod headers;
pub mod secrets;
pub mod types;
pub mod utils;
