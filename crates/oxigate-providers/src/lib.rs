//! Provider layer for Oxigate.
//!
//! Turns a provider-agnostic capability request into exactly one upstream
//! HTTP call and back.
//!
//! # Architecture
//!
//! - [`registry`]: static profiles for all 16 supported providers, one route per capability
//! - [`credential`]: secret or reverse-proxy password for a call
//! - [`transform`]: ordered, phase-checked body/header mutations per route
//! - [`normalizer`]: builds the [`request::UpstreamCall`] (URL, headers, body)
//! - [`dispatcher`]: sends it ([`dispatcher::Dispatch`] trait, `reqwest` implementation)
//! - [`extract`]: pulls the result out of the provider's response envelope
//! - [`error`]: the caller-facing error taxonomy

pub mod credential;
pub mod dispatcher;
pub mod error;
pub mod extract;
pub mod normalizer;
pub mod registry;
pub mod request;
pub mod transform;
pub mod upload;

// Re-export main types for convenience
pub use credential::Credential;
pub use dispatcher::{Dispatch, HttpDispatcher};
pub use error::GatewayError;
pub use normalizer::NormalizeContext;
pub use registry::{find_by_name, ProviderProfile, Route, PROVIDERS};
pub use request::{
    CanonicalRequest, Capability, CapabilityOutput, CustomDirectives, Payload, RawUpstreamResponse,
    Target, UpstreamBody, UpstreamCall,
};
pub use upload::AudioUpload;
