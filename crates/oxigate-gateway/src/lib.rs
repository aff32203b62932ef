//! Oxigate gateway: capability endpoints over the provider layer.
//!
//! - [`gateway::Gateway`]: shared state and the caption / transcribe /
//!   speech / image / model-list operations
//! - [`api`]: caller request shapes and their canonical form
//! - [`router`]: axum routes under `/api/openai`
//! - [`serve`]: bind and run, returning a [`serve::ServeHandle`]

pub mod api;
pub mod gateway;
pub mod router;
pub mod serve;

pub use gateway::{Gateway, SpeechAudio};
pub use router::{router, ApiError, USER_HEADER};
pub use serve::{serve, serve_with_config, ServeHandle};
