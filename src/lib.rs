//! Conversational onboarding core for a small-business dashboard.
//!
//! Covers the session/identity lifecycle, the progressive OTP sign-in
//! flow, business-fact extraction with a dynamic question queue, and the
//! streaming chat protocol that ties them together.

pub mod chat;
pub mod config;
pub mod controller;
pub mod error;
pub mod llm;
pub mod onboarding;
pub mod otp;
pub mod session;
pub mod store;

pub use config::CoreConfig;
pub use controller::ChatController;
pub use error::{Error, Result};
