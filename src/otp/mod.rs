//! Progressive OTP identity flow: a pure action-emitting state machine plus
//! the executor that applies its output.

pub mod actions;
pub mod engine;
pub mod executor;

pub use actions::{OtpAction, OtpEffect, OtpStep, PendingUpdate};
pub use executor::OtpExecutor;
