//! Business-info onboarding: field model, question queue, fact
//! extraction, and setup progress.

pub mod extraction;
pub mod model;
pub mod progress;
pub mod questions;

pub use extraction::{ExtractionEngine, OrgDirectory, slugify};
pub use model::{
    BUSINESS_NAME_FIELD, BusinessField, ExtractedFact, FieldType, GeneratedQuestion,
    SETUP_COMPLETE_MARKER, contains_setup_marker, strip_setup_marker,
};
pub use progress::Progress;
pub use questions::QuestionEngine;
