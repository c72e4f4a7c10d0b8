//! Error types for the onboarding core.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

/// Identity-provider errors: session restore, OTP dispatch/verify, sign-out.
///
/// Every one of these resolves to a safe, named session phase at the call
/// site — they never leave the session in an ambiguous state.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Session restore failed: {0}")]
    RestoreFailed(String),

    #[error("Failed to send one-time code to {email}: {reason}")]
    DispatchFailed { email: String, reason: String },

    #[error("Code verification failed: {reason}")]
    VerifyFailed { reason: String },

    #[error("Failed to fetch {resource}: {reason}")]
    FetchFailed { resource: String, reason: String },

    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),
}

/// Fact-store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Query failed: {0}")]
    Query(String),

    #[error("Field not found: {field} for organization {organization_id}")]
    NotFound {
        organization_id: String,
        field: String,
    },

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited")]
    RateLimited { provider: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Extraction and question-generation errors.
///
/// These are logged and degraded to "no facts / no questions" — onboarding
/// must always be able to ask again next turn.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Question generation failed: {0}")]
    Generation(String),

    #[error("Failed to parse extraction output: {0}")]
    Parse(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Streaming chat transport and protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    #[error("Malformed frame: {0}")]
    Frame(String),

    #[error("Website scrape failed: {0}")]
    Scrape(String),
}

/// Result type alias for the onboarding core.
pub type Result<T> = std::result::Result<T, Error>;
