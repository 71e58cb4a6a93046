//! External collaborators an application supplies: code delivery, question
//! generation, and unique-id generation. The toolkit calls these only after
//! its own atomic script has already admitted the operation (§4.3.1,
//! §4.4.1) — they never gate the rate-limiting decision itself.

use async_trait::async_trait;
use ratelimit_core::RateLimitError;

/// Parameters handed to a [`CodeProvider`] after a send script returns
/// `Success`.
#[derive(Debug, Clone)]
pub struct SendCodeRequest<'a> {
    pub target: &'a str,
    pub kind: &'a str,
    pub code: &'a str,
}

/// Delivers a verification code to its target (SMS, email, ...).
///
/// Invoked by the verified-code limiter's `send_code` wrapper only after the
/// send script reports *Success*; a delivery failure triggers the
/// compensating rollback described in §4.3.1.
#[async_trait]
pub trait CodeProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn send_code(&self, request: &SendCodeRequest<'_>) -> Result<(), RateLimitError>;
}

/// A generated question/answer pair for the challenge primitive.
#[derive(Debug, Clone)]
pub struct QuestionAnswer {
    pub id: String,
    pub question: String,
    pub answer: String,
}

/// Supplies human-solvable challenges (e.g. `"1+1"` / `"2"`) for a given
/// `kind`. Looked up through a [`crate::registry::DriverRegistry`] keyed by
/// kind — the unsupported sentinel fails every call.
#[async_trait]
pub trait CaptchaDriver: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_question_answer(&self) -> Result<QuestionAnswer, RateLimitError>;
}

pub struct UnsupportedCaptchaDriver {
    kind: String,
}

impl UnsupportedCaptchaDriver {
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

#[async_trait]
impl CaptchaDriver for UnsupportedCaptchaDriver {
    fn name(&self) -> &str {
        &self.kind
    }

    async fn generate_question_answer(&self) -> Result<QuestionAnswer, RateLimitError> {
        Err(RateLimitError::UnsupportedDriver {
            kind: self.kind.clone(),
        })
    }
}

/// Supplies a server-generated opaque id for the reflux variant of the
/// challenge primitive (double-submit correlation tokens).
#[async_trait]
pub trait RefluxProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_unique_id(&self) -> Result<String, RateLimitError>;
}

pub struct UnsupportedRefluxProvider {
    kind: String,
}

impl UnsupportedRefluxProvider {
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

#[async_trait]
impl RefluxProvider for UnsupportedRefluxProvider {
    fn name(&self) -> &str {
        &self.kind
    }

    async fn generate_unique_id(&self) -> Result<String, RateLimitError> {
        Err(RateLimitError::UnsupportedDriver {
            kind: self.kind.clone(),
        })
    }
}
