//! Outbound mail boundary.
//!
//! The crate never talks SMTP; it hands a [`MailRequest`] to whatever
//! [`Mailer`] the application wired in. Account flows send mail off the
//! request path via [`send_detached`]: registration must not fail because
//! the mail relay is down.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::AuthError;

/// The transactional templates this crate sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTemplate {
    VerifyEmail,
    ResetPassword,
}

impl MailTemplate {
    /// Template identifier as the mail provider knows it.
    pub fn name(self) -> &'static str {
        match self {
            Self::VerifyEmail => "verify-email",
            Self::ResetPassword => "reset-password",
        }
    }
}

/// One piece of outbound mail: template, recipient, template data.
#[derive(Clone, PartialEq)]
pub struct MailRequest {
    pub template: MailTemplate,
    pub to: String,
    /// Template variables. Carries emailed links, which embed live codes.
    pub data: Value,
}

impl fmt::Debug for MailRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // data embeds reset/verification links; keep it out of logs
        f.debug_struct("MailRequest")
            .field("template", &self.template)
            .field("to", &self.to)
            .field("data", &"[REDACTED]")
            .finish()
    }
}

/// Delivery backend the application provides.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers one mail.
    ///
    /// # Errors
    ///
    /// [`AuthError::Server`] when delivery fails.
    async fn send(&self, mail: MailRequest) -> Result<(), AuthError>;
}

/// Wraps a [`Mailer`] with bounded retries and a fixed backoff.
///
/// # Example
///
/// ```rust,ignore
/// use umbra_auth::mail::RetryingMailer;
/// use std::time::Duration;
///
/// let mailer = RetryingMailer::new(SmtpMailer::new(relay))
///     .with_attempts(5)
///     .with_backoff(Duration::from_secs(1));
/// ```
pub struct RetryingMailer<M> {
    inner: M,
    attempts: u32,
    backoff: Duration,
}

impl<M> RetryingMailer<M> {
    /// Three attempts, 500ms apart.
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }

    /// Sets the total number of attempts (minimum 1).
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Sets the pause between attempts.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

#[async_trait]
impl<M: Mailer> Mailer for RetryingMailer<M> {
    async fn send(&self, mail: MailRequest) -> Result<(), AuthError> {
        let mut last_err = None;
        for attempt in 1..=self.attempts {
            match self.inner.send(mail.clone()).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    log::warn!(
                        target: "umbra_auth::mail",
                        "msg=\"mail send attempt failed\" template={} attempt={attempt} max_attempts={} error=\"{err}\"",
                        mail.template.name(),
                        self.attempts
                    );
                    last_err = Some(err);
                    if attempt < self.attempts {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| AuthError::Server("mailer retry loop ran no attempts".to_owned())))
    }
}

/// Sends mail on a detached task. A failed delivery is logged and dropped;
/// the triggering operation has already succeeded by the time this runs.
pub fn send_detached(mailer: Arc<dyn Mailer>, mail: MailRequest) {
    tokio::spawn(async move {
        let template = mail.template.name();
        if let Err(err) = mailer.send(mail).await {
            log::error!(
                target: "umbra_auth::mail",
                "msg=\"mail delivery abandoned\" template={template} error=\"{err}\""
            );
        }
    });
}

/// Link for a verification mail: `{base_url}/verify-email?code={code}`.
pub fn verification_link(base_url: &str, code: &str) -> String {
    format!("{}/verify-email?code={code}", base_url.trim_end_matches('/'))
}

/// Link for a reset mail: `{base_url}/reset-password?code={code}`.
pub fn reset_link(base_url: &str, code: &str) -> String {
    format!(
        "{}/reset-password?code={code}",
        base_url.trim_end_matches('/')
    )
}

/// Records mail instead of sending it; optionally fails the first `n`
/// sends to exercise retry paths.
#[cfg(any(test, feature = "mocks"))]
#[derive(Clone, Default)]
pub struct MockMailer {
    pub sent: Arc<std::sync::Mutex<Vec<MailRequest>>>,
    fail_next: Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(any(test, feature = "mocks"))]
#[allow(clippy::unwrap_used)]
impl MockMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose next `n` sends fail.
    #[must_use]
    pub fn failing(n: usize) -> Self {
        let mailer = Self::default();
        mailer
            .fail_next
            .store(n, std::sync::atomic::Ordering::SeqCst);
        mailer
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<MailRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(any(test, feature = "mocks"))]
#[async_trait]
#[allow(clippy::unwrap_used)]
impl Mailer for MockMailer {
    async fn send(&self, mail: MailRequest) -> Result<(), AuthError> {
        use std::sync::atomic::Ordering;

        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(AuthError::Server("mock mailer failure".to_owned()));
        }
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}
