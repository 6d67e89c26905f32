use async_trait::async_trait;

use crate::account::errors::MailError;
use crate::account::models::Mail;
use crate::account::ports::Mailer;

/// Mail adapter that writes messages to the log instead of delivering
/// them.
///
/// Stands in for a real provider in development; the logged body still
/// carries the reset URL, so the flow can be exercised end to end.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        tracing::info!(
            to = %mail.to,
            subject = %mail.subject,
            body = %mail.body,
            "Email dispatched (log only)"
        );

        Ok(())
    }
}
