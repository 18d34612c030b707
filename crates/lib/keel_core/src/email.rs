//! Outbound email dispatch over SMTP.
//!
//! Bodies are plain text rendered inline; links point back into the web
//! client, which forwards the embedded token to the confirmation endpoint.
//! Dispatch failures propagate to the caller — there is no retry here.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

/// Email dispatch errors.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build email: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("Failed to send email: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// SMTP and link-rendering configuration.
#[derive(Clone, Debug)]
pub struct MailerConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_password: String,
    /// Base URL of the web client the confirmation links point at.
    pub client_url: String,
    pub app_name: String,
}

impl MailerConfig {
    /// Read SMTP settings from the environment.
    ///
    /// | Variable        | Default                 |
    /// |-----------------|-------------------------|
    /// | `SMTP_HOST`     | `localhost`             |
    /// | `SMTP_PORT`     | `587`                   |
    /// | `SMTP_MAIL`     | (empty)                 |
    /// | `SMTP_PASSWORD` | (empty)                 |
    /// | `CLIENT_URL`    | `http://localhost:3000` |
    /// | `APP_NAME`      | `Our Application`       |
    pub fn from_env() -> Self {
        Self {
            smtp_host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".into()),
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            smtp_user: std::env::var("SMTP_MAIL").unwrap_or_default(),
            smtp_password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            client_url: std::env::var("CLIENT_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            app_name: std::env::var("APP_NAME").unwrap_or_else(|_| "Our Application".into()),
        }
    }
}

/// Sends account-lifecycle emails over a pooled SMTP connection.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: MailerConfig,
}

impl Mailer {
    pub fn new(config: MailerConfig) -> Result<Self, EmailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .credentials(Credentials::new(
                config.smtp_user.clone(),
                config.smtp_password.clone(),
            ))
            .port(config.smtp_port)
            .build();
        Ok(Self { transport, config })
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(format!("{} <{}>", self.config.app_name, self.config.smtp_user).parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;
        self.transport.send(message).await?;
        Ok(())
    }

    /// Activation email sent at registration (and on resend).
    pub async fn send_verification_email(
        &self,
        name: &str,
        email: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        let link = activation_link(&self.config.client_url, token);
        let body = render_verification(&self.config.app_name, name, &link);
        self.send(email, "Verify Your Email Address", body).await
    }

    /// Confirmation email for a pending email change, sent to the new address.
    pub async fn send_new_email_verification(
        &self,
        name: &str,
        new_email: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        let link = activation_link(&self.config.client_url, token);
        let body = render_new_email(&self.config.app_name, name, &link);
        self.send(new_email, "Verify Your New Email Address", body)
            .await
    }

    /// Confirmation email for a pending password change, sent to the current
    /// address.
    pub async fn send_change_password_email(
        &self,
        name: &str,
        email: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        let link = activation_link(&self.config.client_url, token);
        let body = render_change_password(&self.config.app_name, name, &link);
        self.send(email, "Verify Your New Password", body).await
    }

    /// Password-reset email.
    pub async fn send_reset_password_email(
        &self,
        name: &str,
        email: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        let link = reset_link(&self.config.client_url, token);
        let body = render_reset_password(&self.config.app_name, name, &link);
        self.send(email, "Verify Your Reset Password Request", body)
            .await
    }
}

fn activation_link(client_url: &str, token: &str) -> String {
    format!("{client_url}/activate-account?token={token}")
}

fn reset_link(client_url: &str, token: &str) -> String {
    format!("{client_url}/reset-password?token={token}")
}

fn render_verification(app_name: &str, name: &str, link: &str) -> String {
    format!(
        "Hi {name},\n\n\
         Welcome to {app_name}! Please verify your email address by opening the link below:\n\n\
         {link}\n\n\
         The link is valid for 24 hours. If you did not create an account, you can ignore this email.\n"
    )
}

fn render_new_email(app_name: &str, name: &str, link: &str) -> String {
    format!(
        "Hi {name},\n\n\
         A change of the email address on your {app_name} account was requested.\n\
         Confirm the new address by opening the link below:\n\n\
         {link}\n\n\
         The link is valid for 24 hours. If you did not request this change, you can ignore this email.\n"
    )
}

fn render_change_password(app_name: &str, name: &str, link: &str) -> String {
    format!(
        "Hi {name},\n\n\
         A password change on your {app_name} account is waiting for confirmation.\n\
         Complete it by opening the link below:\n\n\
         {link}\n\n\
         The link is valid for 24 hours. If you did not request this change, you can ignore this email.\n"
    )
}

fn render_reset_password(app_name: &str, name: &str, link: &str) -> String {
    format!(
        "Hi {name},\n\n\
         A password reset for your {app_name} account was requested.\n\
         Choose a new password by opening the link below:\n\n\
         {link}\n\n\
         The link is valid for 24 hours. If you did not request a reset, you can ignore this email.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_embed_the_token() {
        let link = activation_link("https://app.example", "tok-123");
        assert_eq!(link, "https://app.example/activate-account?token=tok-123");

        let link = reset_link("https://app.example", "tok-456");
        assert_eq!(link, "https://app.example/reset-password?token=tok-456");
    }

    #[test]
    fn bodies_mention_recipient_and_link() {
        for render in [
            render_verification,
            render_new_email,
            render_change_password,
            render_reset_password,
        ] {
            let body = render("Keel", "Alice", "https://app.example/x?token=t");
            assert!(body.contains("Alice"));
            assert!(body.contains("https://app.example/x?token=t"));
        }
    }
}
