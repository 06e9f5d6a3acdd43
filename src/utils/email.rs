use anyhow::Result;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::env;

pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    frontend_url: String,
    skip_send: bool,
}

impl EmailService {
    pub fn new() -> Result<Self> {
        let smtp_host = env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string());
        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .unwrap_or(587);
        let smtp_username = env::var("SMTP_USERNAME").unwrap_or_default();
        let smtp_password = env::var("SMTP_PASSWORD").unwrap_or_default();
        let from_address = env::var("SMTP_FROM_ADDRESS")
            .unwrap_or_else(|_| "noreply@gatekeeper.local".to_string());
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let skip_send = env::var("SMTP_SKIP_SEND").unwrap_or_default() == "true";

        let mailer = if smtp_username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp_host)
                .port(smtp_port)
                .build()
        } else {
            let creds = Credentials::new(smtp_username, smtp_password);
            AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp_host)?
                .port(smtp_port)
                .credentials(creds)
                .build()
        };

        Ok(Self {
            mailer,
            from_address,
            frontend_url,
            skip_send,
        })
    }

    /// A service that never sends. Used by tests and offline development.
    pub fn disabled() -> Self {
        Self {
            mailer: AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous("localhost").build(),
            from_address: "noreply@gatekeeper.local".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            skip_send: true,
        }
    }

    pub async fn send_verification_email(
        &self,
        to_email: &str,
        name: &str,
        verify_token: &str,
    ) -> Result<()> {
        if self.skip_send {
            return Ok(());
        }
        let verify_url = format!("{}/verify/{}", self.frontend_url, verify_token);

        let body = format!(
            r#"<p>Hi {},</p>
<p>Please confirm your email address to finish creating your account:</p>
<p><a href="{}">Verify my email</a></p>
<p>The link is valid for 5 minutes. If you did not sign up, you can ignore
this message.</p>"#,
            name, verify_url
        );

        let email = Message::builder()
            .from(self.from_address.parse()?)
            .to(to_email.parse()?)
            .subject("Verify your email")
            .header(ContentType::TEXT_HTML)
            .body(body)?;

        self.mailer.send(email).await?;
        Ok(())
    }

    pub async fn send_otp_email(&self, to_email: &str, name: &str, otp: &str) -> Result<()> {
        if self.skip_send {
            return Ok(());
        }
        let body = format!(
            r#"<p>Hi {},</p>
<p>Your one-time login code is:</p>
<p style="font-size:24px"><strong>{}</strong></p>
<p>It expires in 5 minutes. If you did not try to log in, change your
password now.</p>"#,
            name, otp
        );

        let email = Message::builder()
            .from(self.from_address.parse()?)
            .to(to_email.parse()?)
            .subject("Your login code")
            .header(ContentType::TEXT_HTML)
            .body(body)?;

        self.mailer.send(email).await?;
        Ok(())
    }
}
