use anyhow::{Context, Result};
use chrono::NaiveDate;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

fn env_var(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} missing"))
}

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailSender {
    pub fn from_env() -> Result<Self> {
        let host = env_var("SMTP_HOST")?;
        let user = env_var("SMTP_USER")?;
        let pass = env_var("SMTP_PASS")?;
        let from_addr = env_var("DIGEST_EMAIL_FROM")?;
        let to_addr = env_var("DIGEST_EMAIL_TO")?;

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        let from = from_addr.parse().context("invalid DIGEST_EMAIL_FROM")?;
        let to = to_addr.parse().context("invalid DIGEST_EMAIL_TO")?;

        Ok(Self { mailer, from, to })
    }

    pub async fn send_digest(&self, html: String, date: NaiveDate) -> Result<()> {
        let subject = format!("News digest {}", date.format("%Y-%m-%d"));

        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(header::ContentType::TEXT_HTML)
            .body(html)
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        tracing::info!(target: "digest", to = %self.to, "digest email sent");
        Ok(())
    }
}
