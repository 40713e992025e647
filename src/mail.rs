use axum::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::future::Future;
use tracing::{info, warn};

use crate::config::SmtpConfig;

/// Outbound transactional mail. Implementations must not block request
/// handling; callers go through [`send_in_background`].
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send_verification(
        &self,
        name: &str,
        to: &str,
        token: &str,
        first_time: bool,
    ) -> anyhow::Result<()>;
    async fn send_email_change(&self, name: &str, to: &str, token: &str) -> anyhow::Result<()>;
    async fn send_password_change(&self, name: &str, to: &str, token: &str)
        -> anyhow::Result<()>;
}

/// Fire-and-forget: mail failures are logged, never surfaced to the caller.
pub fn send_in_background<F>(fut: F)
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            warn!(error = %e, "mail delivery failed");
        }
    });
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    page_url: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, page_url: &str) -> anyhow::Result<Self> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();
        Ok(Self {
            transport,
            from: config.from.parse()?,
            page_url: page_url.trim_end_matches('/').to_string(),
        })
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)?;
        let response = self.transport.send(message).await?;
        info!(to = %to, code = %response.code(), "mail sent");
        Ok(())
    }

    fn link_body(&self, greeting: &str, lead: &str, path: &str, token: &str, label: &str) -> String {
        format!(
            concat!(
                r#"<div style="font-family: Arial, sans-serif; padding: 20px;">"#,
                "<h2>{greeting}</h2><p>{lead}</p>",
                r#"<a href="{page}/{path}/{token}">{label}</a>"#,
                "<p>Si no solicitaste esto, ignora este correo.</p></div>"
            ),
            greeting = greeting,
            lead = lead,
            page = self.page_url,
            path = path,
            token = token,
            label = label,
        )
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send_verification(
        &self,
        name: &str,
        to: &str,
        token: &str,
        first_time: bool,
    ) -> anyhow::Result<()> {
        let lead = if first_time {
            "Tu cuenta ha sido creada correctamente. Haz click para verificarla:"
        } else {
            "Aquí tienes un nuevo enlace de verificación:"
        };
        let body = self.link_body(
            &format!("¡Hola {name}!"),
            lead,
            "verify",
            token,
            "Verificar Cuenta",
        );
        self.send(to, "Verifica tu cuenta", body).await
    }

    async fn send_email_change(&self, name: &str, to: &str, token: &str) -> anyhow::Result<()> {
        let body = self.link_body(
            &format!("¡Hola {name}!"),
            "Confirma el cambio de tu correo electrónico:",
            "change-email",
            token,
            "Confirmar Cambio",
        );
        self.send(to, "Cambio de correo", body).await
    }

    async fn send_password_change(
        &self,
        name: &str,
        to: &str,
        token: &str,
    ) -> anyhow::Result<()> {
        let body = self.link_body(
            &format!("¡Hola {name}!"),
            "Confirma el cambio de tu contraseña:",
            "change-password",
            token,
            "Confirmar Cambio",
        );
        self.send(to, "Cambio de contraseña", body).await
    }
}
