//! Transporte SMTP via `lettre`.
//!
//! `ssl = true` usa TLS implícito (SMTPS); caso contrário, conexão em texto
//! puro. A conexão é testada em [`Transport::connect`] para que erros de
//! autenticação apareçam antes do lote.

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport as _};
use smart_core::config::SmtpConfig;
use smart_core::{MailSession, Notification, Transport, TransportError};
use std::time::Duration;
use tracing::debug;

const SMTP_TIMEOUT: Duration = Duration::from_secs(3);

/// Fábrica de sessões SMTP.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn build(&self) -> Result<SmtpTransport, TransportError> {
        let host = &self.config.hostname;
        let builder = if self.config.ssl {
            SmtpTransport::relay(host).map_err(|e| TransportError::Connect(e.to_string()))?
        } else {
            SmtpTransport::builder_dangerous(host)
        };

        let mut builder = builder.port(self.config.port).timeout(Some(SMTP_TIMEOUT));
        if let Some((user, pass)) = self.config.credentials() {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        Ok(builder.build())
    }
}

impl Transport for SmtpMailer {
    type Session = SmtpSession;

    fn connect(&self) -> Result<SmtpSession, TransportError> {
        let transport = self.build()?;
        match transport.test_connection() {
            Ok(true) => {
                debug!("Conectado a {}:{}", self.config.hostname, self.config.port);
                Ok(SmtpSession { transport })
            }
            Ok(false) => Err(TransportError::Connect(format!(
                "{}:{} não respondeu",
                self.config.hostname, self.config.port
            ))),
            Err(e) => Err(TransportError::Connect(e.to_string())),
        }
    }
}

/// Sessão SMTP aberta.
pub struct SmtpSession {
    transport: SmtpTransport,
}

impl MailSession for SmtpSession {
    fn send(
        &mut self,
        sender: &str,
        recipient: &str,
        notification: &Notification,
    ) -> Result<(), TransportError> {
        let message = envelope(sender, recipient, notification)?;
        self.transport
            .send(&message)
            .map(|_| ())
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

/// Monta a mensagem em texto puro UTF-8.
fn envelope(
    sender: &str,
    recipient: &str,
    notification: &Notification,
) -> Result<Message, TransportError> {
    let from = sender
        .parse::<Mailbox>()
        .map_err(|e| TransportError::Address(format!("{sender}: {e}")))?;
    let to = recipient
        .parse::<Mailbox>()
        .map_err(|e| TransportError::Address(format!("{recipient}: {e}")))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(notification.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(notification.body.clone())
        .map_err(|e| TransportError::Build(e.to_string()))
}
