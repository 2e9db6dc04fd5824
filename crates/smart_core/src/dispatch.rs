//! Entrega das notificações ao administrador.
//!
//! O transporte real (SMTP) fica fora do núcleo, atrás de [`Transport`].
//! Cada mensagem tem `attempts` tentativas; entre tentativas a sessão com
//! falha é descartada, espera-se `retry_delay` e uma nova é aberta. Uma
//! mensagem que esgota as tentativas é logada e pulada; o lote continua.
//! Endereço inválido ou mensagem malformada não são repetidos.

use crate::types::Notification;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Erros do transporte.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Falha ao conectar: {0}")]
    Connect(String),

    #[error("Endereço inválido: {0}")]
    Address(String),

    #[error("Falha ao montar mensagem: {0}")]
    Build(String),

    #[error("Falha ao enviar: {0}")]
    Send(String),
}

impl TransportError {
    /// Endereço ou mensagem inválidos falham igual em qualquer tentativa.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Send(_))
    }
}

/// Abre sessões de envio.
pub trait Transport {
    type Session: MailSession;

    fn connect(&self) -> Result<Self::Session, TransportError>;
}

/// Sessão aberta com o servidor de envio.
pub trait MailSession {
    fn send(
        &mut self,
        sender: &str,
        recipient: &str,
        notification: &Notification,
    ) -> Result<(), TransportError>;
}

/// Resultado da entrega de um lote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Assuntos entregues, em ordem
    pub sent: Vec<String>,
    /// Assuntos que esgotaram as tentativas
    pub failed: Vec<String>,
}

/// Entregador com retry por mensagem.
pub struct Dispatcher<T: Transport> {
    transport: T,
    attempts: u32,
    retry_delay: Duration,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T, attempts: u32, retry_delay: Duration) -> Self {
        Self {
            transport,
            attempts: attempts.max(1),
            retry_delay,
        }
    }

    /// Envia uma única mensagem em sessão própria.
    pub fn send_one(
        &self,
        sender: &str,
        recipient: &str,
        notification: &Notification,
    ) -> Result<(), TransportError> {
        let mut session = Some(self.transport.connect()?);
        self.deliver(&mut session, sender, recipient, notification)
    }

    /// Envia o lote numa única sessão. Lote vazio não abre conexão.
    ///
    /// Só retorna erro se a conexão inicial falhar.
    pub fn send_bulk(
        &self,
        sender: &str,
        recipient: &str,
        notifications: &[Notification],
    ) -> Result<DispatchReport, TransportError> {
        let mut report = DispatchReport::default();
        if notifications.is_empty() {
            debug!("Nenhuma notificação para enviar");
            return Ok(report);
        }

        let mut session = Some(self.transport.connect()?);
        for notification in notifications {
            match self.deliver(&mut session, sender, recipient, notification) {
                Ok(()) => report.sent.push(notification.subject.clone()),
                Err(e) => {
                    error!(
                        "Desistindo da mensagem {:?} após {} tentativas: {e}",
                        notification.subject, self.attempts
                    );
                    report.failed.push(notification.subject.clone());
                }
            }
        }

        info!(
            "Lote entregue: {} enviadas, {} com falha",
            report.sent.len(),
            report.failed.len()
        );
        Ok(report)
    }

    fn deliver(
        &self,
        session: &mut Option<T::Session>,
        sender: &str,
        recipient: &str,
        notification: &Notification,
    ) -> Result<(), TransportError> {
        let mut last_error = TransportError::Send("nenhuma tentativa".into());

        for attempt in 1..=self.attempts {
            if attempt > 1 {
                warn!(
                    "Tentativa {attempt}/{} para {:?} em {:?}...",
                    self.attempts, notification.subject, self.retry_delay
                );
                std::thread::sleep(self.retry_delay);
            }

            if session.is_none() {
                match self.transport.connect() {
                    Ok(fresh) => *session = Some(fresh),
                    Err(e) => {
                        last_error = e;
                        continue;
                    }
                }
            }
            let Some(active) = session.as_mut() else {
                continue;
            };

            match active.send(sender, recipient, notification) {
                Ok(()) => return Ok(()),
                Err(e) if !e.is_transient() => {
                    warn!("Mensagem {:?} rejeitada sem retry: {e}", notification.subject);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Falha ao enviar {:?}: {e}", notification.subject);
                    *session = None;
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    /// Transporte que falha um número fixo de vezes por assunto.
    #[derive(Default, Clone)]
    struct ScriptedTransport {
        failures: Rc<RefCell<HashMap<String, u32>>>,
        attempts: Rc<RefCell<Vec<String>>>,
        connects: Rc<RefCell<u32>>,
        refuse_connect: bool,
        bad_address: Option<String>,
    }

    impl ScriptedTransport {
        fn failing(subject: &str, times: u32) -> Self {
            let t = Self::default();
            t.failures.borrow_mut().insert(subject.into(), times);
            t
        }
    }

    struct ScriptedSession(ScriptedTransport);

    impl Transport for ScriptedTransport {
        type Session = ScriptedSession;

        fn connect(&self) -> Result<ScriptedSession, TransportError> {
            *self.connects.borrow_mut() += 1;
            if self.refuse_connect {
                return Err(TransportError::Connect("recusado".into()));
            }
            Ok(ScriptedSession(self.clone()))
        }
    }

    impl MailSession for ScriptedSession {
        fn send(&mut self, _: &str, _: &str, n: &Notification) -> Result<(), TransportError> {
            self.0.attempts.borrow_mut().push(n.subject.clone());
            if self.0.bad_address.as_deref() == Some(n.subject.as_str()) {
                return Err(TransportError::Address("sem @".into()));
            }
            let mut failures = self.0.failures.borrow_mut();
            match failures.get_mut(&n.subject) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    Err(TransportError::Send("421 try later".into()))
                }
                _ => Ok(()),
            }
        }
    }

    fn batch() -> Vec<Notification> {
        (1..=3)
            .map(|i| Notification::new(format!("m{i}"), "body"))
            .collect()
    }

    #[test]
    fn exhausted_message_does_not_stop_the_batch() {
        let transport = ScriptedTransport::failing("m2", 5);
        let dispatcher = Dispatcher::new(transport.clone(), 2, Duration::ZERO);

        let report = dispatcher.send_bulk("a@x", "a@x", &batch()).unwrap();
        assert_eq!(report.sent, vec!["m1", "m3"]);
        assert_eq!(report.failed, vec!["m2"]);
        assert_eq!(*transport.attempts.borrow(), vec!["m1", "m2", "m2", "m3"]);
    }

    #[test]
    fn transient_failure_is_retried_on_a_new_session() {
        let transport = ScriptedTransport::failing("m1", 1);
        let dispatcher = Dispatcher::new(transport.clone(), 2, Duration::ZERO);

        let report = dispatcher.send_bulk("a@x", "a@x", &batch()).unwrap();
        assert_eq!(report.sent, vec!["m1", "m2", "m3"]);
        assert!(report.failed.is_empty());
        assert_eq!(*transport.connects.borrow(), 2);
    }

    #[test]
    fn empty_batch_never_connects() {
        let transport = ScriptedTransport::default();
        let dispatcher = Dispatcher::new(transport.clone(), 2, Duration::ZERO);
        let report = dispatcher.send_bulk("a@x", "a@x", &[]).unwrap();
        assert_eq!(report, DispatchReport::default());
        assert_eq!(*transport.connects.borrow(), 0);
    }

    #[test]
    fn initial_connect_failure_is_reported() {
        let transport = ScriptedTransport {
            refuse_connect: true,
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(transport, 2, Duration::ZERO);
        let err = dispatcher.send_bulk("a@x", "a@x", &batch()).unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }

    #[test]
    fn permanent_error_skips_retry() {
        let transport = ScriptedTransport {
            bad_address: Some("m2".into()),
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(transport.clone(), 2, Duration::from_secs(3600));

        let report = dispatcher.send_bulk("a@x", "a@x", &batch()).unwrap();
        assert_eq!(report.sent, vec!["m1", "m3"]);
        assert_eq!(report.failed, vec!["m2"]);
        assert_eq!(*transport.attempts.borrow(), vec!["m1", "m2", "m3"]);
        assert_eq!(*transport.connects.borrow(), 1);
    }

    #[test]
    fn only_connect_and_send_errors_are_transient() {
        assert!(TransportError::Connect("x".into()).is_transient());
        assert!(TransportError::Send("x".into()).is_transient());
        assert!(!TransportError::Address("x".into()).is_transient());
        assert!(!TransportError::Build("x".into()).is_transient());
    }

    #[test]
    fn send_one_retries_then_fails() {
        let transport = ScriptedTransport::failing("m1", 2);
        let dispatcher = Dispatcher::new(transport.clone(), 2, Duration::ZERO);
        let err = dispatcher
            .send_one("a@x", "a@x", &Notification::new("m1", "b"))
            .unwrap_err();
        assert_eq!(err, TransportError::Send("421 try later".into()));
        assert_eq!(transport.attempts.borrow().len(), 2);
    }
}
