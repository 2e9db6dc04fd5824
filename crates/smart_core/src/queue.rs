//! Fila limitada de notificações compartilhada pelos workers.
//!
//! Capacidade = número de drives da execução (cada drive gera no máximo uma
//! notificação). Um push além da capacidade espera no máximo `push_timeout`
//! e falha com [`QueueError::Full`], nunca bloqueia para sempre.

use crate::types::Notification;
use crossbeam_channel::{Receiver, SendTimeoutError, Sender, bounded};
use std::time::Duration;

/// Erros ao enfileirar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Fila cheia (capacidade {capacity}) após esperar {waited:?}")]
    Full { capacity: usize, waited: Duration },

    #[error("Fila já foi drenada")]
    Closed,
}

/// Fila da execução. Drenada uma única vez por [`NotificationQueue::drain`].
#[derive(Debug)]
pub struct NotificationQueue {
    tx: Sender<Notification>,
    rx: Receiver<Notification>,
    capacity: usize,
    push_timeout: Duration,
}

impl NotificationQueue {
    pub fn new(capacity: usize, push_timeout: Duration) -> Self {
        let (tx, rx) = bounded(capacity);
        Self {
            tx,
            rx,
            capacity,
            push_timeout,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Handle de escrita para um worker.
    pub fn handle(&self) -> QueueHandle {
        QueueHandle {
            tx: self.tx.clone(),
            capacity: self.capacity,
            push_timeout: self.push_timeout,
        }
    }

    /// Esvazia a fila em ordem de chegada. Consome a fila.
    pub fn drain(self) -> Vec<Notification> {
        let Self { tx, rx, .. } = self;
        drop(tx);
        rx.try_iter().collect()
    }
}

/// Lado de escrita da fila.
#[derive(Debug, Clone)]
pub struct QueueHandle {
    tx: Sender<Notification>,
    capacity: usize,
    push_timeout: Duration,
}

impl QueueHandle {
    pub fn push(&self, notification: Notification) -> Result<(), QueueError> {
        self.tx
            .send_timeout(notification, self.push_timeout)
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => QueueError::Full {
                    capacity: self.capacity,
                    waited: self.push_timeout,
                },
                SendTimeoutError::Disconnected(_) => QueueError::Closed,
            })
    }
}
