//! Execução de uma rodada: um worker por drive, em paralelo.
//!
//! 1. Migra o schema do banco para a watch-list atual
//! 2. Dispara uma thread por drive (sem comunicação entre elas além da fila)
//! 3. Espera todas terminarem
//! 4. Drena a fila uma única vez, em ordem de chegada

use crate::config::SmartConfig;
use crate::queue::NotificationQueue;
use crate::store::{DriveStore, StoreError};
use crate::telemetry::TelemetrySource;
use crate::types::{Device, Notification};
use crate::worker::{DriveWorker, Outcome, Pipeline};
use std::time::Duration;
use tracing::{debug, error, info};

/// Contagem de drives por estado terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub devices: usize,
    pub missing: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    /// Notificações enfileiradas
    pub notifications: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: Outcome) {
        self.devices += 1;
        match outcome {
            Outcome::Missing => self.missing += 1,
            Outcome::Inserted { .. } => self.inserted += 1,
            Outcome::Updated { .. } => self.updated += 1,
            Outcome::Unchanged => self.unchanged += 1,
            Outcome::Failed => self.failed += 1,
        }
        if outcome.queued_notification() {
            self.notifications += 1;
        }
    }
}

/// Resultado de uma rodada.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Lote a ser entregue, em ordem de chegada
    pub notifications: Vec<Notification>,
    pub summary: RunSummary,
}

/// Coordenador da rodada.
pub struct Coordinator<'a, S: ?Sized, T: ?Sized> {
    smart: &'a SmartConfig,
    store: &'a S,
    source: &'a T,
    queue_timeout: Duration,
}

impl<'a, S, T> Coordinator<'a, S, T>
where
    S: DriveStore + ?Sized,
    T: TelemetrySource + ?Sized,
{
    pub fn new(smart: &'a SmartConfig, store: &'a S, source: &'a T, queue_timeout: Duration) -> Self {
        Self {
            smart,
            store,
            source,
            queue_timeout,
        }
    }

    /// Avalia todos os drives e devolve o lote de notificações.
    ///
    /// Só falha se a migração de schema falhar; erros de um drive ficam
    /// contidos no worker dele.
    pub fn run(&self, devices: &[Device]) -> Result<RunReport, StoreError> {
        let added = self.store.ensure_schema(&self.smart.watch_list())?;
        if !added.is_empty() {
            info!("Colunas adicionadas ao banco: {}", added.join(", "));
        }

        let pipeline = Pipeline::new(self.smart);
        let queue = NotificationQueue::new(devices.len(), self.queue_timeout);
        let mut summary = RunSummary::default();

        debug!("Disparando {} workers...", devices.len());

        std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(devices.len());

            for device in devices {
                let worker =
                    DriveWorker::new(device, &pipeline, self.store, self.source, queue.handle());
                let spawned = std::thread::Builder::new()
                    .name(format!("drive-{}", device.name))
                    .spawn_scoped(scope, move || worker.run());

                match spawned {
                    Ok(handle) => handles.push((device, handle)),
                    Err(e) => {
                        error!("Drive {} -> falha ao criar thread: {e}", device.name);
                        summary.record(Outcome::Failed);
                    }
                }
            }

            for (device, handle) in handles {
                let outcome = handle.join().unwrap_or_else(|_| {
                    error!("Drive {} ({}) -> worker entrou em pânico", device.name, device.key);
                    Outcome::Failed
                });
                summary.record(outcome);
            }
        });

        let notifications = queue.drain();
        info!(
            "Rodada concluída: {} drives | {} novos | {} atualizados | {} sem mudança | {} ausentes | {} falhas | {} notificações",
            summary.devices,
            summary.inserted,
            summary.updated,
            summary.unchanged,
            summary.missing,
            summary.failed,
            notifications.len()
        );

        Ok(RunReport {
            notifications,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_each_outcome() {
        let mut summary = RunSummary::default();
        summary.record(Outcome::Missing);
        summary.record(Outcome::Inserted { reported: false });
        summary.record(Outcome::Inserted { reported: true });
        summary.record(Outcome::Updated { reported: true });
        summary.record(Outcome::Unchanged);
        summary.record(Outcome::Failed);

        assert_eq!(
            summary,
            RunSummary {
                devices: 6,
                missing: 1,
                inserted: 2,
                updated: 1,
                unchanged: 1,
                failed: 1,
                notifications: 3,
            }
        );
    }
}
