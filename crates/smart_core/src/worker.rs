//! Avaliação de um drive.
//!
//! Fluxo:
//!
//! ```text
//! locate ─┬─ Missing ──────────────────────────────── relatório de ausência
//!         └─ Found → telemetria → extração → baseline ─┬─ nenhum → insert → [relatório inicial]
//!                                                      └─ existe → compara ─┬─ subiu → update → [relatório de atualização]
//!                                                                           └─ igual → fim
//! ```
//!
//! Qualquer erro encerra só este drive; é logado com o UUID e vira
//! [`Outcome::Failed`].

use crate::comparator::{self, MissingBaselineColumn};
use crate::config::SmartConfig;
use crate::extractor::{AttributeExtractor, ExtractError};
use crate::queue::{QueueError, QueueHandle};
use crate::report;
use crate::store::{DriveStore, StoreError};
use crate::telemetry::{self, Location, TelemetrySource};
use crate::types::{AttributeMap, Device};
use tracing::{debug, error, warn};

/// Falhas que encerram a avaliação de um drive.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Falha ao coletar telemetria: {0}")]
    Telemetry(#[from] std::io::Error),

    #[error("Erro de parsing: {0}")]
    Parse(#[from] ExtractError),

    #[error(transparent)]
    MissingBaselineColumn(#[from] MissingBaselineColumn),

    #[error("Erro no banco: {0}")]
    Store(#[from] StoreError),

    #[error("Falha ao enfileirar notificação: {0}")]
    Queue(#[from] QueueError),
}

/// Estado terminal de um drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Caminho não encontrado; relatório de ausência enfileirado
    Missing,
    /// Primeira vez visto; `reported` indica relatório inicial enfileirado
    Inserted { reported: bool },
    /// Valores subiram; `reported` indica relatório de atualização enfileirado
    Updated { reported: bool },
    Unchanged,
    Failed,
}

impl Outcome {
    pub fn queued_notification(self) -> bool {
        matches!(
            self,
            Outcome::Missing
                | Outcome::Inserted { reported: true }
                | Outcome::Updated { reported: true }
        )
    }
}

/// Dados da execução compartilhados (somente leitura) por todos os workers.
#[derive(Debug)]
pub struct Pipeline<'a> {
    pub smart: &'a SmartConfig,
    pub extractor: AttributeExtractor,
    pub thresholds: AttributeMap,
}

impl<'a> Pipeline<'a> {
    pub fn new(smart: &'a SmartConfig) -> Self {
        Self {
            smart,
            extractor: AttributeExtractor::from_config(smart),
            thresholds: smart.thresholds(),
        }
    }
}

/// Worker de um drive.
pub struct DriveWorker<'a, S: ?Sized, T: ?Sized> {
    device: &'a Device,
    pipeline: &'a Pipeline<'a>,
    store: &'a S,
    source: &'a T,
    queue: QueueHandle,
}

impl<'a, S, T> DriveWorker<'a, S, T>
where
    S: DriveStore + ?Sized,
    T: TelemetrySource + ?Sized,
{
    pub fn new(
        device: &'a Device,
        pipeline: &'a Pipeline<'a>,
        store: &'a S,
        source: &'a T,
        queue: QueueHandle,
    ) -> Self {
        Self {
            device,
            pipeline,
            store,
            source,
            queue,
        }
    }

    /// Executa a avaliação. Nunca propaga erro.
    pub fn run(self) -> Outcome {
        match self.evaluate() {
            Ok(outcome) => {
                debug!("Drive {} -> concluído: {outcome:?}", self.device.name);
                outcome
            }
            Err(e) => {
                error!(
                    "Drive {} ({}) -> avaliação abortada: {e}",
                    self.device.name, self.device.key
                );
                Outcome::Failed
            }
        }
    }

    fn evaluate(&self) -> Result<Outcome, WorkerError> {
        let device = self.device;

        let path = match self.source.locate(device) {
            Location::Found(path) => path,
            Location::Missing(path) => {
                warn!(
                    "Drive {} -> caminho não encontrado: {}; enfileirando relatório...",
                    device.name,
                    path.display()
                );
                self.queue
                    .push(report::missing_drive_report(&device.name, &path))?;
                return Ok(Outcome::Missing);
            }
        };

        let information = telemetry::redact_information(
            &self.source.information(&path)?,
            &path,
            &device.mount_point,
        );
        let report_text = self.source.attributes(&path)?;
        let extracted = self.pipeline.extractor.extract(&report_text)?;
        let smart = self.pipeline.smart;
        let thresholds = &self.pipeline.thresholds;

        match self.store.get_baseline(&device.key)? {
            None => {
                debug!("Drive {} -> não existe no banco; inserindo...", device.name);
                self.store
                    .insert(&device.key, &device.name, &device.group, &extracted.watched)?;

                if !smart.reports_initial() {
                    return Ok(Outcome::Inserted { reported: false });
                }

                debug!("Drive {} -> enfileirando relatório inicial...", device.name);
                let empty = AttributeMap::new();
                let organized =
                    comparator::organize(&extracted.watched, &empty, thresholds, &extracted.failing);
                self.queue.push(report::initial_report(
                    &device.name,
                    &information,
                    &report_text,
                    &organized,
                ))?;
                Ok(Outcome::Inserted { reported: true })
            }
            Some(baseline) => {
                debug!("Drive {} -> existe no banco; comparando...", device.name);
                if !comparator::update_needed(&extracted.watched, &baseline)? {
                    return Ok(Outcome::Unchanged);
                }

                debug!("Drive {} -> valores subiram; atualizando banco...", device.name);
                self.store.update(&device.key, &extracted.watched)?;

                let organized = comparator::organize(
                    &extracted.watched,
                    &baseline,
                    thresholds,
                    &extracted.failing,
                );
                if !smart.reports_updated() || !comparator::message_needed(&organized) {
                    return Ok(Outcome::Updated { reported: false });
                }

                debug!("Drive {} -> enfileirando relatório de atualização...", device.name);
                self.queue.push(report::update_report(
                    &device.name,
                    &information,
                    &report_text,
                    &organized,
                ))?;
                Ok(Outcome::Updated { reported: true })
            }
        }
    }
}
