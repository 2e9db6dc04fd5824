//! # SMART Core
//!
//! Núcleo do monitor de drives: interpreta a telemetria S.M.A.R.T., compara
//! com o baseline persistido e com os thresholds configurados e compõe os
//! relatórios enviados ao administrador.
//!
//! ## Módulos
//! - [`types`] – Drive, mapa ordenado de atributos, notificação
//! - [`config`] – Configuração unificada via TOML
//! - [`extractor`] – Parsing da saída de `smartctl -A`
//! - [`comparator`] – Diff contra baseline e thresholds
//! - [`report`] – Relatórios inicial, de atualização e de drive ausente
//! - [`store`] – Banco de baselines por drive
//! - [`telemetry`] – Interface da fonte de telemetria
//! - [`queue`] – Fila limitada compartilhada pelos workers
//! - [`worker`] – Avaliação de um drive
//! - [`coordinator`] – Rodada paralela sobre todos os drives
//! - [`dispatch`] – Entrega do lote com retry

pub mod types;
pub mod config;
pub mod extractor;
pub mod comparator;
pub mod report;
pub mod store;
pub mod telemetry;
pub mod queue;
pub mod worker;
pub mod coordinator;
pub mod dispatch;

// Re-exports convenientes
pub use types::{AttributeMap, Device, Notification};
pub use config::MonitorConfig;
pub use coordinator::{Coordinator, RunReport, RunSummary};
pub use dispatch::{DispatchReport, Dispatcher, MailSession, Transport, TransportError};
pub use store::{DriveStore, MemoryStore, TomlStore};
pub use telemetry::{Location, TelemetrySource};
