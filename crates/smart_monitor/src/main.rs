//! # SMART Monitor
//!
//! Avalia a saúde S.M.A.R.T. de todos os drives configurados, atualiza o
//! banco de baselines e envia um resumo por e-mail ao administrador.
//! Feito para rodar periodicamente (cron/systemd timer); cada execução é
//! uma rodada.
//!
//! ## Uso
//! ```bash
//! smart_monitor                    # config.toml ao lado do executável
//! smart_monitor /etc/smart.toml    # caminho explícito
//! ```
//!
//! Exit codes: `0` ok, `1` falha de banco/SMTP, `2` configuração inválida.

mod logging;
mod mailer;
mod smartctl;

use mailer::SmtpMailer;
use smart_core::{Coordinator, Dispatcher, MonitorConfig, TomlStore};
use smartctl::SmartctlSource;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    // ── Carregar config ──
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(MonitorConfig::default_path);

    let config = match MonitorConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Falha ao carregar configuração: {e}");
            return ExitCode::from(2);
        }
    };

    // ── Logging ──
    if let Err(e) = logging::init(&config.logging) {
        eprintln!("Falha ao iniciar logs ({}): {e}", config.logging.file);
        return ExitCode::from(2);
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Configuração inválida ({}): {e}", config_path.display());
        }
        return ExitCode::from(2);
    }

    // ── Banco ──
    let store = match TomlStore::open(&config.storage.path) {
        Ok(store) => store,
        Err(e) => {
            error!("Falha ao abrir banco: {e}");
            return ExitCode::from(1);
        }
    };

    // ── Rodada ──
    let source = SmartctlSource::new(&config.smart.smartctl, &config.smart.device_root);
    let devices = config.devices();
    info!("Processando {} drives...", devices.len());

    let coordinator = Coordinator::new(
        &config.smart,
        &store,
        &source,
        config.dispatch.queue_timeout(),
    );
    let run = match coordinator.run(&devices) {
        Ok(run) => run,
        Err(e) => {
            error!("Falha ao migrar schema do banco: {e}");
            return ExitCode::from(1);
        }
    };

    // ── Entrega ──
    if run.notifications.is_empty() {
        info!("Nenhuma notificação; encerrando");
        return ExitCode::SUCCESS;
    }

    info!(
        "Enviando {} notificações para {}...",
        run.notifications.len(),
        config.email.recipient()
    );
    let dispatcher = Dispatcher::new(
        SmtpMailer::new(config.smtp.clone()),
        config.dispatch.attempts,
        config.dispatch.retry_delay(),
    );
    match dispatcher.send_bulk(
        &config.email.sender,
        config.email.recipient(),
        &run.notifications,
    ) {
        Ok(report) if report.failed.is_empty() => ExitCode::SUCCESS,
        Ok(report) => {
            error!("{} notificações não foram entregues", report.failed.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Falha ao conectar ao servidor SMTP: {e}");
            ExitCode::from(1)
        }
    }
}
