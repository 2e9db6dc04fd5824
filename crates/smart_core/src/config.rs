//! Configuração unificada via TOML.
//!
//! Um único `config.toml` descreve SMTP, colunas do relatório S.M.A.R.T.,
//! atributos monitorados e a lista de drives por grupo.

use crate::types::{AttributeMap, Device};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Erros ao carregar a configuração.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Erro ao ler {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Erro ao parsear {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Configuração de logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Nível usado quando `RUST_LOG` não está definido
    pub level: String,
    /// `"full"` ou `"compact"`
    pub format: String,
    /// Arquivo de log adicional ao stdout. Vazio = só stdout
    pub file: String,
    /// Tamanho que dispara a rotação na partida (KiB). 0 = nunca rotaciona
    pub max_size_kb: u64,
    /// Arquivos antigos mantidos (`.1` .. `.N`)
    pub backups: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "full".into(),
            file: String::new(),
            max_size_kb: 0,
            backups: 9,
        }
    }
}

impl LoggingConfig {
    pub fn file(&self) -> Option<&Path> {
        if self.file.is_empty() {
            None
        } else {
            Some(Path::new(&self.file))
        }
    }
}

/// Servidor SMTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub hostname: String,
    pub port: u16,
    /// TLS implícito (SMTPS)
    pub ssl: bool,
    pub username: String,
    pub password: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".into(),
            port: 465,
            ssl: true,
            username: String::new(),
            password: String::new(),
        }
    }
}

impl SmtpConfig {
    /// Credenciais só são usadas quando usuário e senha estão preenchidos.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.username.is_empty() || self.password.is_empty() {
            None
        } else {
            Some((&self.username, &self.password))
        }
    }
}

/// Remetente e destinatário do resumo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub sender: String,
    /// Vazio = o próprio remetente
    pub recipient: String,
}

impl EmailConfig {
    pub fn recipient(&self) -> &str {
        if self.recipient.is_empty() {
            &self.sender
        } else {
            &self.recipient
        }
    }
}

/// Atributo S.M.A.R.T. monitorado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedAttribute {
    pub name: String,
    pub threshold: u64,
}

/// Como interpretar a saída de `smartctl -A` e quando reportar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmartConfig {
    /// Índice da coluna ATTRIBUTE_NAME
    pub attribute_name: usize,
    /// Índice da coluna RAW_VALUE
    pub raw_value: usize,
    /// Índice da coluna WHEN_FAILED
    pub when_failed: usize,
    /// Marcador de atributo falhando na coluna WHEN_FAILED
    pub failing_marker: String,
    pub report_values: bool,
    pub report_initial_values: bool,
    pub report_updated_values: bool,
    /// Atributos monitorados, na ordem configurada
    pub attributes: Vec<WatchedAttribute>,
    /// Executável do smartctl
    pub smartctl: String,
    /// Diretório onde os drives aparecem pelo UUID
    pub device_root: PathBuf,
}

impl Default for SmartConfig {
    fn default() -> Self {
        Self {
            attribute_name: 1,
            raw_value: 9,
            when_failed: 8,
            failing_marker: "FAILING_NOW".into(),
            report_values: true,
            report_initial_values: true,
            report_updated_values: true,
            attributes: Vec::new(),
            smartctl: "smartctl".into(),
            device_root: PathBuf::from("/dev/disk/by-uuid"),
        }
    }
}

impl SmartConfig {
    /// Nomes monitorados (minúsculas), na ordem configurada.
    pub fn watch_list(&self) -> Vec<String> {
        self.attributes
            .iter()
            .map(|a| a.name.to_lowercase())
            .collect()
    }

    /// Thresholds por atributo. Constante durante toda a execução.
    pub fn thresholds(&self) -> AttributeMap {
        self.attributes
            .iter()
            .map(|a| (a.name.to_lowercase(), a.threshold))
            .collect()
    }

    pub fn reports_initial(&self) -> bool {
        self.report_values && self.report_initial_values
    }

    pub fn reports_updated(&self) -> bool {
        self.report_values && self.report_updated_values
    }
}

/// Política de entrega e da fila de notificações.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Tentativas por mensagem
    pub attempts: u32,
    /// Espera entre tentativas (segundos)
    pub retry_delay_secs: u64,
    /// Espera máxima para enfileirar uma notificação (segundos)
    pub queue_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            attempts: 2,
            retry_delay_secs: 30,
            queue_timeout_secs: 3,
        }
    }
}

impl DispatchConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn queue_timeout(&self) -> Duration {
        Duration::from_secs(self.queue_timeout_secs)
    }
}

/// Onde fica o banco de drives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("drives.toml"),
        }
    }
}

/// Um drive na lista de um grupo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskConfig {
    pub name: String,
    pub uuid: String,
    #[serde(default)]
    pub mount_point: String,
}

/// Configuração raiz do monitor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub logging: LoggingConfig,
    pub smtp: SmtpConfig,
    pub email: EmailConfig,
    pub smart: SmartConfig,
    pub dispatch: DispatchConfig,
    pub storage: StorageConfig,
    /// Grupo → drives
    pub disks: BTreeMap<String, Vec<DiskConfig>>,
}

impl MonitorConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Configuração carregada de {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Drives configurados, na ordem dos grupos.
    pub fn devices(&self) -> Vec<Device> {
        self.disks
            .iter()
            .flat_map(|(group, disks)| {
                disks.iter().map(move |disk| Device {
                    key: disk.uuid.to_lowercase(),
                    name: disk.name.clone(),
                    group: group.to_uppercase(),
                    mount_point: disk.mount_point.clone(),
                })
            })
            .collect()
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let smart = &self.smart;

        if smart.attributes.is_empty() {
            errors.push("Nenhum atributo S.M.A.R.T. configurado em [smart].attributes".into());
        }

        let mut seen = HashSet::new();
        for attribute in &smart.attributes {
            let name = attribute.name.to_lowercase();
            if !is_column_name(&name) {
                errors.push(format!(
                    "Nome de atributo inválido: {:?} (use letras, dígitos e '_')",
                    attribute.name
                ));
            }
            if !seen.insert(name) {
                errors.push(format!("Atributo duplicado: {}", attribute.name));
            }
        }

        let columns = [smart.attribute_name, smart.raw_value, smart.when_failed];
        if columns[0] == columns[1] || columns[0] == columns[2] || columns[1] == columns[2] {
            errors.push(format!(
                "Índices de coluna repetidos: attribute_name={} raw_value={} when_failed={}",
                smart.attribute_name, smart.raw_value, smart.when_failed
            ));
        }
        if smart.failing_marker.trim().is_empty() {
            errors.push("failing_marker não pode ser vazio".into());
        }

        if !matches!(self.logging.format.as_str(), "full" | "compact") {
            errors.push(format!(
                "[logging].format inválido: {:?} (use \"full\" ou \"compact\")",
                self.logging.format
            ));
        }

        if self.email.sender.is_empty() {
            errors.push("[email].sender não pode ser vazio".into());
        }
        if self.dispatch.attempts == 0 {
            errors.push("[dispatch].attempts deve ser pelo menos 1".into());
        }

        let mut uuids = HashSet::new();
        for device in self.devices() {
            if device.key.is_empty() {
                errors.push(format!("Drive {} sem uuid", device.name));
            } else if !uuids.insert(device.key.clone()) {
                errors.push(format!("UUID duplicado: {}", device.key));
            }
        }

        errors
    }
}

fn is_column_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[email]
sender = "admin@example.com"

[smart]
report_initial_values = false

[[smart.attributes]]
name = "Reallocated_Sector_Ct"
threshold = 10

[[smart.attributes]]
name = "current_pending_sector"
threshold = 0

[disks]
nas = [
    { name = "disk1", uuid = "ABCD-1234", mount_point = "/mnt/disk1" },
    { name = "disk2", uuid = "ef01-5678" },
]
"#;

    #[test]
    fn partial_toml_uses_defaults() {
        let config = MonitorConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.smart.attribute_name, 1);
        assert_eq!(config.smart.raw_value, 9);
        assert_eq!(config.smart.when_failed, 8);
        assert_eq!(config.dispatch.attempts, 2);
        assert_eq!(config.dispatch.retry_delay(), Duration::from_secs(30));
        assert_eq!(config.smtp.port, 465);
        assert!(config.smart.report_values);
        assert!(!config.smart.reports_initial());
        assert!(config.smart.reports_updated());
    }

    #[test]
    fn sample_is_valid() {
        let config = MonitorConfig::from_toml(SAMPLE).unwrap();
        let errors = config.validate();
        assert!(errors.is_empty(), "Erros: {:?}", errors);
    }

    #[test]
    fn example_config_is_valid() {
        let config =
            MonitorConfig::from_toml(include_str!("../../../config.example.toml")).unwrap();
        let errors = config.validate();
        assert!(errors.is_empty(), "Erros: {:?}", errors);
        assert_eq!(config.devices().len(), 3);
        assert_eq!(config.smart.attributes.len(), 3);
    }

    #[test]
    fn devices_normalize_key_and_group() {
        let config = MonitorConfig::from_toml(SAMPLE).unwrap();
        let devices = config.devices();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].key, "abcd-1234");
        assert_eq!(devices[0].group, "NAS");
        assert_eq!(devices[0].mount_point, "/mnt/disk1");
        assert_eq!(devices[1].mount_point, "");
    }

    #[test]
    fn thresholds_follow_configured_order() {
        let config = MonitorConfig::from_toml(SAMPLE).unwrap();
        let thresholds = config.smart.thresholds();
        let entries: Vec<_> = thresholds.iter().collect();
        assert_eq!(
            entries,
            vec![("reallocated_sector_ct", 10), ("current_pending_sector", 0)]
        );
        assert_eq!(
            config.smart.watch_list(),
            vec!["reallocated_sector_ct", "current_pending_sector"]
        );
    }

    #[test]
    fn recipient_falls_back_to_sender() {
        let config = MonitorConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.email.recipient(), "admin@example.com");
    }

    #[test]
    fn validate_collects_every_problem() {
        let config = MonitorConfig::from_toml(
            r#"
[smart]
raw_value = 1

[[smart.attributes]]
name = "bad name"
threshold = 1

[[smart.attributes]]
name = "BAD NAME"
threshold = 2

[dispatch]
attempts = 0

[disks]
a = [{ name = "x", uuid = "same" }]
b = [{ name = "y", uuid = "SAME" }]
"#,
        )
        .unwrap();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.contains("inválido")));
        assert!(errors.iter().any(|e| e.contains("duplicado")));
        assert!(errors.iter().any(|e| e.contains("repetidos")));
        assert!(errors.iter().any(|e| e.contains("sender")));
        assert!(errors.iter().any(|e| e.contains("attempts")));
        assert!(errors.iter().any(|e| e.contains("UUID duplicado")));
    }

    #[test]
    fn logging_file_is_optional() {
        let config = MonitorConfig::from_toml("").unwrap();
        assert_eq!(config.logging.file(), None);
        assert_eq!(config.logging.backups, 9);

        let config = MonitorConfig::from_toml(
            r#"
[logging]
file = "/var/log/smart_monitor.log"
max_size_kb = 512
format = "verbose"
"#,
        )
        .unwrap();
        assert_eq!(
            config.logging.file(),
            Some(Path::new("/var/log/smart_monitor.log"))
        );
        assert_eq!(config.logging.max_size_kb, 512);
        assert!(config.validate().iter().any(|e| e.contains("[logging].format")));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = MonitorConfig::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn report_values_gates_both_report_kinds() {
        let mut smart = SmartConfig::default();
        assert!(smart.reports_initial() && smart.reports_updated());

        smart.report_updated_values = false;
        assert!(smart.reports_initial());
        assert!(!smart.reports_updated());

        smart.report_updated_values = true;
        smart.report_values = false;
        assert!(!smart.reports_initial());
        assert!(!smart.reports_updated());
    }

    #[test]
    fn credentials_require_both_fields() {
        let mut smtp = SmtpConfig::default();
        assert!(smtp.credentials().is_none());
        smtp.username = "user".into();
        assert!(smtp.credentials().is_none());
        smtp.password = "secret".into();
        assert_eq!(smtp.credentials(), Some(("user", "secret")));
    }
}
