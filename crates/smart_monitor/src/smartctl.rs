//! Telemetria via `smartctl` (smartmontools).
//!
//! - `smartctl -i <dev>` – bloco informativo
//! - `smartctl -A <dev>` – tabela de atributos
//!
//! O exit code do smartctl é uma máscara de bits que fica diferente de zero
//! em situações normais (ex.: atributo que já falhou no passado), então a
//! saída é usada mesmo com status de erro.

use smart_core::{Device, Location, TelemetrySource};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Fonte de telemetria que executa o smartctl.
#[derive(Debug, Clone)]
pub struct SmartctlSource {
    command: String,
    device_root: PathBuf,
}

impl SmartctlSource {
    pub fn new(command: &str, device_root: &Path) -> Self {
        Self {
            command: command.to_string(),
            device_root: device_root.to_path_buf(),
        }
    }

    fn run(&self, flag: &str, path: &Path) -> std::io::Result<String> {
        let output = Command::new(&self.command).arg(flag).arg(path).output()?;

        if !output.status.success() {
            debug!(
                "{} {flag} {} -> {} (stderr: {})",
                self.command,
                path.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TelemetrySource for SmartctlSource {
    fn locate(&self, device: &Device) -> Location {
        let path = self.device_root.join(&device.key);
        if path.exists() {
            Location::Found(path)
        } else {
            Location::Missing(path)
        }
    }

    fn information(&self, path: &Path) -> std::io::Result<String> {
        self.run("-i", path)
    }

    fn attributes(&self, path: &Path) -> std::io::Result<String> {
        self.run("-A", path)
    }
}
