//! Fonte de telemetria S.M.A.R.T. consumida pelos workers.
//!
//! O pipeline não sabe como o relatório é coletado; recebe apenas os dois
//! blocos de texto (`smartctl -i` e `smartctl -A`) como strings imutáveis.

use crate::types::Device;
use std::path::{Path, PathBuf};

/// Resultado da resolução do caminho de um drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Found(PathBuf),
    /// Caminho esperado que não existe
    Missing(PathBuf),
}

/// Coletor de telemetria de drives.
pub trait TelemetrySource: Sync {
    /// Resolve o caminho do drive.
    fn locate(&self, device: &Device) -> Location;

    /// Bloco informativo (modelo, firmware, capacidade…).
    fn information(&self, path: &Path) -> std::io::Result<String>;

    /// Tabela de atributos.
    fn attributes(&self, path: &Path) -> std::io::Result<String>;
}

/// Troca a linha do número de série pelo caminho e ponto de montagem.
///
/// O relatório vai por e-mail; o número de série não deve sair da máquina.
pub fn redact_information(information: &str, device_path: &Path, mount_point: &str) -> String {
    let mut formatted = String::with_capacity(information.len());

    for line in information.split('\n') {
        if line.to_uppercase().contains("SERIAL NUMBER") {
            formatted.push_str(&format!("Device Location:  {}\n", device_path.display()));
            formatted.push_str(&format!("Mount Location:   {mount_point}\n"));
        } else {
            formatted.push_str(line);
            formatted.push('\n');
        }
    }

    formatted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_number_is_replaced() {
        let info = "=== START OF INFORMATION SECTION ===\n\
                    Device Model:     WDC WD40EFRX\n\
                    Serial Number:    WD-WCC4E1234567\n\
                    Firmware Version: 82.00A82";
        let out = redact_information(info, Path::new("/dev/disk/by-uuid/abcd"), "/mnt/disk1");

        assert!(!out.contains("WD-WCC4E1234567"));
        assert_eq!(
            out,
            "=== START OF INFORMATION SECTION ===\n\
             Device Model:     WDC WD40EFRX\n\
             Device Location:  /dev/disk/by-uuid/abcd\n\
             Mount Location:   /mnt/disk1\n\
             Firmware Version: 82.00A82\n"
        );
    }

    #[test]
    fn match_ignores_case() {
        let out = redact_information("SERIAL NUMBER: X1", Path::new("/dev/sda"), "");
        assert_eq!(out, "Device Location:  /dev/sda\nMount Location:   \n");
    }
}
