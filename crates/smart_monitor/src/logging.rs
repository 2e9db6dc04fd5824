//! Instalação do subscriber de logs.
//!
//! Sempre loga no stdout; com `[logging].file`, também num arquivo (sem
//! cores). A rotação por tamanho acontece na partida.

use smart_core::config::LoggingConfig;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Instala o subscriber global. `RUST_LOG` tem precedência sobre `level`.
pub fn init(config: &LoggingConfig) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let mut layers: Vec<BoxedLayer> = vec![styled(fmt::layer(), &config.format)];
    if let Some(path) = config.file() {
        let file = open(path, config.max_size_kb * 1024, config.backups)?;
        layers.push(styled(
            fmt::layer().with_ansi(false).with_writer(Mutex::new(file)),
            &config.format,
        ));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(io::Error::other)
}

type FullLayer<W> = fmt::Layer<Registry, fmt::format::DefaultFields, fmt::format::Format, W>;

fn styled<W>(layer: FullLayer<W>, format: &str) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        "compact" => layer.compact().boxed(),
        _ => layer.boxed(),
    }
}

fn open(path: &Path, max_bytes: u64, backups: u32) -> io::Result<File> {
    rotate(path, max_bytes, backups)?;
    OpenOptions::new().create(true).append(true).open(path)
}

fn backup(path: &Path, index: u32) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

/// Rotaciona `path` se ele passou de `max_bytes`: `path` vira `path.1`,
/// `path.1` vira `path.2` e assim por diante; o mais antigo é descartado.
/// Retorna se houve rotação.
fn rotate(path: &Path, max_bytes: u64, backups: u32) -> io::Result<bool> {
    if max_bytes == 0 {
        return Ok(false);
    }
    let size = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if size <= max_bytes {
        return Ok(false);
    }

    if backups == 0 {
        std::fs::remove_file(path)?;
        return Ok(true);
    }

    let oldest = backup(path, backups);
    if oldest.exists() {
        std::fs::remove_file(&oldest)?;
    }
    for index in (1..backups).rev() {
        let from = backup(path, index);
        if from.exists() {
            std::fs::rename(&from, backup(path, index + 1))?;
        }
    }
    std::fs::rename(path, backup(path, 1))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_file_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("monitor.log");
        std::fs::write(&log, b"abc").unwrap();

        assert!(!rotate(&log, 1024, 3).unwrap());
        assert!(!rotate(&log, 0, 3).unwrap());
        assert!(!rotate(&dir.path().join("absent.log"), 1, 3).unwrap());
        assert!(log.exists());
    }

    #[test]
    fn oversized_file_shifts_backups() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("monitor.log");
        std::fs::write(&log, b"current").unwrap();
        std::fs::write(backup(&log, 1), b"older").unwrap();
        std::fs::write(backup(&log, 2), b"oldest").unwrap();

        assert!(rotate(&log, 3, 2).unwrap());
        assert!(!log.exists());
        assert_eq!(std::fs::read_to_string(backup(&log, 1)).unwrap(), "current");
        assert_eq!(std::fs::read_to_string(backup(&log, 2)).unwrap(), "older");
        assert!(!backup(&log, 3).exists());
    }

    #[test]
    fn zero_backups_discards_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("monitor.log");
        std::fs::write(&log, b"current").unwrap();

        assert!(rotate(&log, 1, 0).unwrap());
        assert!(!log.exists());
        assert!(!backup(&log, 1).exists());
    }

    #[test]
    fn open_appends_after_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("monitor.log");
        std::fs::write(&log, b"0123456789").unwrap();

        let file = open(&log, 4, 9).unwrap();
        assert_eq!(file.metadata().unwrap().len(), 0);
        assert!(backup(&log, 1).exists());
    }
}
