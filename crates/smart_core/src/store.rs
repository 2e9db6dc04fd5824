//! Banco de drives: baseline de atributos por UUID.
//!
//! Modelo lógico de uma tabela: colunas descritivas fixas (nome, grupo,
//! última atualização) mais uma coluna por atributo monitorado. Uma coluna
//! nova só pode ser comparada depois de [`DriveStore::ensure_schema`], que a
//! preenche com `0` em todos os registros existentes.

use crate::types::AttributeMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Erros do banco de drives.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Erro de I/O em {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Banco corrompido em {path}: {source}")]
    Decode {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Erro ao serializar o banco: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("Coluna desconhecida: {0}")]
    UnknownColumn(String),

    #[error("Drive não cadastrado: {0}")]
    UnknownDevice(String),

    #[error("Drive já cadastrado: {0}")]
    DuplicateDevice(String),

    #[error("Lock do banco envenenado por um worker que entrou em pânico")]
    Poisoned,
}

/// Interface do banco consumida pelo pipeline.
///
/// Cada worker escreve apenas o registro do próprio drive.
pub trait DriveStore: Send + Sync {
    /// Garante uma coluna por atributo. Retorna as colunas criadas.
    fn ensure_schema(&self, columns: &[String]) -> Result<Vec<String>, StoreError>;

    /// Baseline do drive, ou `None` se nunca foi visto.
    ///
    /// Colunas ausentes no registro ficam de fora do mapa; a comparação
    /// trata isso como baseline incompleto.
    fn get_baseline(&self, key: &str) -> Result<Option<AttributeMap>, StoreError>;

    fn insert(
        &self,
        key: &str,
        name: &str,
        group: &str,
        attributes: &AttributeMap,
    ) -> Result<(), StoreError>;

    fn update(&self, key: &str, attributes: &AttributeMap) -> Result<(), StoreError>;
}

// ──────────────────────────────────────────────
// Tabela
// ──────────────────────────────────────────────

/// Registro de um drive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveRecord {
    pub name: String,
    pub group: String,
    /// Segundos desde a época Unix
    pub last_updated: u64,
    pub attributes: BTreeMap<String, u64>,
}

/// Conteúdo completo do banco.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveTable {
    /// Colunas de atributo, na ordem de criação
    pub columns: Vec<String>,
    pub drives: BTreeMap<String, DriveRecord>,
}

impl DriveTable {
    fn ensure_schema(&mut self, columns: &[String]) -> Vec<String> {
        let mut added = Vec::new();
        for column in columns {
            if self.columns.contains(column) {
                continue;
            }
            self.columns.push(column.clone());
            for record in self.drives.values_mut() {
                record.attributes.insert(column.clone(), 0);
            }
            added.push(column.clone());
        }
        added
    }

    fn baseline(&self, key: &str) -> Option<AttributeMap> {
        let record = self.drives.get(key)?;
        Some(
            self.columns
                .iter()
                .filter_map(|c| record.attributes.get(c).map(|v| (c.as_str(), *v)))
                .collect(),
        )
    }

    fn check_columns(&self, attributes: &AttributeMap) -> Result<(), StoreError> {
        match attributes.keys().find(|k| !self.columns.iter().any(|c| c.as_str() == *k)) {
            Some(unknown) => Err(StoreError::UnknownColumn(unknown.to_string())),
            None => Ok(()),
        }
    }

    fn insert(
        &mut self,
        key: &str,
        name: &str,
        group: &str,
        attributes: &AttributeMap,
    ) -> Result<(), StoreError> {
        if self.drives.contains_key(key) {
            return Err(StoreError::DuplicateDevice(key.to_string()));
        }
        self.check_columns(attributes)?;

        let mut values: BTreeMap<String, u64> =
            self.columns.iter().map(|c| (c.clone(), 0)).collect();
        values.extend(attributes.iter().map(|(k, v)| (k.to_string(), v)));

        self.drives.insert(
            key.to_string(),
            DriveRecord {
                name: name.to_string(),
                group: group.to_string(),
                last_updated: now(),
                attributes: values,
            },
        );
        Ok(())
    }

    fn update(&mut self, key: &str, attributes: &AttributeMap) -> Result<(), StoreError> {
        self.check_columns(attributes)?;
        let record = self
            .drives
            .get_mut(key)
            .ok_or_else(|| StoreError::UnknownDevice(key.to_string()))?;

        record
            .attributes
            .extend(attributes.iter().map(|(k, v)| (k.to_string(), v)));
        record.last_updated = now();
        Ok(())
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn lock(table: &Mutex<DriveTable>) -> Result<MutexGuard<'_, DriveTable>, StoreError> {
    table.lock().map_err(|_| StoreError::Poisoned)
}

// ──────────────────────────────────────────────
// MemoryStore
// ──────────────────────────────────────────────

/// Banco em memória.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<DriveTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: DriveTable) -> Self {
        Self {
            table: Mutex::new(table),
        }
    }

    /// Cópia do conteúdo atual.
    pub fn snapshot(&self) -> Result<DriveTable, StoreError> {
        Ok(lock(&self.table)?.clone())
    }
}

impl DriveStore for MemoryStore {
    fn ensure_schema(&self, columns: &[String]) -> Result<Vec<String>, StoreError> {
        Ok(lock(&self.table)?.ensure_schema(columns))
    }

    fn get_baseline(&self, key: &str) -> Result<Option<AttributeMap>, StoreError> {
        Ok(lock(&self.table)?.baseline(key))
    }

    fn insert(
        &self,
        key: &str,
        name: &str,
        group: &str,
        attributes: &AttributeMap,
    ) -> Result<(), StoreError> {
        lock(&self.table)?.insert(key, name, group, attributes)
    }

    fn update(&self, key: &str, attributes: &AttributeMap) -> Result<(), StoreError> {
        lock(&self.table)?.update(key, attributes)
    }
}

// ──────────────────────────────────────────────
// TomlStore
// ──────────────────────────────────────────────

/// Banco persistido em um arquivo TOML.
///
/// Cada mutação regrava o arquivo inteiro (temporário + rename).
#[derive(Debug)]
pub struct TomlStore {
    path: PathBuf,
    table: Mutex<DriveTable>,
}

impl TomlStore {
    /// Abre o banco. Arquivo inexistente = banco vazio.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let table = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let table: DriveTable =
                toml::from_str(&content).map_err(|source| StoreError::Decode {
                    path: path.to_path_buf(),
                    source,
                })?;
            info!(
                "Banco carregado de {} ({} drives)",
                path.display(),
                table.drives.len()
            );
            table
        } else {
            info!("Banco {} não existe; iniciando vazio", path.display());
            DriveTable::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            table: Mutex::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, table: &DriveTable) -> Result<(), StoreError> {
        let content = toml::to_string_pretty(table)?;
        let tmp = self.path.with_extension("toml.tmp");
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        std::fs::write(&tmp, content).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        debug!("Banco salvo em {}", self.path.display());
        Ok(())
    }

    /// Aplica a mutação numa cópia; a memória só muda depois que o arquivo
    /// foi gravado.
    fn commit(
        &self,
        change: impl FnOnce(&mut DriveTable) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let mut table = lock(&self.table)?;
        let mut next = table.clone();
        change(&mut next)?;
        self.persist(&next)?;
        *table = next;
        Ok(())
    }
}

impl DriveStore for TomlStore {
    fn ensure_schema(&self, columns: &[String]) -> Result<Vec<String>, StoreError> {
        let mut table = lock(&self.table)?;
        let added = table.ensure_schema(columns);
        if !added.is_empty() || !self.path.exists() {
            self.persist(&table)?;
        }
        Ok(added)
    }

    fn get_baseline(&self, key: &str) -> Result<Option<AttributeMap>, StoreError> {
        Ok(lock(&self.table)?.baseline(key))
    }

    fn insert(
        &self,
        key: &str,
        name: &str,
        group: &str,
        attributes: &AttributeMap,
    ) -> Result<(), StoreError> {
        self.commit(|table| table.insert(key, name, group, attributes))
    }

    fn update(&self, key: &str, attributes: &AttributeMap) -> Result<(), StoreError> {
        self.commit(|table| table.update(key, attributes))
    }
}
