//! Tipos compartilhados do pipeline de avaliação.
//!
//! [`AttributeMap`] preserva a ordem de primeira ocorrência das chaves, que é
//! a ordem usada na renderização das tabelas dos relatórios.

// ──────────────────────────────────────────────
// Device
// ──────────────────────────────────────────────

/// Um drive configurado. Imutável durante a execução.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Chave única do drive (UUID em minúsculas)
    pub key: String,
    /// Nome de exibição
    pub name: String,
    /// Grupo administrativo (em maiúsculas)
    pub group: String,
    /// Ponto de montagem
    pub mount_point: String,
}

// ──────────────────────────────────────────────
// AttributeMap
// ──────────────────────────────────────────────

/// Mapa ordenado `atributo → valor bruto`.
///
/// A ordem de iteração é a ordem em que cada chave foi vista pela primeira
/// vez. Reinserir uma chave substitui o valor mas mantém a posição.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: Vec<(String, u64)>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insere ou substitui o valor de `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: u64) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>> FromIterator<(K, u64)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        let mut map = AttributeMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

// ──────────────────────────────────────────────
// Notification
// ──────────────────────────────────────────────

/// Mensagem pronta para o administrador.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
