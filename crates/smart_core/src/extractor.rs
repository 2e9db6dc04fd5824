//! Extração de atributos da saída de `smartctl -A`.
//!
//! Cada linha é quebrada em tokens por espaço em branco. As posições das
//! colunas vêm da configuração:
//!
//! ```text
//! ID# ATTRIBUTE_NAME          FLAG     VALUE WORST THRESH TYPE      UPDATED  WHEN_FAILED RAW_VALUE
//!   5 Reallocated_Sector_Ct   0x0033   100   100   010    Pre-fail  Always       -       0
//!   0 1                       2        3     4     5      6         7            8       9
//! ```

use crate::config::SmartConfig;
use crate::types::AttributeMap;

/// Erros de parsing (fatais apenas para o drive avaliado).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("Linha {line}: valor bruto não numérico {value:?} para {attribute}")]
    NonNumeric {
        line: usize,
        attribute: String,
        value: String,
    },

    #[error("Linha {line}: coluna {column} ausente ({tokens} tokens)")]
    MissingColumn {
        line: usize,
        column: usize,
        tokens: usize,
    },
}

/// Atributos extraídos de um relatório.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    /// Atributos da watch-list
    pub watched: AttributeMap,
    /// Atributos marcados como falhando pelo próprio drive
    pub failing: AttributeMap,
}

/// Parser de relatórios de atributos.
#[derive(Debug, Clone)]
pub struct AttributeExtractor {
    attribute_name: usize,
    raw_value: usize,
    when_failed: usize,
    failing_marker: String,
    /// Nomes em maiúsculas para comparação sem caixa
    watch_list: Vec<String>,
}

impl AttributeExtractor {
    pub fn new(
        attribute_name: usize,
        raw_value: usize,
        when_failed: usize,
        failing_marker: &str,
        watch_list: &[String],
    ) -> Self {
        Self {
            attribute_name,
            raw_value,
            when_failed,
            failing_marker: failing_marker.to_uppercase(),
            watch_list: watch_list.iter().map(|w| w.to_uppercase()).collect(),
        }
    }

    pub fn from_config(config: &SmartConfig) -> Self {
        Self::new(
            config.attribute_name,
            config.raw_value,
            config.when_failed,
            &config.failing_marker,
            &config.watch_list(),
        )
    }

    /// Extrai os atributos monitorados e os que estão falhando.
    ///
    /// Uma linha entra em `watched` se algum nome da watch-list aparece em
    /// qualquer posição dela (sem caixa). Uma linha entra em `failing` se o
    /// token da coluna WHEN_FAILED é o marcador configurado. Em chaves
    /// repetidas vale o último valor, na posição da primeira ocorrência.
    pub fn extract(&self, report: &str) -> Result<Extracted, ExtractError> {
        let mut extracted = Extracted::default();

        for (index, line) in report.split('\n').enumerate() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let upper = line.to_uppercase();
            let line_no = index + 1;

            if self.watch_list.iter().any(|name| upper.contains(name.as_str())) {
                let (key, value) = self.read_entry(&tokens, line_no)?;
                extracted.watched.insert(key, value);
            }

            if self.is_failing(&tokens) {
                let (key, value) = self.read_entry(&tokens, line_no)?;
                extracted.failing.insert(key, value);
            }
        }

        Ok(extracted)
    }

    fn is_failing(&self, tokens: &[&str]) -> bool {
        tokens
            .get(self.when_failed)
            .is_some_and(|flag| flag.to_uppercase() == self.failing_marker)
    }

    fn read_entry(&self, tokens: &[&str], line: usize) -> Result<(String, u64), ExtractError> {
        let column = |column: usize| {
            tokens.get(column).copied().ok_or(ExtractError::MissingColumn {
                line,
                column,
                tokens: tokens.len(),
            })
        };

        let key = column(self.attribute_name)?.to_lowercase();
        let raw = column(self.raw_value)?;
        let value = raw.parse::<u64>().map_err(|_| ExtractError::NonNumeric {
            line,
            attribute: key.clone(),
            value: raw.to_string(),
        })?;

        Ok((key, value))
    }
}
