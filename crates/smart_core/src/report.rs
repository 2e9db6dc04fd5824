//! Composição dos relatórios enviados ao administrador.
//!
//! Três tipos de relatório, todos funções puras:
//! - [`initial_report`] – drive visto pela primeira vez
//! - [`update_report`] – drive conhecido cujos valores subiram
//! - [`missing_drive_report`] – caminho do drive não encontrado
//!
//! Tabelas têm largura fixa: recuo de 4 espaços, nome em 32 colunas e cada
//! valor intermediário em 20 colunas. A última coluna não recebe padding.

use crate::comparator::OrganizedAttributes;
use crate::types::{AttributeMap, Notification};
use std::path::Path;

const INDENT: &str = "    ";
const NAME_WIDTH: usize = 32;
const VALUE_WIDTH: usize = 20;
const SEPARATOR_WIDTH: usize = 80;

const FAILING_HEADING: &str = "The following attributes are currently marked as FAILING_NOW:";
const EXCEEDED_HEADING: &str =
    "The following attributes currently exceed their configured threshold:";
const UPDATED_HEADING: &str = "After comparing against their previously stored value, it has been determined that the following attributes have changed/been updated:";
const MONITORED_HEADING: &str = "The following attributes are being monitored and will generate a report whenever their value changes and the new value exceeds their configured threshold:";

/// Severidade de um relatório.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Normal,
    Warning,
    Failing,
}

impl Severity {
    /// Falhando tem precedência sobre threshold excedido.
    pub fn classify(organized: &OrganizedAttributes<'_>) -> Self {
        if !organized.failing.is_empty() {
            Severity::Failing
        } else if !organized.exceeded.is_empty() {
            Severity::Warning
        } else {
            Severity::Normal
        }
    }
}

/// Relatório de um drive novo (sem baseline).
pub fn initial_report(
    device_name: &str,
    information: &str,
    report: &str,
    organized: &OrganizedAttributes<'_>,
) -> Notification {
    let subject = match Severity::classify(organized) {
        Severity::Failing => format!("FAILING! INITIAL REPORT! SMART Monitor Report: {device_name}"),
        Severity::Warning => format!("WARNING! INITIAL REPORT! SMART Monitor Report: {device_name}"),
        Severity::Normal => format!("INITIAL REPORT! SMART Monitor Report: {device_name}"),
    };

    let columns = [("CONFIGURED_THRESHOLD", organized.thresholds)];
    let mut body = String::new();
    push_table(&mut body, FAILING_HEADING, organized.failing, &columns);
    push_table(&mut body, EXCEEDED_HEADING, &organized.exceeded, &columns);
    push_table(&mut body, MONITORED_HEADING, organized.watched, &columns);
    push_raw_report(&mut body, information, report);

    Notification::new(subject, body)
}

/// Relatório de um drive conhecido com valores atualizados.
pub fn update_report(
    device_name: &str,
    information: &str,
    report: &str,
    organized: &OrganizedAttributes<'_>,
) -> Notification {
    let subject = match Severity::classify(organized) {
        Severity::Failing => format!("FAILING! SMART Monitor Report: {device_name}"),
        Severity::Warning | Severity::Normal => {
            format!("WARNING! SMART Monitor Report: {device_name}")
        }
    };

    let columns = [
        ("PREVIOUS_VALUE", organized.baseline),
        ("CONFIGURED_THRESHOLD", organized.thresholds),
    ];
    let mut body = String::new();
    push_table(&mut body, FAILING_HEADING, organized.failing, &columns);
    push_table(&mut body, UPDATED_HEADING, &organized.updated, &columns);
    push_table(&mut body, EXCEEDED_HEADING, &organized.exceeded, &columns);
    push_raw_report(&mut body, information, report);

    Notification::new(subject, body)
}

/// Relatório de drive ausente.
pub fn missing_drive_report(device_name: &str, device_path: &Path) -> Notification {
    let subject = format!("ISSUE! Missing Drive Report: {device_name}");

    let mut body = format!(
        "Device could not be found using the following UUID path: {}\n\n",
        device_path.display()
    );
    body.push_str("The following are possible reasons this event may have occurred:\n");
    body.push_str(INDENT);
    body.push_str("~  UUID was not properly listed in configuration file. Please check the configuration file to guarantee the UUID for this device is correct.\n");
    body.push_str(INDENT);
    body.push_str("~  Device has been ejected from machine, therefore it is no longer accessible. This may have occurred through a user manually ejecting the device or the machine no longer recognizes the device because something is wrong with either the machine or the device hardware.\n");
    body.push_str(INDENT);
    body.push_str("~  The monitor may not have permission to stat the requested path, in which case the device is reported as missing even though it is present.");

    Notification::new(subject, body)
}

// ──────────────────────────────────────────────
// Renderização
// ──────────────────────────────────────────────

/// Tabela de atributos. Omitida se `rows` estiver vazio.
///
/// `columns` são as colunas de comparação após CURRENT_VALUE; chave sem
/// valor na coluna é renderizada como `-`.
fn push_table(
    body: &mut String,
    heading: &str,
    rows: &AttributeMap,
    columns: &[(&str, &AttributeMap)],
) {
    if rows.is_empty() {
        return;
    }

    body.push_str(heading);
    body.push('\n');

    let labels: Vec<String> = columns.iter().map(|(label, _)| label.to_string()).collect();
    push_row(body, "ATTRIBUTE_NAME", "CURRENT_VALUE", &labels);

    for (key, value) in rows.iter() {
        let cells: Vec<String> = columns
            .iter()
            .map(|(_, map)| map.get(key).map_or_else(|| "-".to_string(), |v| v.to_string()))
            .collect();
        push_row(body, key, &value.to_string(), &cells);
    }

    body.push_str("\n\n");
}

fn push_row(body: &mut String, name: &str, current: &str, cells: &[String]) {
    body.push_str(INDENT);
    body.push_str(&format!("{name:<NAME_WIDTH$}{current:<VALUE_WIDTH$}"));

    if let Some((last, middle)) = cells.split_last() {
        for cell in middle {
            body.push_str(&format!("{cell:<VALUE_WIDTH$}"));
        }
        body.push_str(last);
    }
    body.push('\n');
}

/// Separador, bloco informativo e o relatório de atributos sem as duas
/// primeiras linhas (cabeçalho de versão do smartctl).
fn push_raw_report(body: &mut String, information: &str, report: &str) {
    body.push('\n');
    body.push_str(&"*".repeat(SEPARATOR_WIDTH));
    body.push('\n');
    body.push_str(information);
    body.push_str(report.splitn(3, '\n').nth(2).unwrap_or(""));
}
