//! Comparação dos atributos atuais com o baseline persistido e os thresholds.

use crate::types::AttributeMap;

/// O baseline não tem uma coluna que está sendo monitorada.
///
/// Só acontece se a migração de schema não rodou antes da comparação.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Baseline sem a coluna {key:?}; o schema precisa ser migrado antes da comparação")]
pub struct MissingBaselineColumn {
    pub key: String,
}

/// Atributos classificados para os relatórios.
#[derive(Debug, Clone)]
pub struct OrganizedAttributes<'a> {
    pub failing: &'a AttributeMap,
    /// Monitorados cujo valor subiu em relação ao baseline
    pub updated: AttributeMap,
    /// Monitorados acima do threshold
    pub exceeded: AttributeMap,
    /// Relatório monitorado completo
    pub watched: &'a AttributeMap,
    pub baseline: &'a AttributeMap,
    pub thresholds: &'a AttributeMap,
}

/// `{ k: v ∈ watched | k ∈ baseline ∧ v > baseline[k] }`
pub fn updated(watched: &AttributeMap, baseline: &AttributeMap) -> AttributeMap {
    above(watched, baseline)
}

/// `{ k: v ∈ watched | k ∈ thresholds ∧ v > thresholds[k] }`
pub fn exceeded(watched: &AttributeMap, thresholds: &AttributeMap) -> AttributeMap {
    above(watched, thresholds)
}

fn above(watched: &AttributeMap, limits: &AttributeMap) -> AttributeMap {
    watched
        .iter()
        .filter(|(key, value)| limits.get(key).is_some_and(|limit| *value > limit))
        .collect()
}

/// Indica se algum atributo monitorado subiu em relação ao baseline.
///
/// O baseline precisa conter todas as chaves de `watched`.
pub fn update_needed(
    watched: &AttributeMap,
    baseline: &AttributeMap,
) -> Result<bool, MissingBaselineColumn> {
    let mut changed = false;
    for (key, value) in watched.iter() {
        let previous = baseline.get(key).ok_or_else(|| MissingBaselineColumn {
            key: key.to_string(),
        })?;
        changed |= value > previous;
    }
    Ok(changed)
}

/// Há motivo para avisar o administrador: algo acima do threshold ou falhando.
pub fn message_needed(organized: &OrganizedAttributes<'_>) -> bool {
    !organized.exceeded.is_empty() || !organized.failing.is_empty()
}

/// Classifica os atributos para os relatórios.
pub fn organize<'a>(
    watched: &'a AttributeMap,
    baseline: &'a AttributeMap,
    thresholds: &'a AttributeMap,
    failing: &'a AttributeMap,
) -> OrganizedAttributes<'a> {
    OrganizedAttributes {
        failing,
        updated: updated(watched, baseline),
        exceeded: exceeded(watched, thresholds),
        watched,
        baseline,
        thresholds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, u64)]) -> AttributeMap {
        entries.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn update_with_exceedance() {
        let baseline = map(&[("x", 5)]);
        let watched = map(&[("x", 10)]);
        let thresholds = map(&[("x", 8)]);
        let failing = AttributeMap::new();

        assert_eq!(update_needed(&watched, &baseline), Ok(true));

        let organized = organize(&watched, &baseline, &thresholds, &failing);
        assert_eq!(organized.exceeded, map(&[("x", 10)]));
        assert_eq!(organized.updated, map(&[("x", 10)]));
        assert!(message_needed(&organized));
    }

    #[test]
    fn equal_or_lower_values_are_not_updates() {
        let baseline = map(&[("a", 5), ("b", 9)]);
        let watched = map(&[("a", 5), ("b", 3)]);
        assert_eq!(update_needed(&watched, &baseline), Ok(false));
        assert!(updated(&watched, &baseline).is_empty());
    }

    #[test]
    fn missing_baseline_column_is_an_error() {
        let baseline = map(&[("a", 1)]);
        let watched = map(&[("a", 2), ("b", 0)]);
        assert_eq!(
            update_needed(&watched, &baseline),
            Err(MissingBaselineColumn { key: "b".into() })
        );
    }

    #[test]
    fn outputs_follow_watched_order_and_are_subsets() {
        let watched = map(&[("c", 30), ("a", 10), ("b", 20)]);
        let baseline = map(&[("a", 1), ("b", 50), ("c", 2)]);
        let thresholds = map(&[("b", 5), ("c", 5), ("z", 0)]);
        let failing = AttributeMap::new();
        let organized = organize(&watched, &baseline, &thresholds, &failing);

        let updated: Vec<_> = organized.updated.iter().collect();
        assert_eq!(updated, vec![("c", 30), ("a", 10)]);
        let exceeded: Vec<_> = organized.exceeded.iter().collect();
        assert_eq!(exceeded, vec![("c", 30), ("b", 20)]);

        for (key, value) in organized.exceeded.iter() {
            assert_eq!(watched.get(key), Some(value));
            assert!(value > thresholds.get(key).unwrap());
        }
        for (key, value) in organized.updated.iter() {
            assert_eq!(watched.get(key), Some(value));
            assert!(value > baseline.get(key).unwrap());
        }
    }

    #[test]
    fn empty_baseline_yields_no_updates() {
        let watched = map(&[("a", 4)]);
        let thresholds = map(&[("a", 10)]);
        let empty = AttributeMap::new();
        let organized = organize(&watched, &empty, &thresholds, &empty);
        assert!(organized.updated.is_empty());
        assert!(organized.exceeded.is_empty());
        assert!(!message_needed(&organized));
    }

    #[test]
    fn failing_alone_justifies_a_message() {
        let watched = map(&[("a", 4)]);
        let thresholds = map(&[("a", 10)]);
        let failing = map(&[("reallocated_sector_ct", 1)]);
        let empty = AttributeMap::new();
        let organized = organize(&watched, &empty, &thresholds, &failing);
        assert!(message_needed(&organized));
    }
}
