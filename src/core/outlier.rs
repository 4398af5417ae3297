// FairMine - core/outlier.rs
//
// Outlier selection: the worst-fitting fraction of cases, restricted to cases
// that do not conform.

use crate::core::model::{DiagnosticsRow, DiagnosticsTable, OutlierRow};
use std::cmp::Ordering;

/// Select up to `floor(fraction * rows)` rows with the lowest fitness, then
/// keep only those that are not fit.
///
/// Ties keep table order; NaN fitness sorts after every number. Tables with
/// too few rows for a single pick yield an empty, valid result.
pub fn worst_performing(table: &DiagnosticsTable, fraction: f64) -> Vec<OutlierRow> {
    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };
    let n = (fraction * table.len() as f64).floor() as usize;

    let mut ranked: Vec<&DiagnosticsRow> = table.rows.iter().collect();
    ranked.sort_by(|a, b| fitness_order(a.fitness, b.fitness));

    let outliers: Vec<OutlierRow> = ranked
        .into_iter()
        .take(n)
        .filter(|row| !row.is_fit)
        .map(|row| OutlierRow {
            case_id: row.case_id.clone(),
            is_fit: row.is_fit,
        })
        .collect();

    tracing::trace!(
        rows = table.len(),
        selected = n,
        outliers = outliers.len(),
        "Outliers selected"
    );
    outliers
}

fn fitness_order(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Detail, FitnessKey};

    fn table(fitness: &[f64]) -> DiagnosticsTable {
        DiagnosticsTable {
            key: FitnessKey::TraceFitness,
            rows: fitness
                .iter()
                .enumerate()
                .map(|(i, &f)| DiagnosticsRow {
                    case_id: format!("c{i}"),
                    fitness: f,
                    is_fit: f == 1.0,
                    detail: Detail::TokenReplay {
                        missing: 0,
                        consumed: 0,
                        remaining: 0,
                        produced: 0,
                    },
                })
                .collect(),
        }
    }

    fn ids(rows: &[OutlierRow]) -> Vec<&str> {
        rows.iter().map(|r| r.case_id.as_str()).collect()
    }

    #[test]
    fn test_selects_lowest_fitness_with_stable_ties() {
        let t = table(&[0.9, 0.5, 1.0, 0.5, 0.7, 1.0, 1.0, 1.0, 1.0, 0.2]);
        // floor(0.2 * 10) = 2
        assert_eq!(ids(&worst_performing(&t, 0.2)), vec!["c9", "c1"]);
        assert_eq!(ids(&worst_performing(&t, 0.35)), vec!["c9", "c1", "c3"]);
    }

    #[test]
    fn test_fit_rows_are_dropped_after_selection() {
        let t = table(&[1.0; 10]);
        assert!(worst_performing(&t, 0.2).is_empty());
    }

    #[test]
    fn test_small_tables_yield_nothing() {
        let t = table(&[0.1, 0.2, 0.3, 0.4]);
        assert!(worst_performing(&t, 0.2).is_empty());
    }

    #[test]
    fn test_nan_sorts_last() {
        let t = table(&[f64::NAN, 0.8, 0.9, 0.95, 0.99]);
        assert_eq!(ids(&worst_performing(&t, 0.2)), vec!["c1"]);
    }

    #[test]
    fn test_size_and_ordering_property() {
        // Deterministic pseudo-random fitness values.
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        for rows in [5usize, 17, 50, 123] {
            let values: Vec<f64> = (0..rows)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    if state % 4 == 0 {
                        1.0
                    } else {
                        (state % 1000) as f64 / 1000.0
                    }
                })
                .collect();
            let t = table(&values);
            let picked = worst_performing(&t, 0.2);
            assert!(picked.len() <= (0.2 * rows as f64).floor() as usize);

            let picked_ids: Vec<&str> = ids(&picked);
            let max_picked = t
                .rows
                .iter()
                .filter(|r| picked_ids.contains(&r.case_id.as_str()))
                .map(|r| r.fitness)
                .fold(f64::NEG_INFINITY, f64::max);
            let min_unfit_rest = t
                .rows
                .iter()
                .filter(|r| !r.is_fit && !picked_ids.contains(&r.case_id.as_str()))
                .map(|r| r.fitness)
                .fold(f64::INFINITY, f64::min);
            assert!(max_picked <= min_unfit_rest);
            assert!(picked.iter().all(|r| !r.is_fit));
        }
    }
}
