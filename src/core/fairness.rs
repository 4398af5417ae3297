// FairMine - core/fairness.rs
//
// Share of protected cases among outliers and in the whole log.
// Case ids are counted distinct; outlier ids unknown to the log are ignored.

use crate::core::model::{EventLog, OutlierRow, Percentage};
use std::collections::{HashMap, HashSet};

/// Distinct case ids of `log` mapped to their protected flag. An id that
/// appears more than once counts as protected if any of its cases is.
fn protection_by_id(log: &EventLog) -> HashMap<&str, bool> {
    let mut by_id: HashMap<&str, bool> = HashMap::with_capacity(log.case_count());
    for case in log.cases() {
        *by_id.entry(case.id.as_str()).or_insert(false) |= case.protected;
    }
    by_id
}

/// Percentage of protected cases among `outliers`, or `Undefined` if no
/// outlier matches a case of `log`.
pub fn outlier_percentage(log: &EventLog, outliers: &[OutlierRow]) -> Percentage {
    let by_id = protection_by_id(log);
    let joined: HashSet<&str> = outliers
        .iter()
        .map(|o| o.case_id.as_str())
        .filter(|id| by_id.contains_key(id))
        .collect();
    let protected = joined.iter().filter(|id| by_id[*id]).count();
    Percentage::of(protected, joined.len())
}

/// Percentage of protected cases in the whole log.
pub fn baseline(log: &EventLog) -> Percentage {
    let by_id = protection_by_id(log);
    let protected = by_id.values().filter(|p| **p).count();
    Percentage::of(protected, by_id.len())
}

/// Distinct protected outlier ids, in log order.
pub fn protected_outliers(log: &EventLog, outliers: &[OutlierRow]) -> Vec<String> {
    let wanted: HashSet<&str> = outliers.iter().map(|o| o.case_id.as_str()).collect();
    let mut seen = HashSet::new();
    log.cases()
        .iter()
        .filter(|c| c.protected && wanted.contains(c.id.as_str()))
        .filter(|c| seen.insert(c.id.as_str()))
        .map(|c| c.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::test_support::case;

    fn hundred_cases() -> EventLog {
        let cases = (0..100)
            .map(|i| case(&format!("case{i}"), i % 5 == 0, &["a"]))
            .collect();
        EventLog::new(cases, None)
    }

    fn outliers(ids: impl IntoIterator<Item = String>) -> Vec<OutlierRow> {
        ids.into_iter()
            .map(|case_id| OutlierRow {
                case_id,
                is_fit: false,
            })
            .collect()
    }

    #[test]
    fn test_half_protected_outliers() {
        let log = hundred_cases();
        // 10 protected (multiples of 5) and 10 unprotected outliers.
        let ids = (0..50)
            .step_by(5)
            .map(|i| format!("case{i}"))
            .chain((1..11).map(|i| format!("case{i}")).filter(|s| s != "case5" && s != "case10"))
            .chain(["case11".to_string(), "case12".to_string()]);
        let outliers = outliers(ids);
        assert_eq!(outliers.len(), 20);
        assert_eq!(outlier_percentage(&log, &outliers), Percentage::Defined(50.0));
        assert_eq!(baseline(&log), Percentage::Defined(20.0));
    }

    #[test]
    fn test_empty_outliers_are_undefined() {
        let log = hundred_cases();
        assert_eq!(outlier_percentage(&log, &[]), Percentage::Undefined);
        assert_eq!(
            outlier_percentage(&log, &outliers(["ghost".to_string()])),
            Percentage::Undefined
        );
        assert_eq!(baseline(&EventLog::new(Vec::new(), None)), Percentage::Undefined);
    }

    #[test]
    fn test_duplicates_counted_once() {
        let log = hundred_cases();
        let outliers = outliers(["case0", "case0", "case1"].map(String::from));
        assert_eq!(outlier_percentage(&log, &outliers), Percentage::Defined(50.0));
    }

    #[test]
    fn test_protected_outliers_in_log_order() {
        let log = hundred_cases();
        let outliers = outliers(["case15", "case3", "case5", "case15"].map(String::from));
        assert_eq!(protected_outliers(&log, &outliers), vec!["case5", "case15"]);
    }
}
