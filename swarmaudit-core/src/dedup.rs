//! Finding deduplication
//!
//! Collapses findings that describe the same issue, keeping the highest
//! severity version and merging the files it was reported in.
//!
//! Two strategies are provided:
//!
//! - [`dedupe`] groups by normalized title. One finding is emitted per title,
//!   carrying the union of every member's paths and the severity of the
//!   highest-ranked member (earliest arrival wins ties).
//! - [`dedupe_per_location`] keys on `(normalized title, path)` pairs and lets a
//!   single finding stand for several keys at once. Path unions land on the
//!   finding itself, so they show up at every key that finding represents.
//!   Findings live in an index arena and keys point at slots, which gives that
//!   sharing without shared mutable references.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Finding;

/// Which merge rule to apply to a batch of findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupStrategy {
    /// One finding per normalized title
    #[default]
    ByTitle,
    /// One representative per (normalized title, path) key
    PerLocation,
}

impl DedupStrategy {
    /// Run the selected deduplication over a batch
    pub fn apply(self, findings: Vec<Finding>) -> Vec<Finding> {
        match self {
            DedupStrategy::ByTitle => dedupe(findings),
            DedupStrategy::PerLocation => dedupe_per_location(findings),
        }
    }
}

/// Deduplicate by normalized title
pub fn dedupe(findings: Vec<Finding>) -> Vec<Finding> {
    let input_count = findings.len();

    // Pass 1: group by title, tracking the representative and the path union
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut representatives: Vec<Finding> = Vec::new();
    let mut path_unions: Vec<BTreeSet<String>> = Vec::new();

    for finding in findings {
        debug_assert!(
            !finding.file_paths.is_empty(),
            "finding '{}' has no file paths",
            finding.title
        );

        let key = finding.normalized_title();
        match slots.get(&key) {
            Some(&slot) => {
                path_unions[slot].extend(finding.file_paths.iter().cloned());
                if finding.severity.outranks(&representatives[slot].severity) {
                    representatives[slot] = finding;
                }
            }
            None => {
                slots.insert(key, representatives.len());
                path_unions.push(finding.file_paths.clone());
                representatives.push(finding);
            }
        }
    }

    // Pass 2: emit one finding per group
    let deduped: Vec<Finding> = representatives
        .into_iter()
        .zip(path_unions)
        .map(|(mut finding, paths)| {
            finding.file_paths = paths;
            finding
        })
        .collect();

    debug!("Deduplicated {} findings into {}", input_count, deduped.len());
    deduped
}

/// Deduplicate by `(normalized title, path)` keys with shared representatives
pub fn dedupe_per_location(findings: Vec<Finding>) -> Vec<Finding> {
    let input_count = findings.len();

    let mut arena: Vec<Finding> = Vec::with_capacity(findings.len());
    let mut keys: HashMap<(String, String), usize> = HashMap::new();
    let mut key_order: Vec<(String, String)> = Vec::new();

    for finding in findings {
        debug_assert!(
            !finding.file_paths.is_empty(),
            "finding '{}' has no file paths",
            finding.title
        );

        let incoming = arena.len();
        let title = finding.normalized_title();
        // Iterate the paths as they were on arrival; later unions rebind the set
        let paths: Vec<String> = finding.file_paths.iter().cloned().collect();
        arena.push(finding);

        for path in paths {
            let key = (title.clone(), path);
            let Some(&existing) = keys.get(&key) else {
                keys.insert(key.clone(), incoming);
                key_order.push(key);
                continue;
            };

            if arena[incoming].severity.outranks(&arena[existing].severity) {
                keys.insert(key.clone(), incoming);
            }

            let merged: BTreeSet<String> = arena[existing]
                .file_paths
                .union(&arena[incoming].file_paths)
                .cloned()
                .collect();
            let winner = keys[&key];
            arena[winner].file_paths = merged;
        }
    }

    let mut emitted: HashSet<usize> = HashSet::new();
    let mut order: Vec<usize> = Vec::new();
    for key in &key_order {
        let slot = keys[key];
        if emitted.insert(slot) {
            order.push(slot);
        }
    }

    let mut arena: Vec<Option<Finding>> = arena.into_iter().map(Some).collect();
    let deduped: Vec<Finding> = order
        .into_iter()
        .filter_map(|slot| arena[slot].take())
        .collect();

    debug!(
        "Deduplicated {} findings into {} (per location)",
        input_count,
        deduped.len()
    );
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Severity;

    fn finding(title: &str, severity: Severity, paths: &[&str]) -> Finding {
        let mut f = Finding::new(title, severity, paths[0], "test-agent");
        for path in &paths[1..] {
            f = f.with_path(*path);
        }
        f
    }

    fn paths(f: &Finding) -> Vec<&str> {
        f.file_paths.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_reentrancy_merge() {
        let findings = vec![
            finding("Reentrancy Bug", Severity::High, &["A.sol"]),
            finding("  reentrancy bug ", Severity::Critical, &["B.sol"]),
        ];

        let deduped = dedupe(findings);

        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].severity, Severity::Critical);
        assert_eq!(paths(&deduped[0]), vec!["A.sol", "B.sol"]);
    }

    #[test]
    fn test_distinct_titles_untouched() {
        let findings = vec![
            finding("Reentrancy", Severity::High, &["A.sol"]),
            finding("Oracle Manipulation", Severity::Medium, &["A.sol"]),
            finding("Unchecked Return", Severity::Low, &["B.sol"]),
        ];

        let deduped = dedupe(findings.clone());
        assert_eq!(deduped, findings);
    }

    #[test]
    fn test_max_severity_and_path_union() {
        let findings = vec![
            finding("Overflow", Severity::Low, &["A.sol", "B.sol"]),
            finding("overflow", Severity::Critical, &["B.sol"]),
            finding("OVERFLOW", Severity::Medium, &["B.sol", "C.sol"]),
        ];

        let deduped = dedupe(findings);

        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].severity, Severity::Critical);
        assert_eq!(deduped[0].title, "overflow");
        assert_eq!(paths(&deduped[0]), vec!["A.sol", "B.sol", "C.sol"]);
    }

    #[test]
    fn test_equal_severity_keeps_earliest() {
        let first = finding("Access Control", Severity::High, &["A.sol"]).with_line(10);
        let second = finding("access control", Severity::High, &["A.sol"]).with_line(99);

        let deduped = dedupe(vec![first, second]);

        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].line_number, 10);
    }

    #[test]
    fn test_unrecognized_severity_never_wins() {
        let findings = vec![
            finding("Frontrun", Severity::Informational, &["A.sol"]),
            finding("Frontrun", Severity::from("Severe"), &["A.sol"]),
        ];

        let deduped = dedupe(findings);
        assert_eq!(deduped[0].severity, Severity::Informational);
    }

    #[test]
    fn test_dedupe_idempotent() {
        let findings = vec![
            finding("Reentrancy", Severity::High, &["A.sol"]),
            finding("reentrancy", Severity::Critical, &["B.sol"]),
            finding("DoS", Severity::Medium, &["C.sol"]),
            finding("dos ", Severity::Low, &["C.sol", "D.sol"]),
        ];

        let once = dedupe(findings);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_first_seen_order() {
        let findings = vec![
            finding("B", Severity::Low, &["x.sol"]),
            finding("A", Severity::Low, &["x.sol"]),
            finding("b", Severity::High, &["y.sol"]),
        ];

        let titles: Vec<String> = dedupe(findings).into_iter().map(|f| f.title).collect();
        assert_eq!(titles, vec!["b".to_string(), "A".to_string()]);
    }

    #[test]
    fn test_per_location_keeps_disjoint_paths_apart() {
        let findings = vec![
            finding("Reentrancy Bug", Severity::High, &["A.sol"]),
            finding("reentrancy bug", Severity::Critical, &["B.sol"]),
        ];

        let deduped = dedupe_per_location(findings);
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn test_per_location_merges_overlap() {
        let findings = vec![
            finding("Reentrancy", Severity::High, &["A.sol"]),
            finding("reentrancy", Severity::Critical, &["A.sol", "B.sol"]),
        ];

        let deduped = dedupe_per_location(findings);

        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].severity, Severity::Critical);
        assert_eq!(paths(&deduped[0]), vec!["A.sol", "B.sol"]);
    }

    #[test]
    fn test_per_location_union_visible_through_sibling_key() {
        // First finding represents both (t, A) and (t, B). Merging at (t, A)
        // grows its path set, which (t, B) sees as well.
        let findings = vec![
            finding("Oracle", Severity::High, &["A.sol", "B.sol"]),
            finding("oracle", Severity::Low, &["A.sol", "C.sol"]),
        ];

        let deduped = dedupe_per_location(findings);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].severity, Severity::High);
        assert_eq!(paths(&deduped[0]), vec!["A.sol", "B.sol", "C.sol"]);
        // The low-severity finding still owns (t, C)
        assert_eq!(deduped[1].severity, Severity::Low);
    }

    #[test]
    fn test_strategy_dispatch() {
        let findings = vec![
            finding("Reentrancy", Severity::High, &["A.sol"]),
            finding("reentrancy", Severity::High, &["B.sol"]),
        ];

        assert_eq!(DedupStrategy::ByTitle.apply(findings.clone()).len(), 1);
        assert_eq!(DedupStrategy::PerLocation.apply(findings).len(), 2);
        assert_eq!(DedupStrategy::default(), DedupStrategy::ByTitle);
    }

    #[cfg(debug_assertions)]
    fn pathless(title: &str) -> Finding {
        let mut f = finding(title, Severity::High, &["A.sol"]);
        f.file_paths.clear();
        f
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "has no file paths")]
    fn test_dedupe_rejects_pathless_finding() {
        dedupe(vec![pathless("Reentrancy")]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "has no file paths")]
    fn test_per_location_rejects_pathless_finding() {
        dedupe_per_location(vec![pathless("Reentrancy")]);
    }
}
