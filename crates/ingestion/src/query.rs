//! Keyword normalization and query expression composition
//!
//! The pipeline receives an already-extracted keyword list as a
//! semicolon-separated string. Terms are normalized here and composed
//! into a boolean expression the bibliographic adapter understands:
//! terms are AND'd together, each OR'd with its vocabulary expansions.

use primelit_common::errors::{AppError, Result};
use std::collections::HashSet;

/// Split a raw keyword string on `;`, trim, drop empties, and
/// deduplicate case-insensitively while preserving first-seen casing.
pub fn normalize_keywords(raw: &str) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut terms = Vec::new();

    for part in raw.split(';') {
        let term = part.trim();
        if term.is_empty() {
            continue;
        }
        if seen.insert(term.to_lowercase()) {
            terms.push(term.to_string());
        }
    }

    if terms.is_empty() {
        Err(AppError::EmptyQuery)
    } else {
        Ok(terms)
    }
}

/// Case-insensitive dedup preserving order and first-seen casing.
pub fn dedup_case_insensitive(terms: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    terms
        .into_iter()
        .filter(|t| seen.insert(t.to_lowercase()))
        .collect()
}

/// Compose the boolean query expression: AND across groups, each group
/// an OR of a term with its expansions. Multi-word terms are quoted.
pub fn compose_expression(groups: &[Vec<String>]) -> String {
    groups
        .iter()
        .filter(|group| !group.is_empty())
        .map(|group| {
            let inner = group
                .iter()
                .map(|term| quote(term))
                .collect::<Vec<_>>()
                .join(" OR ");
            if group.len() > 1 {
                format!("({})", inner)
            } else {
                inner
            }
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn quote(term: &str) -> String {
    if term.contains(char::is_whitespace) {
        format!("\"{}\"", term)
    } else {
        term.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_splits_and_trims() {
        let terms = normalize_keywords("crispr; sickle cell ;; gene therapy ").unwrap();
        assert_eq!(terms, vec!["crispr", "sickle cell", "gene therapy"]);
    }

    #[test]
    fn test_normalize_dedupes_case_insensitively() {
        let terms = normalize_keywords("CRISPR; crispr; Crispr; cas9").unwrap();
        // First-seen casing wins
        assert_eq!(terms, vec!["CRISPR", "cas9"]);
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(matches!(
            normalize_keywords(" ;  ; "),
            Err(AppError::EmptyQuery)
        ));
        assert!(matches!(normalize_keywords(""), Err(AppError::EmptyQuery)));
    }

    #[test]
    fn test_compose_single_terms() {
        let groups = vec![vec!["crispr".to_string()], vec!["cas9".to_string()]];
        assert_eq!(compose_expression(&groups), "crispr AND cas9");
    }

    #[test]
    fn test_compose_quotes_phrases_and_groups_expansions() {
        let groups = vec![
            vec!["crispr".to_string(), "crispr-cas systems".to_string()],
            vec!["sickle cell".to_string()],
        ];
        assert_eq!(
            compose_expression(&groups),
            "(crispr OR \"crispr-cas systems\") AND \"sickle cell\""
        );
    }

    #[test]
    fn test_compose_skips_empty_groups() {
        let groups = vec![vec![], vec!["crispr".to_string()]];
        assert_eq!(compose_expression(&groups), "crispr");
    }

    #[test]
    fn test_dedup_preserves_order() {
        let terms = vec![
            "Anemia".to_string(),
            "anemia".to_string(),
            "Hemoglobin".to_string(),
        ];
        assert_eq!(dedup_case_insensitive(terms), vec!["Anemia", "Hemoglobin"]);
    }
}
