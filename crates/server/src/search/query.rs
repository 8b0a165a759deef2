//! Turning a generated SQL template into executable statements
//!
//! Templates come straight from the model and are trusted as-is; the only
//! rewriting done here is binding the file location and dropping `LIMIT`
//! clauses for population queries.

use std::sync::LazyLock;

use docpilot_core::ClinicalError;
use regex::Regex;

/// Marker the model is told to use for the CSV location.
pub const FILE_PLACEHOLDER: &str = "{}";

static LIMIT_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+LIMIT\s+\d+").unwrap());

/// Escape a location for use inside a single-quoted SQL literal.
pub fn quote_location(location: &str) -> String {
    location.replace('\'', "''")
}

/// Substitute every placeholder in `template` with `location`.
pub fn bind_location(template: &str, location: &str) -> Result<String, ClinicalError> {
    if !template.contains(FILE_PLACEHOLDER) {
        return Err(ClinicalError::Query(format!(
            "Generated SQL has no '{FILE_PLACEHOLDER}' file placeholder: {template}"
        )));
    }
    Ok(template.replace(FILE_PLACEHOLDER, &quote_location(location)))
}

/// Remove every `LIMIT n` clause.
pub fn strip_limit(sql: &str) -> String {
    LIMIT_CLAUSE.replace_all(sql, "").into_owned()
}

/// Build one query over many files: the template bound once per location,
/// limits stripped, each branch parenthesized so it may keep its own
/// `ORDER BY`, branches joined with `UNION ALL`, one `LIMIT` at the end.
pub fn union_all(
    template: &str,
    locations: &[String],
    limit: usize,
) -> Result<String, ClinicalError> {
    if locations.is_empty() {
        return Err(ClinicalError::Storage("No patient data available".to_string()));
    }

    let mut parts = Vec::with_capacity(locations.len());
    for location in locations {
        let bound = bind_location(template, location)?;
        let stripped = strip_limit(&bound);
        parts.push(format!(
            "({})",
            stripped.trim().trim_end_matches(';').trim_end()
        ));
    }

    Ok(format!("{} LIMIT {}", parts.join(" UNION ALL "), limit))
}
