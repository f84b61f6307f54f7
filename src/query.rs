//! Query normalization: raw operator input to discrete lookup tokens.

/// Split free-text input into lookup tokens.
///
/// Runs of commas, semicolons and whitespace are treated as a single
/// separator. Order and case are preserved, duplicates are kept, empty
/// tokens are dropped. Separator-only input yields an empty vec, which
/// callers treat as "nothing to query".
pub fn normalize(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}
