//! Similarity scoring for "did you mean" suggestions.

use crate::model::normalize_name;

/// Name with its `{placeholder}` slots removed, normalized.
///
/// `"kill port {port}"` becomes `"kill port"`.
pub fn detemplate(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut depth = 0usize;
    for c in name.chars() {
        match c {
            '{' => depth += 1,
            '}' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    normalize_name(&out)
}

/// Normalized edit-distance similarity in `[0, 1]`, computed on normalized
/// forms of both strings.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&normalize_name(a), &normalize_name(b))
}

/// Best of the similarity to the name as written and to its de-templated form
pub fn score(input: &str, name: &str) -> f64 {
    let exact = similarity(input, name);
    let stripped = detemplate(name);
    if stripped.is_empty() {
        return exact;
    }
    exact.max(strsim::normalized_levenshtein(&normalize_name(input), &stripped))
}

/// Highest-scoring name strictly above `threshold`. Ties go to the earlier name.
pub fn best_match<'a, I>(input: &str, names: I, threshold: f64) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, f64)> = None;
    for name in names {
        let s = score(input, name);
        if s > threshold && best.map_or(true, |(_, top)| s > top) {
            best = Some((name, s));
        }
    }
    best
}
