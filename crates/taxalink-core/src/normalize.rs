//! Name normalization for lookup keys.

/// Canonicalize a raw name into a lookup key.
///
/// Lower-cases the name, then removes double quotes and backslashes.
/// Whitespace is left untouched: `"\"Homo Sapiens\""` becomes `"homo sapiens"`
/// and `" Homo"` stays `" homo"`.
pub fn normalize(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| *c != '"' && *c != '\\')
        .collect()
}
