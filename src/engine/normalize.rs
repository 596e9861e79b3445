//! Query canonicalisation.

/// Lower-case and trim surrounding whitespace.
///
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
