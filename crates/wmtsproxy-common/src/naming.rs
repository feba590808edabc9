//! Identifier helpers for generated configuration keys.

/// Remove characters that are unsafe in downstream configuration keys.
pub fn mangle_name(name: &str) -> String {
    name.replace(':', "_")
}

/// Replace every character outside `[A-Za-z0-9-_]` with `_`.
pub fn sanitize_identifier(value: &str) -> String {
    value
        .chars()
        .map(|ch| match ch {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' => ch,
            _ => '_',
        })
        .collect()
}
