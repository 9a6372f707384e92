//! Identifier and literal quoting for the MySQL dialect.

/// Quotes an identifier with backticks.
#[must_use]
pub fn ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quotes several identifiers and joins them with `,`.
#[must_use]
pub fn ident_list<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| ident(n.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Quotes a string literal.
///
/// Backslashes are escaped and single quotes doubled. Assumes the server
/// does not run with `NO_BACKSLASH_ESCAPES`.
#[must_use]
pub fn string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "''");
    format!("'{escaped}'")
}
