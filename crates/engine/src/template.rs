//! Substitution of one work item into a command or prompt template.

/// Token replaced by the work item.
pub const PLACEHOLDER: &str = "$item";

/// How the item is embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionMode {
    /// The item becomes a single, single-quoted shell word.
    Shell,
    /// The item is inserted verbatim into natural-language text.
    Prompt,
}

/// Quote a value as one POSIX shell word.
///
/// Embedded single quotes close the quoted span, emit an escaped quote and
/// reopen it, so `it's` becomes `'it'\''s'`.
pub fn shell_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

/// Replace every placeholder occurrence in `template` with `item`.
///
/// A template without the placeholder is returned unchanged.
pub fn expand(template: &str, item: &str, mode: ExpansionMode) -> String {
    match mode {
        ExpansionMode::Shell => template.replace(PLACEHOLDER, &shell_quote(item)),
        ExpansionMode::Prompt => template.replace(PLACEHOLDER, item),
    }
}
