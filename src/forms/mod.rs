//! Form input handling: sanitization and field validation

pub mod book_instance;

pub use book_instance::{BookInstanceForm, DeleteBookInstanceForm, FieldError, FieldErrors, SanitizedBookInstanceForm};

/// Neutralize HTML-significant characters in user input.
///
/// Escaped characters:
/// - `&` → `&amp;`
/// - `<` → `&lt;`
/// - `>` → `&gt;`
/// - `"` → `&quot;`
/// - `'` → `&#x27;`
/// - `/` → `&#x2F;`
/// - `\` → `&#x5C;`
/// - `` ` `` → `&#96;`
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            _ => out.push(c),
        }
    }
    out
}
