//! Minimal CSV writing, matching the quoting rules spreadsheet imports
//! expect from semicolon-delimited exports.

use std::sync::OnceLock;

use regex::Regex;

pub const DELIMITER: char = ';';
const ENCLOSURE: char = '"';

fn needs_quotes(field: &str) -> bool {
    field.chars().any(|c| {
        c == DELIMITER
            || c == ENCLOSURE
            || matches!(c, '\\' | '\n' | '\r' | '\t' | ' ')
    })
}

/// Append one field, quoted if it contains a delimiter, a quote, whitespace
/// or a backslash. Embedded quotes are doubled.
fn write_field(out: &mut String, field: &str) {
    if !needs_quotes(field) {
        out.push_str(field);
        return;
    }

    out.push(ENCLOSURE);
    for c in field.chars() {
        if c == ENCLOSURE {
            out.push(ENCLOSURE);
        }
        out.push(c);
    }
    out.push(ENCLOSURE);
}

/// Append a full record, terminated by `\n`.
pub fn write_record<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    for (i, f) in fields.iter().enumerate() {
        if i > 0 {
            out.push(DELIMITER);
        }
        write_field(out, f.as_ref());
    }
    out.push('\n');
}

fn tag_regex() -> &'static Regex {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern"))
}

/// Remove markup tags from a cell.
pub fn strip_tags(text: &str) -> String {
    tag_regex().replace_all(text, "").into_owned()
}
