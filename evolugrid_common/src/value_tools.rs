//! Tools to help work with JSON cell values

use serde_json::Value;

/// One step of an accessor path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathStep<'a> {
    Key(&'a str),
    Index(&'a str),
}

fn split_path(path: &str) -> Option<Vec<PathStep<'_>>> {
    let mut ret = Vec::new();
    let mut rest = path;

    while !rest.is_empty() {
        if let Some(r) = rest.strip_prefix('[') {
            let end = r.find(']')?;
            ret.push(PathStep::Index(&r[..end]));
            rest = &r[end + 1..];
        } else {
            let rest_trim = rest.strip_prefix('.').unwrap_or(rest);
            let end = rest_trim.find(['.', '[']).unwrap_or(rest_trim.len());
            if end == 0 {
                return None;
            }
            ret.push(PathStep::Key(&rest_trim[..end]));
            rest = &rest_trim[end..];
        }
    }

    Some(ret)
}

/// Evaluate an accessor path against a value.
///
/// Paths are dotted property names (`customer.name`), bracketed keys or
/// indices (`[customer][name]`, `lines[0].amount`), or a mix of both.
/// Returns `None` when any step is missing.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(v) = value.as_object().and_then(|m| m.get(path)) {
        return Some(v);
    }

    let mut current = value;

    for step in split_path(path)? {
        current = match (step, current) {
            (PathStep::Key(k) | PathStep::Index(k), Value::Object(m)) => {
                m.get(k)?
            }
            (PathStep::Index(i), Value::Array(a)) => {
                a.get(i.parse::<usize>().ok()?)?
            }
            _ => return None,
        };
    }

    Some(current)
}

/// Text to display for a cell, or `None` when the cell should stay empty.
///
/// Null, `false` and the empty string are treated as absent. Numeric zero
/// is not: it displays as `"0"`.
pub fn display_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::Number(n) => {
            if n.as_f64() == Some(0.0) {
                Some("0".to_string())
            } else {
                Some(n.to_string())
            }
        }
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Flat string form of a value, as written to a CSV cell.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Escape text for inclusion in HTML content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn is_field_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'))
}

/// Replace `{field}` and `{{ field }}` placeholders in a template.
///
/// Placeholders that do not look like a field name are left as they are.
/// Fields the resolver cannot find render as the empty string.
pub fn interpolate<F>(template: &str, mut resolve: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        let (open, close) = if tail.starts_with("{{") {
            ("{{", "}}")
        } else {
            ("{", "}")
        };

        let inner = &tail[open.len()..];
        match inner.find(close) {
            Some(end) if is_field_name(inner[..end].trim()) => {
                let name = inner[..end].trim();
                out.push_str(&resolve(name).unwrap_or_default());
                rest = &inner[end + close.len()..];
            }
            _ => {
                out.push_str(open);
                rest = inner;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Field names referenced by a template's placeholders, in order of first
/// appearance.
pub fn template_fields(template: &str) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    interpolate(template, |name| {
        if !fields.iter().any(|f| f == name) {
            fields.push(name.to_string());
        }
        None
    });
    fields
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn paths() {
        let v = json!({
            "id": 4,
            "customer": {"name": "Ada"},
            "lines": [{"amount": 12.5}],
            "dotted.key": true
        });

        assert_eq!(lookup_path(&v, "id"), Some(&json!(4)));
        assert_eq!(lookup_path(&v, "customer.name"), Some(&json!("Ada")));
        assert_eq!(lookup_path(&v, "[customer][name]"), Some(&json!("Ada")));
        assert_eq!(lookup_path(&v, "lines[0].amount"), Some(&json!(12.5)));
        assert_eq!(lookup_path(&v, "dotted.key"), Some(&json!(true)));
        assert_eq!(lookup_path(&v, "lines[3].amount"), None);
        assert_eq!(lookup_path(&v, "missing"), None);
    }

    #[test]
    fn zero_is_displayed() {
        assert_eq!(display_text(&json!(0)), Some("0".to_string()));
        assert_eq!(display_text(&json!(0.0)), Some("0".to_string()));
        assert_eq!(display_text(&json!("")), None);
        assert_eq!(display_text(&Value::Null), None);
        assert_eq!(display_text(&json!(false)), None);
        assert_eq!(display_text(&json!(42)), Some("42".to_string()));
    }

    #[test]
    fn csv_text_follows_string_casts() {
        assert_eq!(scalar_text(&json!(true)), "1");
        assert_eq!(scalar_text(&json!(false)), "");
        assert_eq!(scalar_text(&Value::Null), "");
        assert_eq!(scalar_text(&json!(0)), "0");
    }

    #[test]
    fn escaping() {
        assert_eq!(
            escape_html(r#"<b class="x">Tom & 'Jerry'</b>"#),
            "&lt;b class=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn template_placeholders() {
        let row = json!({"id": 7, "name": "Bob"});
        let resolve =
            |k: &str| lookup_path(&row, k).and_then(display_text);

        assert_eq!(
            interpolate("<a href='show?id={id}'>{{ name }}</a>", resolve),
            "<a href='show?id=7'>Bob</a>"
        );
        assert_eq!(
            interpolate("{ not a field } {missing}!", |_| None),
            "{ not a field } !"
        );
    }

    #[test]
    fn fields_of_a_template() {
        assert_eq!(
            template_fields("<a href='e?id={id}&c={{ customer.name }}'>{id}</a>{ x y }"),
            vec!["id".to_string(), "customer.name".to_string()]
        );
        assert!(template_fields("no placeholders").is_empty());
    }
}
