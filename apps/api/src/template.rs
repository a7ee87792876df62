//! `{name}` placeholder substitution for prompt and query templates.

/// Fills `{name}` placeholders in one left-to-right pass.
///
/// Substituted values are never re-scanned, so user text containing
/// `{unit}` or `{search_context}` is copied as-is. Braces that do not form
/// a known placeholder (JSON examples in prompts) are left untouched.
pub fn fill_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        let value = after_open.find('}').and_then(|close| {
            let name = &after_open[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });

        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after_open[close + 1..];
            }
            None => {
                out.push('{');
                rest = after_open;
            }
        }
    }

    out.push_str(rest);
    out
}
