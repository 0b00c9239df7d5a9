use std::collections::BTreeMap;

/// Parses `Key: Value` lines. Lines without a colon, or with an empty key or
/// value, are skipped.
pub fn parse_headers_text(text: &str) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if !key.is_empty() && !value.is_empty() {
            headers.insert(key.to_string(), value.to_string());
        }
    }
    headers
}
