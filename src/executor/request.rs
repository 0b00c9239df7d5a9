use crate::variables::TaskVariant;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Url};
use std::collections::BTreeMap;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A request ready to send, plus what the caller may want to report about it.
pub struct PreparedRequest {
    pub builder: RequestBuilder,
    /// Headers as sent, including any inferred `Content-Type`.
    pub headers: BTreeMap<String, String>,
    pub method: Method,
}

/// Builds the request for one variant. The error string is suitable for the
/// attempt's error field.
pub fn prepare(client: &Client, variant: &TaskVariant) -> Result<PreparedRequest, String> {
    let method_name = if variant.method.trim().is_empty() {
        "GET".to_string()
    } else {
        variant.method.trim().to_uppercase()
    };
    let method = Method::from_bytes(method_name.as_bytes())
        .map_err(|e| format!("invalid HTTP method '{}': {}", variant.method, e))?;
    let url = Url::parse(variant.url.trim())
        .map_err(|e| format!("invalid URL '{}': {}", variant.url, e))?;

    let mut headers = variant.headers.clone();
    if let Some(content_type) = infer_content_type(&method, &headers, &variant.body) {
        headers.insert(CONTENT_TYPE.as_str().to_string(), content_type.to_string());
    }

    let mut header_map = HeaderMap::with_capacity(headers.len());
    for (key, value) in &headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| format!("invalid header name '{}': {}", key, e))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| format!("invalid value for header '{}': {}", key, e))?;
        header_map.insert(name, value);
    }

    let mut builder = client.request(method.clone(), url).headers(header_map);
    if !variant.body.is_empty() {
        builder = builder.body(variant.body.clone());
    }

    Ok(PreparedRequest {
        builder,
        headers,
        method,
    })
}

/// Guesses a `Content-Type` for non-GET requests that carry a body but no
/// explicit type: `key=value&...` is form data, a leading `{` is JSON.
pub fn infer_content_type(
    method: &Method,
    headers: &BTreeMap<String, String>,
    body: &str,
) -> Option<&'static str> {
    if *method == Method::GET || body.is_empty() {
        return None;
    }
    if headers
        .keys()
        .any(|k| k.eq_ignore_ascii_case(CONTENT_TYPE.as_str()))
    {
        return None;
    }
    if body.contains('=') && body.contains('&') {
        Some(FORM_CONTENT_TYPE)
    } else if body.trim_start().starts_with('{') {
        Some(JSON_CONTENT_TYPE)
    } else {
        None
    }
}
