use reqwest::{header::HeaderMap, Method};

use crate::{
    compression::{headers_for, ResponseTransform},
    ClientConfig,
};

/// Fully specified HTTP request for one query or insert.
///
/// Built fresh for every call and consumed when the request is sent.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    /// Query-string parameters in the order they are sent.
    pub params: Vec<(&'static str, String)>,
    pub headers: HeaderMap,
    pub body: Option<String>,
    pub transform: ResponseTransform,
}

impl RequestDescriptor {
    /// Builds a GET request for `query`.
    ///
    /// Unless `suppress_format` is set, ` FORMAT <fmt>` is appended to the
    /// query text after trimming trailing whitespace.
    pub fn build(config: &ClientConfig, query: &str, suppress_format: bool) -> Self {
        let query = if suppress_format {
            query.to_owned()
        } else {
            format!("{} FORMAT {}", query.trim_end(), config.format)
        };

        let mut params = vec![("query", query), ("database", config.database.clone())];
        if config.compression.is_enabled() {
            params.push(("enable_http_compression", "1".to_owned()));
        }

        Self {
            method: Method::GET,
            url: config.base_url(),
            params,
            headers: headers_for(config.compression),
            body: None,
            transform: ResponseTransform::for_compression(config.compression),
        }
    }

    /// Turns the request into a POST carrying `body`.
    pub fn with_body(mut self, body: String) -> Self {
        self.method = Method::POST;
        self.body = Some(body);
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}
