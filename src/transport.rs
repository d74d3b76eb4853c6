use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::Method as ReqwestMethod;
use serde_json::Value;

use crate::error::ApiError;
use crate::http_client::http_client;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    File {
        field: String,
        file_name: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self::with_json(Method::Post, url, body)
    }

    pub fn with_json(method: Method, url: impl Into<String>, body: Value) -> Self {
        Self {
            method,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: RequestBody::Json(body),
        }
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            url: url.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Copy of the request with `name` replaced (or added).
    pub fn with_header(&self, name: &str, value: &str) -> Self {
        let mut out = self.clone();
        out.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        out.headers.push((name.to_string(), value.to_string()));
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|err| ApiError::Decode(err.to_string()))
    }

    /// Turns a non-2xx response into an error carrying the body text.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_status(self.status, self.body))
        }
    }
}

/// One attempt per call. Network failures surface as `ApiError::Network`;
/// any HTTP status (including 4xx/5xx) is a successful send.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let client = http_client(self.timeout).map_err(|err| ApiError::Network(err.to_string()))?;
        let method = match request.method {
            Method::Get => ReqwestMethod::GET,
            Method::Post => ReqwestMethod::POST,
            Method::Patch => ReqwestMethod::PATCH,
            Method::Delete => ReqwestMethod::DELETE,
        };

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let (Ok(name), Ok(value)) = (
                reqwest::header::HeaderName::from_bytes(name.as_bytes()),
                reqwest::header::HeaderValue::from_str(value),
            ) else {
                log::warn!("dropping malformed header {name}");
                continue;
            };
            headers.insert(name, value);
        }

        let mut builder = client.request(method, &request.url);
        builder = match &request.body {
            RequestBody::Empty => builder.headers(headers),
            RequestBody::Json(value) => builder.headers(headers).json(value),
            RequestBody::File {
                field,
                file_name,
                bytes,
            } => {
                // reqwest sets the multipart boundary itself.
                headers.remove(CONTENT_TYPE);
                let part = Part::bytes(bytes.clone()).file_name(file_name.clone());
                builder
                    .headers(headers)
                    .multipart(Form::new().part(field.clone(), part))
            }
        };

        let resp = builder
            .send()
            .map_err(|err| ApiError::Network(err.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .map_err(|err| ApiError::Network(format!("failed reading body: {err}")))?;
        log::debug!("{:?} {} -> {}", request.method, request.url, status);
        Ok(HttpResponse { status, body })
    }
}
