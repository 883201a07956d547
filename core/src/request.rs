//! Typed builder for REST requests against a resource template.
//!
//! A resource template is a path relative to the API base URL whose
//! segments may contain `{Name}` placeholders, e.g. `Accounts/{AccountSid}`.
//! Templates are parsed when the request is created. Placeholders are bound
//! when the request is built: an explicit `url_segment` wins, otherwise
//! `AccountSid` falls back to the caller's account from `ClientConfig`, and
//! anything still unbound is an error.

use url::Url;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};

/// Placeholder bound to the authenticated account when not set explicitly.
pub const ACCOUNT_SID_SEGMENT: &str = "AccountSid";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Placeholder(String),
}

fn is_dot_segment(segment: &str) -> bool {
    segment == "." || segment == ".."
}

/// A parsed resource path such as `Accounts/{AccountSid}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTemplate {
    raw: String,
    segments: Vec<Vec<Piece>>,
}

impl ResourceTemplate {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let invalid = || ApiError::InvalidTemplate(raw.to_string());
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let mut segments = Vec::new();
        for part in trimmed.split('/') {
            if part.is_empty() || is_dot_segment(part) {
                return Err(invalid());
            }
            let mut pieces = Vec::new();
            let mut rest = part;
            while !rest.is_empty() {
                match rest.find(|c: char| c == '{' || c == '}') {
                    None => {
                        pieces.push(Piece::Literal(rest.to_string()));
                        rest = "";
                    }
                    Some(idx) if rest.as_bytes()[idx] == b'}' => return Err(invalid()),
                    Some(open) => {
                        if open > 0 {
                            pieces.push(Piece::Literal(rest[..open].to_string()));
                        }
                        let after = &rest[open + 1..];
                        let close = after.find('}').ok_or_else(invalid)?;
                        let name = &after[..close];
                        if name.is_empty() || name.contains('{') {
                            return Err(invalid());
                        }
                        pieces.push(Piece::Placeholder(name.to_string()));
                        rest = &after[close + 1..];
                    }
                }
            }
            segments.push(pieces);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().flatten().filter_map(|piece| match piece {
            Piece::Placeholder(name) => Some(name.as_str()),
            Piece::Literal(_) => None,
        })
    }

    /// Substitute every placeholder, returning the raw (unencoded) path
    /// segments.
    fn render<'a>(
        &self,
        lookup: impl Fn(&str) -> Option<&'a str>,
    ) -> Result<Vec<String>, ApiError> {
        self.segments
            .iter()
            .map(|pieces| {
                let mut segment = String::new();
                let mut bound = None;
                for piece in pieces {
                    match piece {
                        Piece::Literal(text) => segment.push_str(text),
                        Piece::Placeholder(name) => {
                            let value = lookup(name.as_str()).ok_or_else(|| ApiError::UnboundSegment {
                                name: name.clone(),
                                resource: self.raw.clone(),
                            })?;
                            if value.is_empty() {
                                return Err(ApiError::InvalidSegment {
                                    name: name.clone(),
                                    value: value.to_string(),
                                });
                            }
                            segment.push_str(value);
                            bound = Some(name);
                        }
                    }
                }
                // `.` and `..` are dropped or resolved by url path handling.
                if let Some(name) = bound.filter(|_| is_dot_segment(&segment)) {
                    return Err(ApiError::InvalidSegment {
                        name: name.clone(),
                        value: segment,
                    });
                }
                Ok(segment)
            })
            .collect()
    }
}

/// A single API call: verb, resource, bindings, parameters and the root
/// element to unwrap from the response.
///
/// Parameters go in the query string for `GET` and in a form-encoded body
/// for `POST`, in insertion order.
#[derive(Debug, Clone)]
pub struct RestRequest {
    method: HttpMethod,
    resource: ResourceTemplate,
    url_segments: Vec<(String, String)>,
    parameters: Vec<(String, String)>,
    root_element: Option<String>,
}

impl RestRequest {
    pub fn new(method: HttpMethod, resource: &str) -> Result<Self, ApiError> {
        Ok(Self {
            method,
            resource: ResourceTemplate::parse(resource)?,
            url_segments: Vec::new(),
            parameters: Vec::new(),
            root_element: None,
        })
    }

    pub fn get(resource: &str) -> Result<Self, ApiError> {
        Self::new(HttpMethod::Get, resource)
    }

    pub fn post(resource: &str) -> Result<Self, ApiError> {
        Self::new(HttpMethod::Post, resource)
    }

    /// Bind a placeholder. Binding the same name twice keeps the last value.
    pub fn url_segment(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.url_segments.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.url_segments.push((name.to_string(), value)),
        }
        self
    }

    pub fn parameter(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parameters.push((name.to_string(), value.into()));
        self
    }

    pub fn root_element(mut self, name: &str) -> Self {
        self.root_element = Some(name.to_string());
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn resource(&self) -> &ResourceTemplate {
        &self.resource
    }

    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    pub fn root_element_name(&self) -> Option<&str> {
        self.root_element.as_deref()
    }

    /// Resolve the request against `ctx` into plain HTTP data.
    pub fn build(&self, ctx: &ClientConfig) -> Result<HttpRequest, ApiError> {
        let segments = self.resource.render(|name| {
            self.url_segments
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
                .or_else(|| (name == ACCOUNT_SID_SEGMENT).then(|| ctx.account_sid().as_str()))
        })?;

        let mut url = Url::parse(ctx.base_url())
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{}: {e}", ctx.base_url())))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(ctx.base_url().to_string()))?
            .pop_if_empty()
            .extend(&segments);

        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        let body = match self.method {
            HttpMethod::Get => {
                if !self.parameters.is_empty() {
                    url.query_pairs_mut().extend_pairs(&self.parameters);
                }
                None
            }
            HttpMethod::Post => {
                headers.push(("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()));
                Some(
                    url::form_urlencoded::Serializer::new(String::new())
                        .extend_pairs(&self.parameters)
                        .finish(),
                )
            }
        };

        Ok(HttpRequest {
            method: self.method,
            url: url.into(),
            headers,
            body,
        })
    }
}
