//! # Context Snapshotter
//!
//! Ambient request/environment state attached to each record.
//!
//! Ordinary faults keep only an allow-list of request-describing fields.
//! Fatal dumps keep everything except a deny-list of infrastructure fields,
//! because a fatal fault has no further chance to recover context.

use std::collections::BTreeMap;

/// Sorted key/value snapshot
pub type FieldMap = BTreeMap<String, String>;

/// Fields retained for non-fatal records
pub const RETAINED_FIELDS: &[&str] = &[
    "CONTENT_TYPE",
    "HTTP_HOST",
    "HTTP_REFERER",
    "REDIRECT_QUERY_STRING",
    "REQUEST_METHOD",
    "REQUEST_URI",
    "SCRIPT_FILENAME",
];

/// Fields dropped from fatal dumps
pub const FATAL_EXCLUDED_FIELDS: &[&str] = &[
    // Server identity
    "DOCUMENT_ROOT",
    "GATEWAY_INTERFACE",
    "SERVER_PROTOCOL",
    "SERVER_SIGNATURE",
    "SERVER_PORT",
    "SERVER_NAME",
    "SERVER_ADMIN",
    "SERVER_SOFTWARE",
    "SERVER_ADDR",
    // Client negotiation headers
    "HTTP_ACCEPT",
    "HTTP_ACCEPT_ENCODING",
    "HTTP_ACCEPT_LANGUAGE",
    "HTTP_CACHE_CONTROL",
    "HTTP_CONNECTION",
    "HTTP_USER_AGENT",
    // Process
    "PATH",
    "REQUEST_TIME",
];

/// Field retention policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    Allow(&'static [&'static str]),
    Deny(&'static [&'static str]),
}

impl FieldPolicy {
    pub const NON_FATAL: Self = FieldPolicy::Allow(RETAINED_FIELDS);
    pub const FATAL: Self = FieldPolicy::Deny(FATAL_EXCLUDED_FIELDS);

    pub fn for_class(fatal: bool) -> Self {
        if fatal {
            Self::FATAL
        } else {
            Self::NON_FATAL
        }
    }

    pub fn retains(&self, key: &str) -> bool {
        match self {
            FieldPolicy::Allow(names) => names.iter().any(|n| *n == key),
            FieldPolicy::Deny(names) => !names.iter().any(|n| *n == key),
        }
    }

    /// Apply the policy to a map, keeping key order
    pub fn filter(&self, fields: &FieldMap) -> FieldMap {
        fields
            .iter()
            .filter(|(k, _)| self.retains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Provider of ambient state at the moment a fault is recorded
pub trait ContextSource: Send + Sync {
    /// Server/environment fields
    fn ambient(&self) -> FieldMap;

    /// Request parameters (only used by fatal dumps)
    fn request(&self) -> FieldMap;
}

/// Reads the process environment, CGI style.
///
/// Request parameters come from `QUERY_STRING`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl ContextSource for ProcessEnvironment {
    fn ambient(&self) -> FieldMap {
        std::env::vars_os()
            .map(|(k, v)| {
                (
                    k.to_string_lossy().into_owned(),
                    v.to_string_lossy().into_owned(),
                )
            })
            .collect()
    }

    fn request(&self) -> FieldMap {
        std::env::var("QUERY_STRING")
            .map(|qs| parse_query_string(&qs))
            .unwrap_or_default()
    }
}

/// Fixed context collected by the host
#[derive(Debug, Clone, Default)]
pub struct StaticContext {
    pub ambient: FieldMap,
    pub request: FieldMap,
}

impl StaticContext {
    pub fn new<I, K, V>(ambient: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            ambient: ambient
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            request: FieldMap::new(),
        }
    }

    pub fn with_request<I, K, V>(mut self, request: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.request = request
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }
}

impl ContextSource for StaticContext {
    fn ambient(&self) -> FieldMap {
        self.ambient.clone()
    }

    fn request(&self) -> FieldMap {
        self.request.clone()
    }
}

/// Filtered ambient snapshot for a fault class
pub fn snapshot(source: &dyn ContextSource, fatal: bool) -> FieldMap {
    FieldPolicy::for_class(fatal).filter(&source.ambient())
}

/// Parse `a=1&b=two+words` into a map. Later duplicates win.
pub fn parse_query_string(qs: &str) -> FieldMap {
    qs.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (form_decode(k), form_decode(v)),
            None => (form_decode(pair), String::new()),
        })
        .collect()
}

/// Form decoding: `+` is a space, then percent escapes. Malformed escapes
/// stay literal and invalid UTF-8 is replaced.
fn form_decode(input: &str) -> String {
    let spaced = input.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes()))
            .into_owned(),
    }
}
