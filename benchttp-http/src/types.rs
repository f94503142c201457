use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use http_body_util::Empty;
use hyper::Request;

use super::{Error, Result};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Method {
    #[default]
    Get,
    Head,
}

impl Method {
    fn as_http(self) -> http::Method {
        match self {
            Self::Get => http::Method::GET,
            Self::Head => http::Method::HEAD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    fn header_value(&self) -> Result<HeaderValue> {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// A fully resolved request, cloned into every call of a run.
///
/// Headers are keyed by name with last-write-wins semantics. Basic auth is applied after the
/// headers, so it takes precedence over an explicit `Authorization` header.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    method: Method,
    url: url::Url,
    uri: hyper::Uri,
    headers: HeaderMap,
    basic_auth: Option<(BasicAuth, HeaderValue)>,
}

impl RequestTemplate {
    pub fn new(method: Method, url: &str) -> Result<Self> {
        let parsed = url::Url::parse(url).map_err(|_| Error::InvalidUrl(url.to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::UnsupportedScheme(url.to_string()));
        }

        let uri: hyper::Uri = parsed
            .as_str()
            .parse()
            .map_err(|_| Error::InvalidUrl(url.to_string()))?;

        Ok(Self {
            method,
            url: parsed,
            uri,
            headers: HeaderMap::new(),
            basic_auth: None,
        })
    }

    pub fn get(url: &str) -> Result<Self> {
        Self::new(Method::Get, url)
    }

    pub fn head(url: &str) -> Result<Self> {
        Self::new(Method::Head, url)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.trim().as_bytes())?;
        let value = HeaderValue::from_str(value.trim())?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn with_basic_auth(mut self, auth: BasicAuth) -> Result<Self> {
        let value = auth.header_value()?;
        self.basic_auth = Some((auth, value));
        Ok(self)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &url::Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn basic_auth(&self) -> Option<&BasicAuth> {
        self.basic_auth.as_ref().map(|(auth, _)| auth)
    }

    pub(crate) fn to_request(&self) -> Request<Empty<Bytes>> {
        let mut req = Request::new(Empty::new());
        *req.method_mut() = self.method.as_http();
        *req.uri_mut() = self.uri.clone();
        *req.headers_mut() = self.headers.clone();
        if let Some((_, value)) = &self.basic_auth {
            req.headers_mut().insert(AUTHORIZATION, value.clone());
        }
        req
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Number of body bytes drained from the connection.
    pub body_len: u64,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("HEAD".parse::<Method>().unwrap(), Method::Head);
        assert!("POST".parse::<Method>().is_err());
        assert_eq!(Method::Head.to_string(), "HEAD");
    }

    #[test]
    fn rejects_non_http_schemes() {
        let err = RequestTemplate::get("ftp://example.com/").unwrap_err();
        assert!(matches!(err, Error::UnsupportedScheme(_)));

        let err = RequestTemplate::get("not a url").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn headers_are_last_write_wins() {
        let template = RequestTemplate::get("http://example.com/")
            .unwrap()
            .with_header("X-Test", "1")
            .unwrap()
            .with_header("x-test", " 2 ")
            .unwrap();

        let values: Vec<&HeaderValue> = template.headers().get_all("x-test").iter().collect();
        assert_eq!(values, vec![&HeaderValue::from_static("2")]);
    }

    #[test]
    fn basic_auth_overrides_authorization_header() {
        let template = RequestTemplate::head("https://example.com/path?q=1")
            .unwrap()
            .with_header("Authorization", "Bearer token")
            .unwrap()
            .with_basic_auth(BasicAuth {
                username: "user".to_string(),
                password: "pa:ss".to_string(),
            })
            .unwrap();

        let req = template.to_request();
        assert_eq!(req.method(), http::Method::HEAD);
        assert_eq!(req.uri().to_string(), "https://example.com/path?q=1");
        assert_eq!(
            req.headers().get(AUTHORIZATION).unwrap(),
            // base64("user:pa:ss")
            "Basic dXNlcjpwYTpzcw=="
        );
        assert_eq!(template.basic_auth().unwrap().username, "user");
    }
}
