pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum HttpTransportErrorKind {
    InvalidUrl,
    UnsupportedScheme,
    HeaderName,
    HeaderValue,
    Tls,
    Request,
    Timeout,
    BodyRead,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("only http:// and https:// URLs are supported: {0}")]
    UnsupportedScheme(String),

    #[error("invalid http header name")]
    HeaderName(#[from] http::header::InvalidHeaderName),

    #[error("invalid http header value")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("tls setup failed")]
    Tls(#[from] rustls::Error),

    #[error("http request failed")]
    Request(#[from] hyper_util::client::legacy::Error),

    // The budget shrinks from call to call in duration mode, so it is not part of the message.
    #[error("http request timed out")]
    Timeout,

    #[error("failed to read response body")]
    BodyRead(#[from] hyper::Error),
}

impl Error {
    #[must_use]
    pub fn transport_error_kind(&self) -> HttpTransportErrorKind {
        match self {
            Self::InvalidUrl(_) => HttpTransportErrorKind::InvalidUrl,
            Self::UnsupportedScheme(_) => HttpTransportErrorKind::UnsupportedScheme,
            Self::HeaderName(_) => HttpTransportErrorKind::HeaderName,
            Self::HeaderValue(_) => HttpTransportErrorKind::HeaderValue,
            Self::Tls(_) => HttpTransportErrorKind::Tls,
            Self::Request(_) => HttpTransportErrorKind::Request,
            Self::Timeout => HttpTransportErrorKind::Timeout,
            Self::BodyRead(_) => HttpTransportErrorKind::BodyRead,
        }
    }

    /// Renders the error together with its `source()` chain, e.g.
    /// `http request failed: client error (Connect): tcp connect error: Connection refused (os error 111)`.
    ///
    /// Used as the tally key for failed calls, so it must not carry per-call data.
    #[must_use]
    pub fn description(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push_str(": ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}
