//! HTTP response type.

use std::collections::HashMap;

/// The `(status, headers, body chunks)` triple handed back to the transport.
pub type ResponseParts = (u16, HashMap<String, String>, Vec<Vec<u8>>);

/// An HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Creates a new response with the given status and no body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Creates a 200 OK response.
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// Creates a response with plain text content.
    pub fn text(body: impl Into<String>) -> Self {
        let body: String = body.into();
        Self::ok()
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
    }

    /// Creates a response with HTML content.
    pub fn html(body: impl Into<String>) -> Self {
        let body: String = body.into();
        Self::ok()
            .header("Content-Type", "text/html; charset=utf-8")
            .body(body)
    }

    /// Creates a response with JSON content.
    ///
    /// Serialization failures produce an empty 500 response.
    pub fn json<T: serde::Serialize>(data: &T) -> Self {
        serde_json::to_vec(data).map_or_else(
            |_| Self::new(500),
            |body| Self::ok().header("Content-Type", "application/json").body(body),
        )
    }

    /// Creates a redirect response.
    pub fn redirect(url: impl Into<String>) -> Self {
        Self::new(302).header("Location", url)
    }

    /// Creates the 404 response returned when nothing matched.
    ///
    /// The body is empty.
    pub fn not_found() -> Self {
        Self::new(404)
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the status code.
    #[must_use]
    pub const fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the body as a string.
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }

    /// Splits the response into the triple handed back to the transport.
    ///
    /// An empty body becomes an empty chunk sequence.
    pub fn into_parts(self) -> ResponseParts {
        let chunks = if self.body.is_empty() {
            Vec::new()
        } else {
            vec![self.body]
        };
        (self.status, self.headers, chunks)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}
