//! Multipart form framing
//!
//! Builds `multipart/form-data` bodies by hand so the boundary is known up
//! front and the body can be handed to the client as raw bytes.

use crate::types::{scalar_to_string, JsonObject};
use bytes::{BufMut, Bytes, BytesMut};
use chrono::Utc;

/// Boundary prefix; the current time in milliseconds is appended
const BOUNDARY_PREFIX: &str = "----formdata-pennylane-";

/// A `multipart/form-data` body under construction
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    body: BytesMut,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    /// Start a form with a time-based boundary
    pub fn new() -> Self {
        Self::with_boundary(format!(
            "{BOUNDARY_PREFIX}{}",
            Utc::now().timestamp_millis()
        ))
    }

    /// Start a form with an explicit boundary
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: BytesMut::new(),
        }
    }

    /// The boundary separating parts
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the `Content-Type` header
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Append a text part
    #[must_use]
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.put_delimiter();
        self.body.put_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                escape_quoted(name)
            )
            .as_bytes(),
        );
        self.body.put_slice(value.as_bytes());
        self.body.put_slice(b"\r\n");
        self
    }

    /// Append one text part per field, skipping nulls
    #[must_use]
    pub fn fields(self, fields: &JsonObject) -> Self {
        fields.iter().fold(self, |form, (name, value)| {
            match scalar_to_string(value) {
                Some(value) => form.text(name, &value),
                None => form,
            }
        })
    }

    /// Append a binary file part
    #[must_use]
    pub fn file(mut self, name: &str, file_name: &str, content: &[u8]) -> Self {
        self.put_delimiter();
        self.body.put_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                escape_quoted(name),
                escape_quoted(file_name)
            )
            .as_bytes(),
        );
        self.body
            .put_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        self.body.put_slice(content);
        self.body.put_slice(b"\r\n");
        self
    }

    /// Close the form and return the encoded body
    pub fn finish(mut self) -> Bytes {
        self.body
            .put_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body.freeze()
    }

    fn put_delimiter(&mut self) {
        self.body
            .put_slice(format!("--{}\r\n", self.boundary).as_bytes());
    }
}

/// Make a name safe inside a quoted header parameter
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
