use uuid::Uuid;

/// Per-request context carried from the HTTP edge into services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    request_id: String,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    /// Use the propagated request id, or mint one when the caller sent none.
    pub fn from_request_id(request_id: Option<String>) -> Self {
        match request_id {
            Some(id) if !id.is_empty() => Self::new(id),
            _ => Self::generate(),
        }
    }

    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::generate()
    }
}
