use uuid::Uuid;

/// Per-request values threaded explicitly through billable operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Correlates log lines and ledger entries belonging to one session
    pub session_id: String,
}

impl RequestContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }

    /// A context with a freshly generated session id.
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::generate()
    }
}
