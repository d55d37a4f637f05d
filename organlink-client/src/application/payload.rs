use tracing::error;

use crate::domain::request::OrganRequest;

/// What the request details view shows.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestDetails {
    Loading,
    Ready(Box<OrganRequest>),
}

impl RequestDetails {
    /// Decodes the serialized request handed over by the list view. A missing
    /// or unreadable payload is logged and the view stays in `Loading`.
    pub fn from_payload(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Loading;
        };

        match serde_json::from_str::<OrganRequest>(raw) {
            Ok(request) => Self::Ready(Box::new(request)),
            Err(err) => {
                error!(error = %err, "failed to parse request payload");
                Self::Loading
            }
        }
    }

    pub fn request(&self) -> Option<&OrganRequest> {
        match self {
            Self::Ready(request) => Some(request),
            Self::Loading => None,
        }
    }
}

pub fn encode_request_payload(request: &OrganRequest) -> Result<String, serde_json::Error> {
    serde_json::to_string(request)
}
