use faststr::FastStr;
use serde::{Deserialize, Serialize};

/// Query string of `GET /v1/users/{user}/articles`.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct PageParams {
    pub limit:       Option<usize>,
    // Passed through verbatim; an empty value means the first page.
    pub cursor:      Option<FastStr>,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadStateRequest {
    #[serde(default = "default_read")]
    pub read: bool,
}

fn default_read() -> bool {
    true
}
