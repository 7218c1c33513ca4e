use serde::{Deserialize, Serialize};

/// A topic label used to bucket articles and route per-user digests.
/// The tag list is maintained elsewhere; the orchestrator only iterates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub tag: String,
    pub is_active: bool,
}
