use serde::{Deserialize, Serialize};

/// A source record the extractor does not interpret, kept verbatim with
/// its nested sub-records so that nothing in the document is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueFact {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OpaqueFact>,
}

impl OpaqueFact {
    /// First nested record with the given tag.
    pub fn child(&self, tag: &str) -> Option<&OpaqueFact> {
        self.children.iter().find(|c| c.tag == tag)
    }
}
