use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Name of the tag that marks tasks owned by this integration. Matched
/// case-sensitively.
pub const CATEGORIZATION_TAG_NAME: &str = "Owl";

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub String);

impl TagId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TagId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    #[serde(default)]
    pub name: String,
}
