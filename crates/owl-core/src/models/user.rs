use serde::{Deserialize, Serialize};

/// The slice of the Habitica user document this crate reads.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub stats: UserStats,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    /// Gold balance.
    #[serde(default)]
    pub gp: f64,
}
