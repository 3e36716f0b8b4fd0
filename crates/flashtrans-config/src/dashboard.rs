use serde::{Deserialize, Serialize};

fn default_editable() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    /// Whether new records accept user edits
    #[serde(default = "default_editable")]
    pub editable: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            editable: default_editable(),
        }
    }
}
