use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    #[default]
    Offline,
    Starting,
    Online,
    Stopping,
    Crashed,
}

impl ServerStatus {
    /// True for states that imply a live runtime handle.
    pub fn is_running(self) -> bool {
        matches!(
            self,
            ServerStatus::Starting | ServerStatus::Online | ServerStatus::Stopping
        )
    }
}
