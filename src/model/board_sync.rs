use serde::{Deserialize, Serialize};

/// One board entry in a `/syncBoardTickets` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSyncRequest {
    pub board_id: i64,
    pub board_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_from_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_status: Option<Vec<String>>,
}

impl BoardSyncRequest {
    pub fn new(board_id: i64, board_name: impl Into<String>) -> Self {
        Self {
            board_id,
            board_name: board_name.into(),
            sync_from_date: None,
            sync_status: None,
        }
    }
}
