use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Verified identity attached to a websocket session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
}
