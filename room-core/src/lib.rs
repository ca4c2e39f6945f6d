pub mod cleanup;
pub mod error;
pub mod ghost;
pub mod guess;
pub mod lifecycle;
pub mod patch;
pub mod power_ups;
pub mod reveal;
pub mod timeout;
pub mod turn_order;
pub mod wallet;
pub mod word_bank;

// Re-export main components
pub use cleanup::*;
pub use error::*;
pub use ghost::*;
pub use guess::*;
pub use lifecycle::*;
pub use patch::*;
pub use power_ups::*;
pub use reveal::*;
pub use timeout::*;
pub use turn_order::*;
pub use wallet::*;
pub use word_bank::*;

use room_types::Timestamp;

/// Current wall-clock time in the room document's timestamp unit.
pub fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}
