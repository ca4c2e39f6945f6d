pub mod errors;
pub mod events;
pub mod messages;
pub mod power;
pub mod room;
pub mod user;

// Re-export all types
pub use errors::*;
pub use events::*;
pub use messages::*;
pub use power::*;
pub use room::*;
pub use user::*;

pub type RoomId = String;
pub type PlayerId = String;
pub type TeamName = String;
/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;
