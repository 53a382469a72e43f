pub mod item;
pub mod playlist;

pub use item::{FontWeight, ItemKind, PlaylistItem, TextStyle};
pub use playlist::{PlaylistRecord, Schedule};

/// A complete listing of playlist records at one point in time
pub type Snapshot = Vec<PlaylistRecord>;
