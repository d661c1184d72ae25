pub mod entry;
pub mod model;

pub use entry::{EntryId, MediaEntry, MediaInfo, Rational};
pub use model::{Column, PlaylistModel, RowCountChanged};
