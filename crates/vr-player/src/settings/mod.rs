pub mod schema;
pub mod store;

pub use schema::{keys, SettingValue, VIEW_SCALES};
pub use store::SettingsStore;
