// Configuration loading and local persistence

pub mod error;
pub mod settings;
pub mod store;
pub mod theme;

pub use error::ConfigError;
pub use settings::Settings;
pub use store::FileStore;
pub use theme::{load_theme, save_theme, toggle_theme};
