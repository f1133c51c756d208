// Theme preference
// Stored as the plain string "dark" / "light" under THEME_KEY.

use log::warn;

use marketboard_core::store::THEME_KEY;
use marketboard_core::{KeyValueStore, StoreError, Theme};

/// Stored preference, or the default when unset or unrecognized.
pub fn load_theme(store: &impl KeyValueStore) -> Result<Theme, StoreError> {
    let Some(raw) = store.get(THEME_KEY)? else {
        return Ok(Theme::default());
    };
    Ok(raw.parse().unwrap_or_else(|e| {
        warn!("ignoring stored theme: {e}");
        Theme::default()
    }))
}

pub fn save_theme(store: &mut impl KeyValueStore, theme: Theme) -> Result<(), StoreError> {
    store.set(THEME_KEY, theme.as_str())
}

/// Flip and persist. Returns the new preference.
pub fn toggle_theme(store: &mut impl KeyValueStore) -> Result<Theme, StoreError> {
    let next = load_theme(&*store)?.toggled();
    save_theme(store, next)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketboard_core::MemoryStore;

    #[test]
    fn defaults_to_dark() {
        assert_eq!(load_theme(&MemoryStore::new()).unwrap(), Theme::Dark);
    }

    #[test]
    fn toggle_persists() {
        let mut store = MemoryStore::new();
        assert_eq!(toggle_theme(&mut store).unwrap(), Theme::Light);
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("light"));
        assert_eq!(toggle_theme(&mut store).unwrap(), Theme::Dark);
    }

    #[test]
    fn unknown_value_falls_back() {
        let store = MemoryStore::new().with_entry(THEME_KEY, "solarized");
        assert_eq!(load_theme(&store).unwrap(), Theme::Dark);
    }
}
