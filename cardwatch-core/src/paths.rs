//! Default on-disk locations.
//!
//! Every helper has two forms:
//! - `fn_at(home: &Path)`: explicit home; used in tests with `TempDir`
//! - `fn()`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};

use crate::error::LedgerError;

pub const CONFIG_FILE: &str = "config.json";
/// User template that overrides the embedded card template.
pub const CARD_TEMPLATE_FILE: &str = "card.html.tera";

/// `<home>/.cardwatch`
pub fn cardwatch_root(home: &Path) -> PathBuf {
    home.join(".cardwatch")
}

/// `<home>/.cardwatch/config`
pub fn config_dir_at(home: &Path) -> PathBuf {
    cardwatch_root(home).join("config")
}

/// `<home>/.cardwatch/style`
pub fn style_dir_at(home: &Path) -> PathBuf {
    cardwatch_root(home).join("style")
}

/// `<home>/.cardwatch/output`
pub fn output_dir_at(home: &Path) -> PathBuf {
    cardwatch_root(home).join("output")
}

/// `<config_dir>/config.json`: pure, no I/O.
pub fn config_path_in(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE)
}

/// The user's home directory.
pub fn home() -> Result<PathBuf, LedgerError> {
    dirs::home_dir().ok_or(LedgerError::HomeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_lives_under_dot_cardwatch() {
        let home = Path::new("/home/op");
        assert_eq!(
            config_path_in(&config_dir_at(home)),
            PathBuf::from("/home/op/.cardwatch/config/config.json")
        );
        assert!(style_dir_at(home).ends_with(".cardwatch/style"));
        assert!(output_dir_at(home).ends_with(".cardwatch/output"));
    }
}
