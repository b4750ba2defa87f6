//! Standard paths used by the rails-routes tools

use std::path::{Path, PathBuf};

/// Standard rails-routes paths
pub struct Paths {
    /// Config directory (~/.config/rails-routes)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("rails-routes");

        Self { config }
    }

    /// Default config file location
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.json")
    }

    /// Conventional location of the rails executable inside an application
    pub fn rails_binstub(app_path: &Path) -> PathBuf {
        app_path.join("bin").join("rails")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rails_binstub() {
        let path = Paths::rails_binstub(Path::new("/srv/app"));
        assert_eq!(path, PathBuf::from("/srv/app/bin/rails"));
    }

    #[test]
    fn test_config_file_under_config_dir() {
        let paths = Paths::new();
        assert!(paths.config_file().starts_with(&paths.config));
        assert!(paths.config_file().ends_with("rails-routes/config.json"));
    }
}
