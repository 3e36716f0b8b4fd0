use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use flashtrans_config::Config;
use serde::{Deserialize, Serialize};

const MAIN_PROFILE: &str = "main";

/// Represents a user profile
#[derive(Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub value: Config,
}

/// JSON profiles under `<root>/profiles`
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join("profiles"),
        }
    }

    /// `FLASHTRANS_HOME`, or `./.flashtrans`
    pub fn from_env() -> Self {
        let root = env::var_os("FLASHTRANS_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".flashtrans"));
        Self::new(root)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Create the profile folder and a default main profile if missing
    pub fn init(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let main_profile = self.path(MAIN_PROFILE);
        if !main_profile.exists() {
            self.write(MAIN_PROFILE, Config::default())?;
            tracing::info!("Created main profile in {}", self.dir.display());
        }

        Ok(())
    }

    /// Load a profile by name, falling back to main, then to defaults
    pub fn load(&self, name: &str) -> anyhow::Result<Config> {
        let profile_file = self.path(name);
        if profile_file.exists() {
            return read_profile(&profile_file);
        }

        tracing::warn!("Profile {name} not found, falling back to main profile or defaults");
        let main_file = self.path(MAIN_PROFILE);
        if main_file.exists() {
            read_profile(&main_file)
        } else {
            Ok(Config::default())
        }
    }

    /// Add a new profile cloned from main (or defaults if main is missing)
    pub fn add_from_main(&self, new_name: &str) -> anyhow::Result<PathBuf> {
        let config = self.load(MAIN_PROFILE)?;
        let file = self.write(new_name, config)?;
        tracing::info!("Created new profile: {new_name}");
        Ok(file)
    }

    fn write(&self, name: &str, value: Config) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let profile = Profile {
            name: name.into(),
            value,
        };
        let file = self.path(name);
        fs::write(&file, serde_json::to_string_pretty(&profile)?)?;
        Ok(file)
    }
}

fn read_profile(path: &Path) -> anyhow::Result<Config> {
    let data = fs::read_to_string(path)?;
    let profile: Profile = serde_json::from_str(&data)?;
    Ok(profile.value)
}
