use std::path::PathBuf;

use crate::error::{Error, Result};

pub fn transferdesk_config_dir() -> Result<PathBuf> {
    let home = if cfg!(target_os = "windows") {
        std::env::var("USERPROFILE")
            .or_else(|_| std::env::var("HOME"))
            .map_err(|_| Error::Config("Unable to resolve USERPROFILE/HOME".to_string()))?
    } else {
        std::env::var("HOME")
            .map_err(|_| Error::Config("Unable to resolve HOME".to_string()))?
    };

    let mut path = PathBuf::from(home);
    if cfg!(target_os = "macos") {
        path.push("Library");
        path.push("Application Support");
        path.push("transferdesk");
    } else {
        path.push(".config");
        path.push("transferdesk");
    }
    Ok(path)
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(transferdesk_config_dir()?.join("settings.json"))
}
