use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ini::Ini;

use super::xml::Credentials;
use crate::error::{Error, ErrorKind, Result};

pub const DEFAULT_OUTPUT: &str = "json";

fn aws_file(env_var: &str, name: &str) -> Result<PathBuf> {
    if let Ok(path) = env::var(env_var) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    dirs::home_dir()
        .map(|home| home.join(".aws").join(name))
        .ok_or_else(|| Error::new(ErrorKind::Config, "Could not determine home directory"))
}

/// `~/.aws/credentials`, or `AWS_SHARED_CREDENTIALS_FILE`.
pub fn credentials_file_path() -> Result<PathBuf> {
    aws_file("AWS_SHARED_CREDENTIALS_FILE", "credentials")
}

/// `~/.aws/config`, or `AWS_CONFIG_FILE`.
pub fn config_file_path() -> Result<PathBuf> {
    aws_file("AWS_CONFIG_FILE", "config")
}

/// Section name of a profile in the config file. Only the default profile
/// goes without the `profile ` prefix.
pub fn profile_section(profile: &str) -> String {
    if profile == "default" {
        profile.into()
    } else {
        format!("profile {}", profile)
    }
}

pub fn load_or_default(path: &Path) -> Result<Ini> {
    if !path.exists() {
        trace!("load_or_default.missing {}", path.display());
        return Ok(Ini::new());
    }

    Ok(Ini::load_from_file(path)?)
}

/// Writes the whole file to a temporary sibling which is then renamed over
/// the original.
fn save(ini: &Ini, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            debug!("creating {}", dir.display());
            fs::create_dir_all(dir)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    ini.write_to_file(&tmp)?;
    fs::rename(&tmp, path)?;

    Ok(())
}

/// Stores the keys under `[profile]`, leaving every other section as it was.
pub fn write_credentials(path: &Path, profile: &str, credentials: &Credentials) -> Result<()> {
    let mut ini = load_or_default(path)?;

    ini.with_section(Some(profile))
        .set("aws_access_key_id", credentials.access_key_id.as_str())
        .set("aws_secret_access_key", credentials.secret_access_key.as_str())
        .set("aws_session_token", credentials.session_token.as_str());

    save(&ini, path)?;
    info!("wrote credentials for [{}] to {}", profile, path.display());
    Ok(())
}

/// Stores region and output format of the profile in the config file.
pub fn write_profile_config(path: &Path, profile: &str, region: &str, output: &str) -> Result<()> {
    let mut ini = load_or_default(path)?;
    let section = profile_section(profile);

    ini.with_section(Some(section.as_str()))
        .set("region", region)
        .set("output", output);

    save(&ini, path)?;
    info!("wrote [{}] to {}", section, path.display());
    Ok(())
}
