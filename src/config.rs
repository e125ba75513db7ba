use std::fs;
use std::path::{Path, PathBuf};

use ini::Ini;

use crate::adfs::flow::{DEFAULT_IDP_ENTRY_URL, DEFAULT_MFA_AUTH_METHOD};
use crate::aws::assume_role::DEFAULT_SESSION_DURATION;
use crate::aws::credentials::DEFAULT_OUTPUT;
use crate::error::Result;

/// Optional settings file. Anything missing falls back to the built-in
/// defaults, and command line flags win over both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_idp_url")]
    pub idp_url: String,

    #[serde(default = "default_mfa_auth_method")]
    pub mfa_auth_method: String,

    #[serde(default = "default_session_duration")]
    pub session_duration: i64,

    #[serde(default = "default_output")]
    pub output: String,

    /// Overrides the regional STS endpoint.
    #[serde(default)]
    pub sts_endpoint: Option<String>,
}

fn default_idp_url() -> String {
    DEFAULT_IDP_ENTRY_URL.into()
}

fn default_mfa_auth_method() -> String {
    DEFAULT_MFA_AUTH_METHOD.into()
}

fn default_session_duration() -> i64 {
    DEFAULT_SESSION_DURATION
}

fn default_output() -> String {
    DEFAULT_OUTPUT.into()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            idp_url: default_idp_url(),
            mfa_auth_method: default_mfa_auth_method(),
            session_duration: default_session_duration(),
            output: default_output(),
            sts_endpoint: None,
        }
    }
}

fn default_settings_filename() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".pum-aws.yml"))
}

fn get_filename(paths: Vec<PathBuf>) -> Option<PathBuf> {
    paths.into_iter().find(|path| path.exists())
}

/// Reads the settings from `explicit`, or else from `./pum-aws.yml` or
/// `~/.pum-aws.yml`, whichever exists first.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let mut candidates = vec![PathBuf::from("./pum-aws.yml")];
            candidates.extend(default_settings_filename());
            get_filename(candidates)
        }
    };

    match path {
        Some(path) => {
            debug!("loading settings from {}", path.display());
            let buf = fs::read_to_string(&path)?;

            Ok(serde_yaml::from_str::<Settings>(&buf)?)
        }
        None => {
            trace!("load_settings.defaults");
            Ok(Settings::default())
        }
    }
}

/// `~/.pum-aws`, the INI file that remembers the last username.
pub fn user_store_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".pum-aws"))
}

pub struct UserStore {
    path: PathBuf,
    ini: Ini,
}

impl UserStore {
    pub fn load(path: &Path) -> Result<Self> {
        let ini = if path.exists() {
            Ini::load_from_file(path)?
        } else {
            Ini::new()
        };

        Ok(UserStore {
            path: path.to_path_buf(),
            ini,
        })
    }

    pub fn username(&self) -> Option<&str> {
        self.ini
            .get_from(Some("default"), "username")
            .filter(|u| !u.is_empty())
    }

    /// Remembers `username` if it is non-empty and not already stored.
    /// Returns whether the file was rewritten.
    pub fn remember(&mut self, username: &str) -> Result<bool> {
        if username.is_empty() || self.username() == Some(username) {
            return Ok(false);
        }

        self.ini
            .with_section(Some("default"))
            .set("username", username);
        self.ini.write_to_file(&self.path)?;

        debug!("remembered username in {}", self.path.display());
        Ok(true)
    }
}
