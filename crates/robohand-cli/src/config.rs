//! Configuration file – reads/writes `~/.robohand/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use robohand_hal::sim::SIM_PORT;
use robohand_runtime::SessionSettings;
use robohand_types::HandError;
use serde::{Deserialize, Serialize};

/// Persisted settings, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Serial device of the microcontroller, or `"sim"` for the simulated link.
    #[serde(default = "default_serial_port")]
    pub serial_port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// How long one read may block before the telemetry reader re-checks
    /// the link.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Wait after opening the port; the board resets when the port opens.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Minimum spacing of gesture sends.
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,

    /// Camera loop pacing.
    #[serde(default = "default_frame_delay_ms")]
    pub frame_delay_ms: u64,

    #[serde(default = "default_cockpit_host")]
    pub cockpit_host: String,

    #[serde(default = "default_cockpit_port")]
    pub cockpit_port: u16,

    /// JSON-lines landmark stream for camera mode.  Stdin when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark_feed: Option<PathBuf>,
}

fn default_serial_port() -> String {
    if cfg!(windows) { "COM5" } else { "/dev/ttyACM0" }.to_string()
}
fn default_baud_rate() -> u32 {
    9600
}
fn default_read_timeout_ms() -> u64 {
    1000
}
fn default_settle_ms() -> u64 {
    2000
}
fn default_send_interval_ms() -> u64 {
    100
}
fn default_frame_delay_ms() -> u64 {
    20
}
fn default_cockpit_host() -> String {
    "0.0.0.0".to_string()
}
fn default_cockpit_port() -> u16 {
    5000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial_port: default_serial_port(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            settle_ms: default_settle_ms(),
            send_interval_ms: default_send_interval_ms(),
            frame_delay_ms: default_frame_delay_ms(),
            cockpit_host: default_cockpit_host(),
            cockpit_port: default_cockpit_port(),
            landmark_feed: None,
        }
    }
}

impl Config {
    pub fn is_simulated(&self) -> bool {
        self.serial_port.eq_ignore_ascii_case(SIM_PORT)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Session loop timings derived from this config.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            send_interval: Duration::from_millis(self.send_interval_ms),
            frame_delay: Duration::from_millis(self.frame_delay_ms),
            ..SessionSettings::default()
        }
    }
}

/// Return the path to `~/.robohand/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".robohand").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, HandError> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, HandError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| HandError::Config(format!("failed to read {}: {e}", path.display())))?;
    toml::from_str(&raw)
        .map(Some)
        .map_err(|e| HandError::Config(format!("failed to parse {}: {e}", path.display())))
}

/// Apply `ROBOHAND_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ROBOHAND_SERIAL_PORT` | `serial_port` |
/// | `ROBOHAND_BAUD_RATE` | `baud_rate` |
/// | `ROBOHAND_COCKPIT_PORT` | `cockpit_port` |
/// | `ROBOHAND_LANDMARK_FEED` | `landmark_feed` |
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |name| std::env::var(name).ok());
}

/// Unparsable numbers are ignored.
pub(crate) fn apply_overrides(cfg: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("ROBOHAND_SERIAL_PORT") {
        cfg.serial_port = v;
    }
    if let Some(v) = var("ROBOHAND_BAUD_RATE")
        && let Ok(baud) = v.trim().parse::<u32>()
    {
        cfg.baud_rate = baud;
    }
    if let Some(v) = var("ROBOHAND_COCKPIT_PORT")
        && let Ok(port) = v.trim().parse::<u16>()
    {
        cfg.cockpit_port = port;
    }
    if let Some(v) = var("ROBOHAND_LANDMARK_FEED") {
        cfg.landmark_feed = Some(PathBuf::from(v));
    }
}

/// Save the config to disk, creating `~/.robohand/` if necessary.
pub fn save(cfg: &Config) -> Result<(), HandError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), HandError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| HandError::Config(format!("failed to create config directory: {e}")))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                HandError::Config(format!("failed to set config directory permissions: {e}"))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| HandError::Config(format!("failed to serialize config: {e}")))?;
    let write_err = |e: std::io::Error| {
        HandError::Config(format!("failed to write {}: {e}", path.display()))
    };
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_the_board() {
        let cfg = Config::default();
        assert_eq!(cfg.baud_rate, 9600);
        assert_eq!(cfg.read_timeout(), Duration::from_secs(1));
        assert_eq!(cfg.settle(), Duration::from_secs(2));
        assert_eq!(cfg.cockpit_host, "0.0.0.0");
        assert_eq!(cfg.cockpit_port, 5000);
        assert!(cfg.landmark_feed.is_none());
        assert!(!cfg.is_simulated());
    }

    #[test]
    fn session_settings_follow_config() {
        let cfg = Config {
            send_interval_ms: 250,
            frame_delay_ms: 5,
            ..Config::default()
        };
        let settings = cfg.session_settings();
        assert_eq!(settings.send_interval, Duration::from_millis(250));
        assert_eq!(settings.frame_delay, Duration::from_millis(5));
    }

    #[test]
    fn sim_port_is_case_insensitive() {
        let cfg = Config {
            serial_port: "SIM".to_string(),
            ..Config::default()
        };
        assert!(cfg.is_simulated());
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode = fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = fs::metadata(path.parent().unwrap())
            .expect("dir metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn roundtrip_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        let cfg = Config {
            serial_port: "sim".to_string(),
            landmark_feed: Some(PathBuf::from("/tmp/feed.jsonl")),
            ..Config::default()
        };

        save_to(&cfg, &path).expect("save");
        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_takes_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "serial_port = \"/dev/ttyUSB1\"\n").unwrap();

        let loaded = load_from(&path).unwrap().unwrap();
        assert_eq!(loaded.serial_port, "/dev/ttyUSB1");
        assert_eq!(loaded.baud_rate, 9600);
        assert_eq!(loaded.cockpit_port, 5000);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "baud_rate = \"fast\"\n").unwrap();
        assert!(matches!(load_from(&path), Err(HandError::Config(_))));
    }

    #[test]
    fn config_path_points_to_robohand_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".robohand"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn overrides_replace_fields() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            vars(&[
                ("ROBOHAND_SERIAL_PORT", "sim"),
                ("ROBOHAND_BAUD_RATE", "115200"),
                ("ROBOHAND_COCKPIT_PORT", " 8000 "),
                ("ROBOHAND_LANDMARK_FEED", "feed.jsonl"),
            ]),
        );
        assert_eq!(cfg.serial_port, "sim");
        assert_eq!(cfg.baud_rate, 115_200);
        assert_eq!(cfg.cockpit_port, 8000);
        assert_eq!(cfg.landmark_feed, Some(PathBuf::from("feed.jsonl")));
    }

    #[test]
    fn overrides_ignore_invalid_numbers() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            vars(&[
                ("ROBOHAND_BAUD_RATE", "fast"),
                ("ROBOHAND_COCKPIT_PORT", "99999"),
            ]),
        );
        assert_eq!(cfg, Config::default());
    }
}
