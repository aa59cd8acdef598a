//! Engine configuration
//!
//! The frame loop never reads configuration fields from anywhere but one
//! [`Config`] snapshot taken at the top of each tick. A [`ConfigWatcher`]
//! swaps in a new snapshot whenever the file on disk changes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vrwheel_errors::prelude::*;
use vrwheel_errors::validate_range;
use vrwheel_ffb::{DEFAULT_SMOOTHING_ALPHA, HapticEstimatorConfig};
use vrwheel_shifter::{ShifterConfig, ShifterError};

use crate::error::{EngineError, EngineResult};
use crate::hands::GrabConfig;
use crate::wheel::WheelConfig;

/// How often the watcher looks at the file's modification time.
pub const CONFIG_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FfbConfig {
    /// Let the force-feedback decoder drive centering instead of the fixed nudge
    pub enabled: bool,
    /// Exponential smoothing weight of the newest force sample
    pub smoothing_alpha: f32,
    pub haptics: HapticEstimatorConfig,
    /// Seconds between packet statistics log lines, `0` disables them
    pub stats_interval_secs: u64,
}

impl Default for FfbConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smoothing_alpha: DEFAULT_SMOOTHING_ALPHA,
            haptics: HapticEstimatorConfig::default(),
            stats_interval_secs: 30,
        }
    }
}

impl FfbConfig {
    /// # Errors
    ///
    /// Returns the first field outside its legal range.
    pub fn validate(&self) -> Result<()> {
        validate_range!("ffb.smoothing_alpha", self.smoothing_alpha, 0.0, 1.0);
        validate_range!("ffb.haptics.window", self.haptics.window, 2, 512);
        validate_range!("ffb.haptics.threshold", self.haptics.threshold, 0.0, 10.0);
        validate_range!("ffb.haptics.gain", self.haptics.gain, 0.0, 1000.0);
        Ok(())
    }

    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_secs > 0).then(|| Duration::from_secs(self.stats_interval_secs))
    }
}

/// Everything one tick needs to know about the user's setup.
///
/// # Examples
///
/// ```
/// use vrwheel_engine::Config;
///
/// let config = Config::from_json(r#"{ "wheel": { "degrees": 900.0 }, "tick_rate_hz": 90 }"#)?;
/// assert_eq!(config.tick_rate_hz, 90);
/// assert!(config.grab.by_grip);
/// # Ok::<(), vrwheel_errors::VrWheelError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub wheel: WheelConfig,
    pub shifter: ShifterConfig,
    pub grab: GrabConfig,
    pub ffb: FfbConfig,
    pub tick_rate_hz: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wheel: WheelConfig::default(),
            shifter: ShifterConfig::default(),
            grab: GrabConfig::default(),
            ffb: FfbConfig::default(),
            tick_rate_hz: 60,
        }
    }
}

impl Config {
    /// # Errors
    ///
    /// Returns the first invalid field of any section.
    pub fn validate(&self) -> Result<()> {
        self.wheel.validate()?;
        self.shifter.validate().map_err(shifter_error)?;
        self.ffb.validate()?;
        validate_range!("tick_rate_hz", self.tick_rate_hz, 1, 1000);
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`VrWheelError::Config`] for malformed JSON and the validation
    /// error for out-of-range values.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)
            .map_err(|e| VrWheelError::config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, otherwise see [`Config::from_json`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory or file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| VrWheelError::config(format!("serialize failed: {e}")))?;
        fs::write(path, text)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Nominal duration of one tick.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate_hz.max(1)
    }
}

fn shifter_error(error: ShifterError) -> VrWheelError {
    match error {
        ShifterError::Validation(e) => VrWheelError::Validation(e),
        other => VrWheelError::config(other.to_string()),
    }
}

/// Latest published [`Config`], shared between the watcher and the loop.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<Arc<Config>>>,
}

impl SharedConfig {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// The current snapshot. Later publishes do not affect it.
    pub fn snapshot(&self) -> Arc<Config> {
        Arc::clone(&self.inner.read())
    }

    pub fn publish(&self, config: Config) {
        *self.inner.write() = Arc::new(config);
    }
}

/// Reloads a config file into a [`SharedConfig`] whenever its modification
/// time changes. Invalid files are logged and the previous snapshot stays.
#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ConfigWatcher {
    /// # Errors
    ///
    /// Returns [`EngineError::ThreadSpawn`] if the watcher thread cannot be created.
    pub fn spawn(
        path: impl Into<PathBuf>,
        shared: SharedConfig,
        interval: Duration,
    ) -> EngineResult<Self> {
        let path = path.into();
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let thread_path = path.clone();
        let seen = modified(&path);
        let name = "config-watcher".to_string();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || watch(&thread_path, seen, &shared, &thread_running, interval))
            .map_err(|source| EngineError::ThreadSpawn { name, source })?;
        info!(path = %path.display(), "Config watcher started");
        Ok(Self {
            path,
            running,
            handle: Some(handle),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop polling and join the thread.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Config watcher thread panicked");
            } else {
                debug!("Config watcher stopped cleanly");
            }
        }
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn watch(
    path: &Path,
    mut seen: Option<SystemTime>,
    shared: &SharedConfig,
    running: &AtomicBool,
    interval: Duration,
) {
    while running.load(Ordering::Acquire) {
        thread::sleep(interval);
        let current = modified(path);
        if current.is_none() || current == seen {
            continue;
        }
        seen = current;
        match Config::load(path) {
            Ok(config) => {
                shared.publish(config);
                info!(path = %path.display(), "Config reloaded");
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Ignoring invalid config"),
        }
    }
}
