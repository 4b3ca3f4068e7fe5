//! Impairment settings and their reloadable home.
//!
//! The configuration file is a JSON object with five required fields:
//!
//! ```json
//! {
//!     "drop_percent": 2.5,
//!     "corrupt_packet_percent": 1.0,
//!     "corrupt_packet_bytes": 4,
//!     "truncate_len": 0,
//!     "bandwidth": 1024
//! }
//! ```
//!
//! `bandwidth` is in kilobytes per second, and `0` disables pacing. `truncate_len` of `0` disables
//! truncation.

use crate::priv_prelude::*;
use serde_json::Value;

/// Where the binary looks for its configuration unless told otherwise.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/brokenhub.conf";

const DROP_PERCENT: &str = "drop_percent";
const CORRUPT_PACKET_PERCENT: &str = "corrupt_packet_percent";
const CORRUPT_PACKET_BYTES: &str = "corrupt_packet_bytes";
const TRUNCATE_LEN: &str = "truncate_len";
const BANDWIDTH: &str = "bandwidth";

/// A probability expressed in the output range of [`RandomSource`](crate::RandomSource). A draw
/// below the threshold is a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Threshold(u64);

impl Threshold {
    pub const NEVER: Threshold = Threshold(0);
    pub const ALWAYS: Threshold = Threshold(u64::MAX);

    /// Scale a percentage in `[0, 100]` onto the full `u64` range.
    pub fn from_percent(percent: f64) -> Threshold {
        // float to int casts saturate, so 100% lands exactly on u64::MAX
        Threshold(((percent / 100.0) * u64::MAX as f64) as u64)
    }

    pub fn is_enabled(&self) -> bool {
        self.0 > 0
    }

    /// Whether `sample` falls inside the threshold. `ALWAYS` hits every sample, including
    /// `u64::MAX` itself.
    pub fn hit(&self, sample: u64) -> bool {
        self.0 == u64::MAX || sample < self.0
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// One immutable set of impairment and pacing parameters.
///
/// A `Config` is never edited once published. Reloading builds a new one and swaps the `Arc`
/// that the engine holds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Config {
    pub drop_threshold: Threshold,
    pub corrupt_threshold: Threshold,
    /// Exclusive upper bound on the number of bytes overwritten in a corrupted frame.
    pub corrupt_max_bytes: u32,
    /// Frames longer than this are cut down to it. `0` disables truncation.
    pub truncate_len: u32,
    /// Transmission cost of a single byte. `0` disables pacing.
    pub ns_per_byte: u64,
}

impl Config {
    /// Read and validate a configuration file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) => {
                return Err(ConfigError::Read { path: path.to_owned(), source });
            },
        };
        let root: Value = match serde_json::from_str(&text) {
            Ok(root) => root,
            Err(source) => {
                return Err(ConfigError::Parse { path: path.to_owned(), source });
            },
        };
        Config::from_json(&root).map_err(|problems| ConfigError::Invalid {
            path: path.to_owned(),
            problems: FieldErrors(problems),
        })
    }

    /// Extract a `Config` from an already parsed JSON document. Every problem with every field is
    /// collected before giving up.
    pub fn from_json(root: &Value) -> Result<Config, Vec<FieldError>> {
        let mut problems = Vec::new();
        let object = match root.as_object() {
            Some(object) => object,
            None => return Err(vec![FieldError::NotAnObject]),
        };
        let mut field = |name: &'static str| {
            let value_opt = object.get(name);
            if value_opt.is_none() {
                problems.push(FieldError::Missing { field: name });
            }
            (name, value_opt)
        };
        let drop_percent = field(DROP_PERCENT);
        let corrupt_percent = field(CORRUPT_PACKET_PERCENT);
        let corrupt_bytes = field(CORRUPT_PACKET_BYTES);
        let truncate_len = field(TRUNCATE_LEN);
        let bandwidth = field(BANDWIDTH);

        let drop_percent = percent(drop_percent, &mut problems);
        let corrupt_percent = percent(corrupt_percent, &mut problems);
        let corrupt_bytes = count(corrupt_bytes, &mut problems);
        let truncate_len = count(truncate_len, &mut problems);
        let bandwidth_kbps = rate(bandwidth, &mut problems);

        if !problems.is_empty() {
            return Err(problems);
        }
        Ok(Config {
            drop_threshold: Threshold::from_percent(drop_percent),
            corrupt_threshold: Threshold::from_percent(corrupt_percent),
            corrupt_max_bytes: corrupt_bytes,
            truncate_len,
            ns_per_byte: crate::pacer::ns_per_byte(bandwidth_kbps),
        })
    }
}

fn number(
    (field, value_opt): (&'static str, Option<&Value>),
    problems: &mut Vec<FieldError>,
) -> Option<f64> {
    // absent fields were already reported
    let value = value_opt?;
    match value.as_f64() {
        Some(n) => Some(n),
        None => {
            problems.push(FieldError::NotANumber { field, found: value.to_string() });
            None
        },
    }
}

fn percent(entry: (&'static str, Option<&Value>), problems: &mut Vec<FieldError>) -> f64 {
    let field = entry.0;
    match number(entry, problems) {
        Some(n) if (0.0..=100.0).contains(&n) => n,
        Some(n) => {
            problems.push(FieldError::OutOfRange { field, value: n, min: 0.0, max: 100.0 });
            0.0
        },
        None => 0.0,
    }
}

fn count(entry: (&'static str, Option<&Value>), problems: &mut Vec<FieldError>) -> u32 {
    let (field, value_opt) = entry;
    let value = match value_opt {
        Some(value) => value,
        None => return 0,
    };
    if let Some(n) = value.as_u64() {
        match u32::try_from(n) {
            Ok(n) => return n,
            Err(_) => {
                problems.push(FieldError::OutOfRange {
                    field,
                    value: n as f64,
                    min: 0.0,
                    max: f64::from(u32::MAX),
                });
                return 0;
            },
        }
    }
    match value.as_f64() {
        // 5.0 is as good as 5
        Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) => n as u32,
        Some(n) if n < 0.0 || n > f64::from(u32::MAX) => {
            problems.push(FieldError::OutOfRange {
                field,
                value: n,
                min: 0.0,
                max: f64::from(u32::MAX),
            });
            0
        },
        Some(_) => {
            problems.push(FieldError::NotAnInteger { field, found: value.to_string() });
            0
        },
        None => {
            problems.push(FieldError::NotANumber { field, found: value.to_string() });
            0
        },
    }
}

fn rate(entry: (&'static str, Option<&Value>), problems: &mut Vec<FieldError>) -> f64 {
    let field = entry.0;
    match number(entry, problems) {
        Some(n) if n >= 0.0 && n.is_finite() => n,
        Some(n) => {
            problems.push(FieldError::OutOfRange { field, value: n, min: 0.0, max: f64::MAX });
            0.0
        },
        None => 0.0,
    }
}

/// Something wrong with a single field of the configuration document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("config root is not a JSON object")]
    NotAnObject,
    #[error("config item '{field}' missing")]
    Missing { field: &'static str },
    #[error("config item '{field}' should be a number, found {found}")]
    NotANumber { field: &'static str, found: String },
    #[error("config item '{field}' should be an integer, found {found}")]
    NotAnInteger { field: &'static str, found: String },
    #[error("config item '{field}' is {value}, expected a value in [{min}, {max}]")]
    OutOfRange { field: &'static str, value: f64, min: f64, max: f64 },
}

/// Every field problem found in one document, printed one per line.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldErrors(pub Vec<FieldError>);

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for problem in &self.0 {
            writeln!(f, "- {}", problem)?;
        }
        Ok(())
    }
}

/// Failure to produce a [`Config`] from a file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("could not parse config {}: {source}", path.display())]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("invalid config {}:\n{problems}", path.display())]
    Invalid { path: PathBuf, problems: FieldErrors },
}

/// Set from signal context when a reload is wanted, read and cleared by the event loop.
#[derive(Debug, Clone, Default)]
pub struct ReloadFlag {
    requested: Arc<AtomicBool>,
}

impl ReloadFlag {
    pub fn new() -> ReloadFlag {
        ReloadFlag::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }

    /// Have `SIGHUP` set this flag. The handler does nothing but a single atomic store.
    pub fn register_hangup(&self) -> io::Result<()> {
        let _sig_id = signal_hook::flag::register(
            signal_hook::consts::SIGHUP,
            Arc::clone(&self.requested),
        )?;
        Ok(())
    }
}

/// Owns the config file path and the currently published [`Config`].
#[derive(Debug)]
pub struct ConfigManager {
    path: PathBuf,
    current: Arc<Config>,
    reload: ReloadFlag,
}

impl ConfigManager {
    /// Load the initial snapshot from `path`.
    pub fn load(path: impl Into<PathBuf>) -> Result<ConfigManager, ConfigError> {
        let path = path.into();
        let config = Config::load(&path)?;
        info!("loaded config from {}: {:?}", path.display(), config);
        Ok(ConfigManager {
            path,
            current: Arc::new(config),
            reload: ReloadFlag::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> Arc<Config> {
        Arc::clone(&self.current)
    }

    pub fn reload_flag(&self) -> ReloadFlag {
        self.reload.clone()
    }

    /// Returns `true`, and clears the request, if a reload has been asked for since the last call.
    pub fn take_reload_request(&self) -> bool {
        self.reload.take()
    }

    /// Re-read the file and publish the result. On failure the previous snapshot stays current.
    pub fn reload(&mut self) -> Result<Arc<Config>, ConfigError> {
        let config = Config::load(&self.path)?;
        self.current = Arc::new(config);
        Ok(self.current())
    }
}
