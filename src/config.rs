use anyhow::{bail, Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

use crate::analysis::{MoveLagConfig, RatioSamplerConfig, StopTriggerConfig};
use crate::ingest::{CsvColumns, MarketHours};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const DATA_DIR_ENV: &str = "LEVERAGE_LAG_DATA_DIR";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub session: SessionConfig,
    pub instruments: InstrumentsConfig,
    pub ratio: RatioConfig,
    pub lag: LagConfig,
    pub stop: StopConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub dates: Vec<String>,
    /// File name template with `{date}` and `{symbol}` placeholders.
    pub file_pattern: String,
    pub timestamp_column: usize,
    pub price_column: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/market"),
            dates: Vec::new(),
            file_pattern: "{date}_market_data_{symbol}.csv".to_string(),
            timestamp_column: 0,
            price_column: 2,
        }
    }
}

impl DataConfig {
    pub fn columns(&self) -> CsvColumns {
        CsvColumns {
            timestamp: self.timestamp_column,
            price: self.price_column,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub open_utc: NaiveTime,
    pub close_utc: NaiveTime,
    pub min_ticks: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            open_utc: NaiveTime::from_hms_opt(14, 30, 0).unwrap_or_default(),
            close_utc: NaiveTime::from_hms_opt(21, 0, 0).unwrap_or_default(),
            min_ticks: 100,
        }
    }
}

impl SessionConfig {
    pub fn market_hours(&self) -> MarketHours {
        MarketHours {
            open: self.open_utc,
            close: self.close_utc,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DerivedInstrument {
    pub symbol: String,
    pub leverage: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InstrumentsConfig {
    pub reference: String,
    pub derived: Vec<DerivedInstrument>,
}

impl Default for InstrumentsConfig {
    fn default() -> Self {
        Self {
            reference: "QQQ".to_string(),
            derived: vec![
                DerivedInstrument {
                    symbol: "TQQQ".to_string(),
                    leverage: 3.0,
                },
                DerivedInstrument {
                    symbol: "SQQQ".to_string(),
                    leverage: -3.0,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RatioConfig {
    #[serde(deserialize_with = "durations_ms")]
    pub windows: Vec<u64>,
    pub max_samples: usize,
    pub gap_tolerance: f64,
    pub noise_floor_pct: f64,
    pub min_samples: usize,
}

impl Default for RatioConfig {
    fn default() -> Self {
        let d = RatioSamplerConfig::default();
        Self {
            windows: d.windows_ms,
            max_samples: d.max_samples,
            gap_tolerance: d.gap_tolerance,
            noise_floor_pct: d.noise_floor_pct,
            min_samples: d.min_samples,
        }
    }
}

impl RatioConfig {
    pub fn sampler_config(&self) -> RatioSamplerConfig {
        RatioSamplerConfig {
            windows_ms: self.windows.clone(),
            max_samples: self.max_samples,
            gap_tolerance: self.gap_tolerance,
            noise_floor_pct: self.noise_floor_pct,
            min_samples: self.min_samples,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LagConfig {
    #[serde(deserialize_with = "duration_ms")]
    pub detection_window: u64,
    pub gap_tolerance: f64,
    pub move_threshold_pct: f64,
    #[serde(deserialize_with = "durations_ms")]
    pub offsets: Vec<u64>,
    pub catchup_pct: f64,
    pub max_samples: usize,
}

impl Default for LagConfig {
    fn default() -> Self {
        let d = MoveLagConfig::default();
        Self {
            detection_window: d.detection_window_ms,
            gap_tolerance: d.gap_tolerance,
            move_threshold_pct: d.move_threshold_pct,
            offsets: d.offsets_ms,
            catchup_pct: d.catchup_pct,
            max_samples: d.max_samples,
        }
    }
}

impl LagConfig {
    pub fn detector_config(&self) -> MoveLagConfig {
        MoveLagConfig {
            detection_window_ms: self.detection_window,
            gap_tolerance: self.gap_tolerance,
            move_threshold_pct: self.move_threshold_pct,
            offsets_ms: self.offsets.clone(),
            catchup_pct: self.catchup_pct,
            max_samples: self.max_samples,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StopConfig {
    pub thresholds_pct: Vec<f64>,
    pub band_width_pct: f64,
    #[serde(deserialize_with = "duration_ms")]
    pub cooldown: u64,
    pub max_samples: usize,
}

impl Default for StopConfig {
    fn default() -> Self {
        let d = StopTriggerConfig::default();
        Self {
            thresholds_pct: d.thresholds_pct,
            band_width_pct: d.band_width_pct,
            cooldown: d.cooldown_ms,
            max_samples: d.max_samples,
        }
    }
}

impl StopConfig {
    pub fn simulator_config(&self) -> StopTriggerConfig {
        StopTriggerConfig {
            thresholds_pct: self.thresholds_pct.clone(),
            band_width_pct: self.band_width_pct,
            cooldown_ms: self.cooldown,
            max_samples: self.max_samples,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub worst_n: usize,
    #[serde(deserialize_with = "durations_ms")]
    pub catchup_buckets: Vec<u64>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            worst_n: 5,
            catchup_buckets: vec![0, 1_000, 5_000, 10_000, 30_000],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

/// Parse a duration such as "250ms", "5s", "1m" or "1h" into milliseconds.
/// Zero is allowed ("0s") since ladder offsets start there.
pub fn parse_duration_ms(s: &str) -> Result<u64> {
    let s = s.trim();
    let (num_str, unit_ms) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60_000)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3_600_000)
    } else {
        bail!(
            "invalid duration '{}': expected a suffix of ms/s/m/h, e.g. '10s'",
            s
        );
    };

    if num_str.is_empty() {
        bail!("invalid duration '{}': missing quantity", s);
    }
    let n: u64 = num_str.parse().with_context(|| {
        format!(
            "invalid duration '{}': quantity must be a non-negative integer",
            s
        )
    })?;

    n.checked_mul(unit_ms)
        .with_context(|| format!("invalid duration '{}': value is too large", s))
}

fn duration_ms<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration_ms(&raw).map_err(serde::de::Error::custom)
}

fn durations_ms<'de, D>(deserializer: D) -> std::result::Result<Vec<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    raw.iter()
        .map(|s| parse_duration_ms(s).map_err(serde::de::Error::custom))
        .collect()
}

impl Config {
    /// Load from `path`, falling back to defaults when the default path is
    /// absent. `.env` and `LEVERAGE_LAG_DATA_DIR` override the data directory.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.data.dir = PathBuf::from(dir);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&config_str).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.instruments.reference.trim().is_empty() {
            bail!("instruments.reference must not be empty");
        }
        if self.instruments.derived.is_empty() {
            bail!("instruments.derived must list at least one instrument");
        }
        for d in &self.instruments.derived {
            if d.symbol.trim().is_empty() {
                bail!("instruments.derived contains an empty symbol");
            }
            if d.leverage == 0.0 || !d.leverage.is_finite() {
                bail!("instruments.derived '{}': leverage must be non-zero", d.symbol);
            }
        }

        if self.session.close_utc <= self.session.open_utc {
            bail!("session.close_utc must be after session.open_utc");
        }

        if self.ratio.windows.is_empty() || self.ratio.windows.contains(&0) {
            bail!("ratio.windows must be non-empty and positive");
        }
        if self.ratio.windows.windows(2).any(|w| w[0] >= w[1]) {
            bail!("ratio.windows must be strictly ascending");
        }
        check_tolerance("ratio.gap_tolerance", self.ratio.gap_tolerance)?;
        check_max_samples("ratio.max_samples", self.ratio.max_samples)?;
        if self.ratio.noise_floor_pct < 0.0 {
            bail!("ratio.noise_floor_pct must be >= 0");
        }

        if self.lag.detection_window == 0 {
            bail!("lag.detection_window must be positive");
        }
        check_tolerance("lag.gap_tolerance", self.lag.gap_tolerance)?;
        check_max_samples("lag.max_samples", self.lag.max_samples)?;
        if self.lag.move_threshold_pct <= 0.0 {
            bail!("lag.move_threshold_pct must be > 0");
        }
        if self.lag.offsets.is_empty() {
            bail!("lag.offsets must not be empty");
        }
        if self.lag.offsets.windows(2).any(|w| w[0] >= w[1]) {
            bail!("lag.offsets must be strictly ascending");
        }

        if self.stop.thresholds_pct.is_empty() || self.stop.thresholds_pct.iter().any(|t| *t <= 0.0)
        {
            bail!("stop.thresholds_pct must be non-empty and positive");
        }
        if self.stop.band_width_pct <= 0.0 {
            bail!("stop.band_width_pct must be > 0");
        }
        check_max_samples("stop.max_samples", self.stop.max_samples)?;

        if self.report.catchup_buckets.windows(2).any(|w| w[0] >= w[1]) {
            bail!("report.catchup_buckets must be strictly ascending");
        }

        for date in &self.data.dates {
            crate::ingest::parse_session_date(date)
                .with_context(|| format!("data.dates entry '{}' is invalid", date))?;
        }
        Ok(())
    }
}

fn check_tolerance(name: &str, value: f64) -> Result<()> {
    if !(0.0..1.0).contains(&value) {
        bail!("{} must be in [0, 1), got {}", name, value);
    }
    Ok(())
}

fn check_max_samples(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        bail!("{} must be > 0", name);
    }
    Ok(())
}
