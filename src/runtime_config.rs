// =============================================================================
// Runtime Configuration — analysis run settings
// =============================================================================
//
// Loaded from a JSON file (default `signal_config.json`, overridable with
// `SIGNAL_CONFIG`).  All fields carry `#[serde(default)]` so that a partial
// file only needs to name what differs from the defaults.
//
// =============================================================================

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::AnalysisParams;
use crate::multi_day::PipelineConfig;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_instruments() -> Vec<String> {
    vec!["ni2001".to_string()]
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 11, 4).unwrap_or_default()
}

fn default_end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 11, 8).unwrap_or_default()
}

fn default_frequencies_secs() -> Vec<i64> {
    vec![10]
}

fn default_lookback() -> usize {
    100
}

fn default_shift_lag() -> usize {
    1
}

fn default_price_decimals() -> Option<u32> {
    Some(2)
}

fn default_session_padding_mins() -> i64 {
    5
}

fn default_tick_dir() -> PathBuf {
    PathBuf::from("data/ticks")
}

// =============================================================================
// AnalysisConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    // --- What to analyse -----------------------------------------------------

    /// Instrument ids, e.g. `ni2001`, `IF1912`, `SR001`.
    #[serde(default = "default_instruments")]
    pub instruments: Vec<String>,

    /// First calendar date of the run (inclusive).
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,

    /// Last calendar date of the run (inclusive).
    #[serde(default = "default_end_date")]
    pub end_date: NaiveDate,

    /// Resample frequencies; each one is a separate analysis.
    #[serde(default = "default_frequencies_secs")]
    pub frequencies_secs: Vec<i64>,

    // --- Binning -------------------------------------------------------------

    /// Rolling window of the delta standard deviation, in rows.
    #[serde(default = "default_lookback")]
    pub lookback: usize,

    /// Rows by which the bin leads the direction it is paired with.
    #[serde(default = "default_shift_lag")]
    pub shift_lag: usize,

    /// Restart rolling state every trading day instead of running across days.
    #[serde(default)]
    pub reset_at_day_boundary: bool,

    // --- VWAP ----------------------------------------------------------------

    /// Decimal places of vwap / delta / ddelta. `null` keeps full precision.
    #[serde(default = "default_price_decimals")]
    pub price_decimals: Option<u32>,

    #[serde(default)]
    pub normalize_by_multiplier: bool,

    /// Contract multipliers replacing the built-in ones, by product class.
    #[serde(default)]
    pub multiplier_overrides: HashMap<String, f64>,

    // --- Data ----------------------------------------------------------------

    /// Minutes added before the open and after the close when querying ticks.
    #[serde(default = "default_session_padding_mins")]
    pub session_padding_mins: i64,

    /// Root of the `<instrument>/<YYYY-MM-DD>.json` tick files.
    #[serde(default = "default_tick_dir")]
    pub tick_dir: PathBuf,

    /// Weekdays with no trading.
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            instruments: default_instruments(),
            start_date: default_start_date(),
            end_date: default_end_date(),
            frequencies_secs: default_frequencies_secs(),
            lookback: default_lookback(),
            shift_lag: default_shift_lag(),
            reset_at_day_boundary: false,
            price_decimals: default_price_decimals(),
            normalize_by_multiplier: false,
            multiplier_overrides: HashMap::new(),
            session_padding_mins: default_session_padding_mins(),
            tick_dir: default_tick_dir(),
            holidays: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read analysis config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse analysis config from {}", path.display()))?;

        info!(
            path = %path.display(),
            instruments = ?config.instruments,
            frequencies_secs = ?config.frequencies_secs,
            "analysis config loaded"
        );

        Ok(config)
    }

    /// Replace the instrument list with a comma separated one.  Blank input
    /// leaves the list untouched.
    pub fn override_instruments(&mut self, raw: &str) {
        let instruments: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if !instruments.is_empty() {
            self.instruments = instruments;
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.instruments.is_empty(), "no instruments configured");
        ensure!(
            self.start_date <= self.end_date,
            "start_date {} is after end_date {}",
            self.start_date,
            self.end_date
        );
        ensure!(!self.frequencies_secs.is_empty(), "no frequencies configured");
        if let Some(bad) = self.frequencies_secs.iter().find(|f| **f <= 0) {
            anyhow::bail!("frequency must be positive, got {bad}s");
        }
        ensure!(
            self.lookback >= 2,
            "lookback must be at least 2, got {}",
            self.lookback
        );
        ensure!(
            self.session_padding_mins >= 0,
            "session padding must not be negative, got {} min",
            self.session_padding_mins
        );
        for (product, multiplier) in &self.multiplier_overrides {
            ensure!(
                multiplier.is_finite() && *multiplier > 0.0,
                "multiplier override for '{product}' must be positive, got {multiplier}"
            );
        }
        Ok(())
    }

    pub fn frequencies(&self) -> Vec<Duration> {
        self.frequencies_secs.iter().map(|s| Duration::seconds(*s)).collect()
    }

    pub fn pipeline_config(&self, frequency: Duration) -> PipelineConfig {
        PipelineConfig {
            frequency,
            price_decimals: self.price_decimals,
            normalize_by_multiplier: self.normalize_by_multiplier,
            session_padding: Duration::minutes(self.session_padding_mins),
        }
    }

    pub fn analysis_params(&self) -> AnalysisParams {
        AnalysisParams {
            lookback: self.lookback,
            shift_lag: self.shift_lag,
            reset_at_day_boundary: self.reset_at_day_boundary,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = AnalysisConfig::default();
        assert_eq!(cfg.instruments, vec!["ni2001"]);
        assert_eq!(cfg.frequencies_secs, vec![10]);
        assert_eq!(cfg.lookback, 100);
        assert_eq!(cfg.shift_lag, 1);
        assert!(!cfg.reset_at_day_boundary);
        assert_eq!(cfg.price_decimals, Some(2));
        assert_eq!(cfg.session_padding_mins, 5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: AnalysisConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.lookback, 100);
        assert_eq!(cfg.start_date, default_start_date());
        assert!(cfg.holidays.is_empty());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{
            "instruments": ["IF1912", "T2003"],
            "frequencies_secs": [10, 60, 360],
            "price_decimals": null,
            "holidays": ["2019-11-06"]
        }"#;
        let cfg: AnalysisConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.instruments, vec!["IF1912", "T2003"]);
        assert_eq!(cfg.frequencies().len(), 3);
        assert_eq!(cfg.price_decimals, None);
        assert_eq!(cfg.holidays, vec![NaiveDate::from_ymd_opt(2019, 11, 6).unwrap()]);
        assert_eq!(cfg.lookback, 100);
    }

    #[test]
    fn validate_rejects_bad_settings() {
        let base = AnalysisConfig::default();

        let mut cfg = base.clone();
        cfg.lookback = 1;
        assert!(cfg.validate().is_err());

        let mut cfg = base.clone();
        cfg.frequencies_secs = vec![10, 0];
        assert!(cfg.validate().is_err());

        let mut cfg = base.clone();
        cfg.frequencies_secs.clear();
        assert!(cfg.validate().is_err());

        let mut cfg = base.clone();
        cfg.start_date = cfg.end_date.succ_opt().unwrap();
        assert!(cfg.validate().is_err());

        let mut cfg = base.clone();
        cfg.session_padding_mins = -1;
        assert!(cfg.validate().is_err());

        let mut cfg = base.clone();
        cfg.multiplier_overrides.insert("ni".into(), 0.0);
        assert!(cfg.validate().is_err());

        let mut cfg = base;
        cfg.instruments.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn instrument_override_parses_list() {
        let mut cfg = AnalysisConfig::default();
        cfg.override_instruments(" cu2001, IF1912 ,,");
        assert_eq!(cfg.instruments, vec!["cu2001", "IF1912"]);
        cfg.override_instruments("  ");
        assert_eq!(cfg.instruments, vec!["cu2001", "IF1912"]);
    }

    #[test]
    fn derived_settings() {
        let cfg = AnalysisConfig {
            reset_at_day_boundary: true,
            normalize_by_multiplier: true,
            ..AnalysisConfig::default()
        };
        let pipeline = cfg.pipeline_config(Duration::seconds(60));
        assert_eq!(pipeline.frequency, Duration::seconds(60));
        assert_eq!(pipeline.session_padding, Duration::minutes(5));
        assert!(pipeline.normalize_by_multiplier);
        assert!(cfg.analysis_params().reset_at_day_boundary);
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{ "lookback": 50 }"#).unwrap();
        let cfg = AnalysisConfig::load(file.path()).unwrap();
        assert_eq!(cfg.lookback, 50);
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AnalysisConfig::load(dir.path().join("absent.json")).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ lookback: ").unwrap();
        let err = AnalysisConfig::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse analysis config"));
    }
}
