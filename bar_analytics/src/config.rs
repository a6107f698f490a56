//! Engine configuration: parsing, normalization, and loading.
//!
//! A single TOML document configures the session clock, the session
//! indexer offsets, VWAP reset behaviour, default window sizes, and a list
//! of named threshold monitors:
//!
//! ```toml
//! timezone = "America/New_York"
//!
//! [session]
//! gap_minutes = 30
//! rth_start_offset_minutes = 930
//!
//! [stats]
//! window = 20
//!
//! [[monitors]]
//! name = "es above 5000"
//! operator = "above"
//! value = 5000.0
//! threshold = 3
//! ```
//!
//! Every section is optional and falls back to its defaults.
//!
//! Key behaviors:
//! - Monitor names are trimmed and de-duplicated, the first occurrence wins.
//! - A monitor threshold of `0` is raised to `1`.
//! - The timezone must be a known IANA name and the session offsets must be
//!   strictly increasing.
//!
//! Entrypoints:
//! - Parse + normalize from a TOML string: [`load_config_str`]
//! - Parse + normalize from a file path: [`load_config_path`]
//! - Normalization alone: [`normalize_config`]

use std::collections::HashSet;

use anyhow::{Context, bail};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use toml::from_str;
use tracing::{info, warn};

use crate::{
    derived,
    errors::EngineError,
    models::Swing,
    notifier::{MonitorSet, Operator},
    session::SessionConfig,
    store::{BarStore, DEFAULT_VWAP_RESET_GAP_MINUTES},
    swing::store_swings,
    tz::parse_timezone,
};

pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// IANA name of the session clock.
    pub timezone: String,
    pub session: SessionConfig,
    pub vwap: VwapConfig,
    pub stats: StatsConfig,
    pub monitors: Vec<MonitorConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            session: SessionConfig::default(),
            vwap: VwapConfig::default(),
            stats: StatsConfig::default(),
            monitors: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn timezone(&self) -> anyhow::Result<Tz> {
        parse_timezone(&self.timezone)
    }

    /// An empty store for `symbol` on the configured session clock and VWAP
    /// reset gap.
    pub fn new_store(&self, symbol: impl Into<String>) -> anyhow::Result<BarStore> {
        Ok(BarStore::with_timezone(symbol, self.timezone()?)
            .with_vwap_reset_gap(self.vwap.reset_gap_minutes))
    }

    /// [`derived::compute_vwap`] with the configured reset gap.
    pub fn compute_vwap(&self, store: &mut BarStore) -> Result<(), EngineError> {
        derived::compute_vwap(store, self.vwap.reset_gap_minutes)
    }

    /// [`derived::compute_standardized`] over `stats.window`.
    pub fn compute_standardized(
        &self,
        store: &mut BarStore,
        source: &str,
        name: &str,
    ) -> Result<(), EngineError> {
        derived::compute_standardized(store, source, self.stats.window, name)
    }

    /// Swings over the whole store with `stats.swing_window`.
    pub fn swings(&self, store: &BarStore) -> Vec<Swing> {
        store_swings(store, 0, 0, self.stats.swing_window)
    }

    pub fn monitor_set(&self) -> MonitorSet {
        MonitorSet::from_config(&self.monitors)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct VwapConfig {
    /// Gap (minutes) after which the running VWAP restarts.
    pub reset_gap_minutes: i64,
}

impl Default for VwapConfig {
    fn default() -> Self {
        Self {
            reset_gap_minutes: DEFAULT_VWAP_RESET_GAP_MINUTES,
        }
    }
}

/// Default window sizes for the windowed statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatsConfig {
    /// Rolling mean / standardize window.
    pub window: usize,
    /// Half-width of the swing detection window.
    pub swing_window: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window: 20,
            swing_window: 5,
        }
    }
}

/// One named threshold monitor.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    pub name: String,
    pub operator: Operator,
    pub value: f64,
    /// Consecutive observations required before the monitor enters.
    #[serde(default = "default_threshold")]
    pub threshold: u32,
}

fn default_threshold() -> u32 {
    1
}

/// Summary of changes performed during normalization.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizationReport {
    /// Monitor names changed by trimming.
    pub monitors_renamed: usize,
    /// Monitors dropped because an earlier one had the same name.
    pub monitors_deduped: usize,
    /// Thresholds raised from 0 to 1.
    pub thresholds_floored: usize,
}

/// Normalize and validate a config in place.
///
/// Errors:
/// - Unknown timezone
/// - Non-positive session gap, VWAP reset gap, first-hour length or windows
/// - Session offsets that are not `0 <= eu < rth_start < rth_end`
/// - Empty monitor names or non-finite monitor values
pub fn normalize_config(cfg: &mut EngineConfig) -> anyhow::Result<NormalizationReport> {
    let mut report = NormalizationReport::default();

    cfg.timezone = cfg.timezone.trim().to_string();
    parse_timezone(&cfg.timezone)?;

    let s = &cfg.session;
    if s.gap_minutes <= 0 {
        bail!("session.gap_minutes must be > 0");
    }
    if s.first_hour_minutes <= 0 {
        bail!("session.first_hour_minutes must be > 0");
    }
    if !(0 <= s.eu_offset_minutes
        && s.eu_offset_minutes < s.rth_start_offset_minutes
        && s.rth_start_offset_minutes < s.rth_end_offset_minutes)
    {
        bail!(
            "session offsets must be strictly increasing: eu={} rth_start={} rth_end={}",
            s.eu_offset_minutes,
            s.rth_start_offset_minutes,
            s.rth_end_offset_minutes
        );
    }
    if cfg.vwap.reset_gap_minutes <= 0 {
        bail!("vwap.reset_gap_minutes must be > 0");
    }
    if cfg.stats.window == 0 || cfg.stats.swing_window == 0 {
        bail!("stats windows must be > 0");
    }

    let before = cfg.monitors.len();
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(before);
    for mut m in std::mem::take(&mut cfg.monitors) {
        let name = m.name.trim().to_string();
        if name.is_empty() {
            bail!("monitor name cannot be empty after trimming");
        }
        if name != m.name {
            report.monitors_renamed += 1;
            m.name = name;
        }
        if !m.value.is_finite() {
            bail!("monitor '{}' has a non-finite value", m.name);
        }
        if m.threshold == 0 {
            report.thresholds_floored += 1;
            m.threshold = 1;
        }
        if seen.insert(m.name.clone()) {
            kept.push(m);
        } else {
            warn!(monitor = %m.name, "duplicate monitor dropped");
        }
    }
    report.monitors_deduped = before - kept.len();
    cfg.monitors = kept;

    Ok(report)
}

/// Parse and normalize a config from a TOML string.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<EngineConfig> {
    let mut cfg: EngineConfig = from_str(toml_str).context("failed to parse engine config TOML")?;
    let report = normalize_config(&mut cfg).context("normalize_config failed")?;
    info!(
        timezone = %cfg.timezone,
        monitors = cfg.monitors.len(),
        renamed = report.monitors_renamed,
        deduped = report.monitors_deduped,
        floored = report.thresholds_floored,
        "engine config loaded"
    );
    Ok(cfg)
}

/// Read a config TOML file from disk, parse, and normalize it.
pub fn load_config_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<EngineConfig> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    load_config_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawBar;
    use std::io::Write;

    #[test]
    fn empty_document_is_all_defaults() {
        let cfg = load_config_str("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.session.rth_start_offset_minutes, 930);
        assert_eq!(cfg.timezone().unwrap(), chrono_tz::America::New_York);
    }

    #[test]
    fn monitors_are_trimmed_deduped_and_floored() {
        let toml_str = r#"
            [[monitors]]
            name = " es above "
            operator = "above"
            value = 5000.0
            threshold = 0

            [[monitors]]
            name = "es above"
            operator = "below"
            value = 1.0

            [[monitors]]
            name = "es below"
            operator = "at_or_below"
            value = 4900.0
            threshold = 3
        "#;
        let mut cfg: EngineConfig = toml::from_str(toml_str).unwrap();
        let report = normalize_config(&mut cfg).unwrap();
        assert_eq!(
            report,
            NormalizationReport {
                monitors_renamed: 1,
                monitors_deduped: 1,
                thresholds_floored: 1,
            }
        );
        let names: Vec<_> = cfg.monitors.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["es above", "es below"]);
        assert_eq!(cfg.monitors[0].operator, Operator::Above);
        assert_eq!(cfg.monitors[0].threshold, 1);
        assert_eq!(cfg.monitor_set().len(), 2);
    }

    #[test]
    fn rejects_bad_timezone_and_offsets() {
        let err = load_config_str(r#"timezone = "Nowhere/Else""#).unwrap_err();
        assert!(format!("{err:#}").contains("bad tz"));

        let err = load_config_str("[session]\nrth_start_offset_minutes = 400").unwrap_err();
        assert!(format!("{err:#}").contains("strictly increasing"));
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(load_config_str("[session]\ngap = 5").is_err());
        assert!(load_config_str("[[monitors]]\nname = \"x\"\noperator = \"sideways\"\nvalue = 1.0").is_err());
    }

    #[test]
    fn loads_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timezone = \"America/Chicago\"\n[stats]\nwindow = 10").unwrap();
        let cfg = load_config_path(file.path()).unwrap();
        assert_eq!(cfg.timezone().unwrap(), chrono_tz::America::Chicago);
        assert_eq!(cfg.stats.window, 10);
        assert_eq!(cfg.stats.swing_window, 5);

        let missing = file.path().with_extension("missing");
        let err = load_config_path(&missing).unwrap_err();
        assert!(err.to_string().contains("read config file"));
    }

    #[test]
    fn configured_reset_gap_reaches_the_store() {
        let cfg = load_config_str("[vwap]\nreset_gap_minutes = 60").unwrap();
        let mut store = cfg.new_store("ES").unwrap();
        assert_eq!(store.vwap_reset_gap_minutes(), 60);

        let t0 = chrono::NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        store
            .append(RawBar::new(t0, 10.0, 10.0, 10.0, 10.0, 1.0).with_vwap(10.0))
            .unwrap();
        let t1 = t0 + chrono::TimeDelta::minutes(45);
        store.append(RawBar::new(t1, 20.0, 20.0, 20.0, 20.0, 1.0)).unwrap();
        // a 45 minute gap is inside the 60 minute session
        assert_eq!(store.column("vwap").unwrap()[1], 15.0);

        let mut fresh = cfg.new_store("ES").unwrap();
        fresh.append(RawBar::new(t0, 10.0, 10.0, 10.0, 10.0, 1.0)).unwrap();
        fresh.append(RawBar::new(t1, 20.0, 20.0, 20.0, 20.0, 1.0)).unwrap();
        cfg.compute_vwap(&mut fresh).unwrap();
        assert_eq!(fresh.column("vwap").unwrap(), &[10.0, 15.0]);
    }

    #[test]
    fn stats_windows_drive_derived_columns() {
        let cfg = load_config_str("[stats]\nwindow = 3\nswing_window = 1").unwrap();
        let t0 = chrono::NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let closes = [1.0, 3.0, 2.0, 4.0, 3.0];
        let mut store = BarStore::from_bars(
            "ES",
            closes.iter().enumerate().map(|(i, &c)| {
                RawBar::new(t0 + chrono::TimeDelta::minutes(i as i64), c, c, c, c, 1.0)
            }),
        )
        .unwrap();

        cfg.compute_standardized(&mut store, "close", "z").unwrap();
        let z = store.column("z").unwrap();
        // window 3: first two rows are warm-up
        assert_eq!(&z[..2], &[0.0, 0.0]);
        assert_eq!(z[2], 0.0);
        assert_eq!(z[3], 100.0);

        let positions: Vec<_> = cfg.swings(&store).iter().map(|s| s.position).collect();
        assert!(positions.contains(&1));
        assert!(positions.contains(&2));
        assert!(positions.contains(&3));
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn normalized_monitor_names_are_trimmed_and_unique(
            names in proptest::collection::vec("[ a-c]{0,4}", 1..8),
        ) {
            let mut cfg = EngineConfig {
                monitors: names
                    .iter()
                    .map(|n| MonitorConfig {
                        name: n.clone(),
                        operator: Operator::Above,
                        value: 1.0,
                        threshold: 0,
                    })
                    .collect(),
                ..EngineConfig::default()
            };
            if normalize_config(&mut cfg).is_ok() {
                let mut seen = HashSet::new();
                for m in &cfg.monitors {
                    prop_assert_eq!(m.name.trim(), m.name.as_str());
                    prop_assert!(seen.insert(m.name.clone()));
                    prop_assert_eq!(m.threshold, 1);
                }
            }
        }
    }
}
