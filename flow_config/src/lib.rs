#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the flow meter.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `[meter]` holds the global pour-detection constants; each `[[channels]]`
//!   entry may override any of them for one input.
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Pour-detection constants.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MeterCfg {
    /// Sensor frequency in Hz per L/min of flow (7.5 for the common hall-effect meters).
    pub frequency_constant: f64,
    /// A pour must exceed this many liters before it can complete.
    #[serde(alias = "min_pour_volume")]
    pub min_pour_volume_l: f64,
    /// Silence after the last pulse, in ms, before a pour may complete.
    pub idle_timeout_ms: u64,
}

impl Default for MeterCfg {
    fn default() -> Self {
        Self {
            frequency_constant: 7.5,
            min_pour_volume_l: 0.1,
            idle_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollerCfg {
    /// Idle check cadence in milliseconds
    pub interval_ms: u64,
}

impl Default for PollerCfg {
    fn default() -> Self {
        Self { interval_ms: 100 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputCfg {
    /// Rising edges closer together than this are treated as bounce
    pub debounce_ms: u64,
    /// Enable the internal pull-up on sensor inputs
    pub pull_up: bool,
}

impl Default for InputCfg {
    fn default() -> Self {
        Self {
            debounce_ms: 20,
            pull_up: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndicatorCfg {
    /// LED output pin; absent disables the indicator
    pub pin: Option<u8>,
    /// The LED goes dark once no pulse has arrived for this long
    pub hold_ms: u64,
}

impl Default for IndicatorCfg {
    fn default() -> Self {
        Self {
            pin: None,
            hold_ms: 200,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// One physical flow sensor input.
#[derive(Debug, Deserialize, Clone)]
pub struct ChannelCfg {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub frequency_constant: Option<f64>,
    #[serde(default, alias = "min_pour_volume")]
    pub min_pour_volume_l: Option<f64>,
    #[serde(default)]
    pub idle_timeout_ms: Option<u64>,
}

impl ChannelCfg {
    /// Merge this channel's overrides over the global meter constants.
    pub fn effective(&self, meter: &MeterCfg) -> MeterCfg {
        MeterCfg {
            frequency_constant: self.frequency_constant.unwrap_or(meter.frequency_constant),
            min_pour_volume_l: self.min_pour_volume_l.unwrap_or(meter.min_pour_volume_l),
            idle_timeout_ms: self.idle_timeout_ms.unwrap_or(meter.idle_timeout_ms),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub meter: MeterCfg,
    #[serde(default)]
    pub poller: PollerCfg,
    #[serde(default)]
    pub input: InputCfg,
    #[serde(default)]
    pub indicator: IndicatorCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub channels: Vec<ChannelCfg>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_path(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

fn validate_meter(prefix: &str, m: &MeterCfg) -> eyre::Result<()> {
    if !(m.frequency_constant.is_finite() && m.frequency_constant > 0.0) {
        eyre::bail!("{prefix}.frequency_constant must be > 0");
    }
    if !(m.min_pour_volume_l.is_finite() && m.min_pour_volume_l > 0.0) {
        eyre::bail!("{prefix}.min_pour_volume_l must be > 0");
    }
    if m.idle_timeout_ms == 0 {
        eyre::bail!("{prefix}.idle_timeout_ms must be >= 1");
    }
    if m.idle_timeout_ms > 24 * 60 * 60 * 1000 {
        eyre::bail!("{prefix}.idle_timeout_ms is unreasonably large (>24h)");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Meter
        validate_meter("meter", &self.meter)?;

        // Poller
        if self.poller.interval_ms == 0 {
            eyre::bail!("poller.interval_ms must be >= 1");
        }

        // Indicator
        if self.indicator.hold_ms == 0 {
            eyre::bail!("indicator.hold_ms must be >= 1");
        }

        // Channels
        if self.channels.is_empty() {
            eyre::bail!("channels must not be empty");
        }
        let mut seen = HashSet::new();
        for ch in &self.channels {
            if !seen.insert(ch.id) {
                eyre::bail!("channel ids must be unique (duplicate id {})", ch.id);
            }
            if ch.name.trim().is_empty() {
                eyre::bail!("channel {} name must not be empty", ch.id);
            }
            let effective = ch.effective(&self.meter);
            validate_meter(&format!("channels[{}]", ch.id), &effective)?;
            if self.poller.interval_ms >= effective.idle_timeout_ms {
                eyre::bail!(
                    "poller.interval_ms must be below idle_timeout_ms ({} >= {} on channel {})",
                    self.poller.interval_ms,
                    effective.idle_timeout_ms,
                    ch.id
                );
            }
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot.to_ascii_lowercase().as_str(), "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_overrides_merge_over_meter() {
        let meter = MeterCfg::default();
        let ch = ChannelCfg {
            id: 23,
            name: "Cider".into(),
            frequency_constant: None,
            min_pour_volume_l: Some(0.25),
            idle_timeout_ms: None,
        };
        let eff = ch.effective(&meter);
        assert_eq!(eff.frequency_constant, 7.5);
        assert_eq!(eff.min_pour_volume_l, 0.25);
        assert_eq!(eff.idle_timeout_ms, 2000);
    }

    #[test]
    fn defaults_match_sensor_datasheet() {
        let m = MeterCfg::default();
        assert_eq!(m.frequency_constant, 7.5);
        assert_eq!(m.idle_timeout_ms, 2000);
        assert_eq!(PollerCfg::default().interval_ms, 100);
        assert_eq!(InputCfg::default().debounce_ms, 20);
    }
}
