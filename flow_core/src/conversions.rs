//! `From` implementations bridging `flow_config` types to `flow_core` types.

use std::time::Duration;

use crate::config::{MeterCfg, PollerCfg};

// ── MeterCfg ─────────────────────────────────────────────────────────────────

impl From<&flow_config::MeterCfg> for MeterCfg {
    fn from(c: &flow_config::MeterCfg) -> Self {
        Self {
            frequency_constant: c.frequency_constant,
            min_pour_volume: c.min_pour_volume_l,
            idle_timeout_ms: c.idle_timeout_ms,
        }
    }
}

// ── PollerCfg ────────────────────────────────────────────────────────────────

impl From<&flow_config::PollerCfg> for PollerCfg {
    fn from(c: &flow_config::PollerCfg) -> Self {
        Self {
            interval: Duration::from_millis(c.interval_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_channel_override_reaches_runtime_cfg() {
        let global = flow_config::MeterCfg::default();
        let ch = flow_config::ChannelCfg {
            id: 22,
            name: "Beer".into(),
            frequency_constant: Some(5.5),
            min_pour_volume_l: None,
            idle_timeout_ms: Some(1500),
        };
        let cfg = MeterCfg::from(&ch.effective(&global));
        assert_eq!(cfg.frequency_constant, 5.5);
        assert_eq!(cfg.min_pour_volume, 0.1);
        assert_eq!(cfg.idle_timeout_ms, 1500);
    }

    #[test]
    fn poller_interval_is_milliseconds() {
        let cfg = PollerCfg::from(&flow_config::PollerCfg { interval_ms: 150 });
        assert_eq!(cfg.interval, Duration::from_millis(150));
    }
}
