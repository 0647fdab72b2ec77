//! Console output for pour events, as text or JSON lines.

use std::collections::HashMap;
use std::io::Write;

use flow_core::{ChannelId, ChannelSnapshot, PourEvents};
use serde_json::json;

fn unix_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Prints pour starts and completions to stdout. Pulses are left to the
/// debug log.
pub struct ConsolePrinter {
    names: HashMap<ChannelId, String>,
    json: bool,
}

impl ConsolePrinter {
    pub fn new(cfg: &flow_config::Config, json: bool) -> Self {
        let names = cfg
            .channels
            .iter()
            .map(|c| (ChannelId(c.id), c.name.clone()))
            .collect();
        Self { names, json }
    }

    fn name(&self, channel: ChannelId) -> &str {
        self.names.get(&channel).map_or("?", String::as_str)
    }

    fn emit(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        // A closed stdout is not worth crashing the meter over.
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

impl PourEvents for ConsolePrinter {
    fn pour_started(&self, channel: ChannelId) {
        let line = if self.json {
            json!({
                "event": "pour_started",
                "timestamp": unix_ms(),
                "channel": channel.0,
                "name": self.name(channel),
            })
            .to_string()
        } else {
            format!("pour started: {}", self.name(channel))
        };
        self.emit(&line);
    }

    fn pulse(&self, _channel: ChannelId, _volume: f64) {}

    fn pour_complete(&self, channel: ChannelId, name: &str, volume: f64, total_volume: f64) {
        let line = if self.json {
            json!({
                "event": "pour_complete",
                "timestamp": unix_ms(),
                "channel": channel.0,
                "name": name,
                "volume_l": volume,
                "total_l": total_volume,
            })
            .to_string()
        } else {
            format!("pour complete: {name} {volume:.4} L (total {total_volume:.4} L)")
        };
        self.emit(&line);
    }
}

/// Final per-channel state, one line of JSON or the multi-line text form.
pub fn print_snapshots(snaps: &[ChannelSnapshot], json: bool) {
    for s in snaps {
        if json {
            println!(
                "{}",
                json!({
                    "event": "channel_state",
                    "channel": s.id.0,
                    "name": s.name,
                    "phase": s.phase.as_str(),
                    "pulses": s.pulses,
                    "volume_l": s.volume,
                    "total_l": s.total_volume,
                    "pours": s.pour_count,
                })
            );
        } else {
            println!("{s}");
        }
    }
}
