//! Human-readable error descriptions and structured JSON error formatting.

use flow_core::error::{BuildError, FlowError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingInput => {
                "What happened: A channel was built without an input.\nLikely causes: A [[channels]] entry is missing its id or name.\nHow to fix: Give every [[channels]] entry an id and a name.".to_string()
            }
            BuildError::MissingEvents => {
                "What happened: A channel was built without an event listener.\nLikely causes: Internal wiring error.\nHow to fix: Re-run with --log-level=debug and report the output.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Zero or negative values in [meter] or a channel override.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(fe) = err.downcast_ref::<FlowError>() {
        return match fe {
            FlowError::Timeout => "What happened: No pour completed before the timeout.\nLikely causes: Too few pulses to exceed meter.min_pour_volume_l, or --timeout-ms shorter than meter.idle_timeout_ms.\nHow to fix: Send more pulses or raise --timeout-ms.".to_string(),
            FlowError::UnknownChannel(id) => format!(
                "What happened: Channel {id} is not configured.\nLikely causes: Typo in --channel or a missing [[channels]] entry.\nHow to fix: Use one of the ids listed by `flowmeter self-check`."
            ),
            FlowError::DuplicateChannel(id) => format!(
                "What happened: Channel {id} is configured twice.\nLikely causes: Two [[channels]] entries share an id.\nHow to fix: Give every channel a unique id."
            ),
            FlowError::Config(msg) if msg.starts_with("read config") => format!(
                "What happened: Could not read the config file.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config with a readable TOML file. Original: {msg}"
            ),
            FlowError::Config(msg) => format!(
                "What happened: Configuration is invalid ({msg}).\nLikely causes: Malformed TOML, missing [[channels]], or out-of-range values.\nHow to fix: Edit the TOML config and try again."
            ),
            FlowError::Hardware(msg) => format!(
                "What happened: GPIO access failed ({msg}).\nLikely causes: Wrong pin number, or the process lacks GPIO permissions.\nHow to fix: Check channel ids and [indicator] pin; run as a user in the gpio group."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = err.to_string();
    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 for a pour timeout, 2 for configuration problems, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(fe) = err.downcast_ref::<FlowError>() {
        return match fe {
            FlowError::Timeout => 3,
            FlowError::UnknownChannel(_) | FlowError::DuplicateChannel(_) | FlowError::Config(_) => 2,
            _ => 1,
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(fe) = err.downcast_ref::<FlowError>() {
        return match fe {
            FlowError::Timeout => "Timeout",
            FlowError::UnknownChannel(_) => "UnknownChannel",
            FlowError::DuplicateChannel(_) => "DuplicateChannel",
            FlowError::Hardware(_) => "Hardware",
            FlowError::Source(_) => "Source",
            FlowError::Config(_) => "Config",
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "Config";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "event": "error",
        "reason": reason_name(err),
        "message": humanize(err),
    })
    .to_string()
}
