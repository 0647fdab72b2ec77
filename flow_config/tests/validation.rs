use flow_config::{load_path, load_toml};
use rstest::rstest;
use std::fs;
use tempfile::tempdir;

const VALID: &str = r#"
[meter]
frequency_constant = 7.5
min_pour_volume_l = 0.1
idle_timeout_ms = 2000

[poller]
interval_ms = 100

[[channels]]
id = 22
name = "Beer"

[[channels]]
id = 23
name = "Cider"
min_pour_volume_l = 0.2
"#;

#[test]
fn accepts_two_channel_config() {
    let cfg = load_toml(VALID).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.channels.len(), 2);
    assert_eq!(cfg.channels[0].name, "Beer");
    assert_eq!(
        cfg.channels[1].effective(&cfg.meter).min_pour_volume_l,
        0.2
    );
}

#[test]
fn sections_other_than_channels_are_optional() {
    let toml = r#"
[[channels]]
id = 4
name = "Water"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("defaults should validate");
    assert_eq!(cfg.meter.idle_timeout_ms, 2000);
    assert!(cfg.input.pull_up);
    assert!(cfg.indicator.pin.is_none());
    assert_eq!(cfg.indicator.hold_ms, 200);
}

#[rstest]
#[case("frequency_constant = 0.0", "meter.frequency_constant must be > 0")]
#[case("frequency_constant = -7.5", "meter.frequency_constant must be > 0")]
#[case("min_pour_volume_l = 0.0", "meter.min_pour_volume_l must be > 0")]
#[case("idle_timeout_ms = 0", "meter.idle_timeout_ms must be >= 1")]
fn rejects_non_positive_meter_constants(#[case] line: &str, #[case] needle: &str) {
    let toml = format!(
        r#"
[meter]
{line}

[[channels]]
id = 22
name = "Beer"
"#
    );
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "expected '{needle}' in '{err}'"
    );
}

#[test]
fn rejects_bad_per_channel_override() {
    let toml = r#"
[[channels]]
id = 22
name = "Beer"
frequency_constant = 0.0
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(format!("{err}").contains("channels[22].frequency_constant must be > 0"));
}

#[test]
fn rejects_empty_channel_list() {
    let cfg = load_toml("[meter]\nidle_timeout_ms = 2000\n").expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(format!("{err}").contains("channels must not be empty"));
}

#[test]
fn rejects_duplicate_ids() {
    let toml = r#"
[[channels]]
id = 22
name = "Beer"

[[channels]]
id = 22
name = "Also beer"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(format!("{err}").contains("channel ids must be unique"));
}

#[test]
fn rejects_blank_name() {
    let toml = r#"
[[channels]]
id = 22
name = "  "
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(format!("{err}").contains("name must not be empty"));
}

#[test]
fn rejects_poller_slower_than_idle_timeout() {
    let toml = r#"
[meter]
idle_timeout_ms = 100

[poller]
interval_ms = 100

[[channels]]
id = 22
name = "Beer"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(format!("{err}").contains("poller.interval_ms must be below idle_timeout_ms"));
}

#[test]
fn rejects_zero_poller_interval() {
    let toml = r#"
[poller]
interval_ms = 0

[[channels]]
id = 22
name = "Beer"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(format!("{err}").contains("poller.interval_ms must be >= 1"));
}

#[test]
fn rejects_zero_indicator_hold() {
    let toml = r#"
[indicator]
pin = 18
hold_ms = 0

[[channels]]
id = 22
name = "Beer"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(format!("{err}").contains("indicator.hold_ms must be >= 1"));
}

#[test]
fn rejects_unknown_rotation() {
    let toml = r#"
[logging]
rotation = "weekly"

[[channels]]
id = 22
name = "Beer"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(format!("{err}").contains("logging.rotation"));
}

#[test]
fn load_path_reads_parses_and_validates() {
    let dir = tempdir().unwrap();
    let good = dir.path().join("good.toml");
    fs::write(&good, VALID).unwrap();
    let cfg = load_path(&good).expect("load valid file");
    assert_eq!(cfg.channels[1].id, 23);

    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "[meter]\nfrequency_constant = 0.0\n[[channels]]\nid = 1\nname = \"x\"\n")
        .unwrap();
    let err = load_path(&bad).expect_err("invalid file should fail");
    assert!(format!("{err}").contains("frequency_constant"));

    let missing = dir.path().join("missing.toml");
    let err = load_path(&missing).expect_err("missing file should fail");
    assert!(format!("{err}").contains("read config"));
}
