//! Typed decoding: defaults, overrides, validation, unused keys.

use arena_challenge::ChallengeMode;
use arena_config::{load_layered_yaml_from_strings, ArenaConfig, StoreBackend, UnusedKeyPolicy};
use chrono::NaiveTime;

#[test]
fn defaults_match_daily_midnight_berlin() {
    let cfg = ArenaConfig::default();
    assert_eq!(cfg.challenge.mode, ChallengeMode::Advanced);
    assert_eq!(cfg.challenge.synth.upper_bound, 1000);
    assert_eq!(
        cfg.schedule.fire_time().unwrap(),
        NaiveTime::from_hms_opt(0, 0, 0).unwrap()
    );
    assert_eq!(cfg.schedule.timezone().unwrap(), chrono_tz::Europe::Berlin);
    assert_eq!(cfg.store.backend, StoreBackend::Memory);
}

#[test]
fn overrides_are_decoded() {
    let yaml = r#"
challenge:
  mode: expert
  synth:
    max_value: 10
    operators: ["+", "-"]
schedule:
  at: "23:15"
  timezone: "America/New_York"
store:
  backend: postgres
"#;
    let cfg = load_layered_yaml_from_strings(&[yaml]).unwrap().typed().unwrap();
    assert_eq!(cfg.challenge.mode, ChallengeMode::Expert);
    assert_eq!(cfg.challenge.synth.max_value, 10);
    // Fields not named in the overlay keep their defaults.
    assert_eq!(cfg.challenge.synth.operand_count_max, 4);
    assert_eq!(
        cfg.schedule.fire_time().unwrap(),
        NaiveTime::from_hms_opt(23, 15, 0).unwrap()
    );
    assert_eq!(cfg.store.backend, StoreBackend::Postgres);
}

#[test]
fn invalid_values_fail_validation() {
    for yaml in [
        "schedule:\n  at: \"25:00\"\n",
        "schedule:\n  timezone: \"Mars/Olympus\"\n",
        "challenge:\n  synth:\n    operand_count_min: 5\n    operand_count_max: 2\n",
        // Expert sums of up to 4 x 300 cannot stay below 1000.
        "challenge:\n  mode: expert\n  synth:\n    max_value: 300\n",
    ] {
        let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
        assert!(loaded.typed().is_err(), "expected rejection for {yaml}");
    }
}

#[test]
fn typo_inside_section_is_an_error() {
    let loaded = load_layered_yaml_from_strings(&["store:\n  backnd: postgres\n"]).unwrap();
    assert!(loaded.typed().is_err());
}

#[test]
fn unused_top_level_keys_warn_or_fail() {
    let yaml = r#"
schedule:
  at: "01:00"
legacy:
  region: "europe-west3"
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    assert!(loaded.typed().is_ok());

    let unused = loaded.unused_keys(UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(unused, vec!["/legacy/region".to_string()]);

    let err = loaded.unused_keys(UnusedKeyPolicy::Fail).unwrap_err().to_string();
    assert!(err.contains("CONFIG_UNUSED_KEYS"), "{err}");
}
