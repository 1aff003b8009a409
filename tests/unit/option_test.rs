//! Tests for option sets

use cron_pool::core::OptionSet;
use cron_pool::{EngineOption, Location};

#[test]
fn test_order_and_duplicates_ignored() {
    let a = OptionSet::from_slice(&[EngineOption::Seconds, EngineOption::Recover]);
    let b = OptionSet::from_slice(&[
        EngineOption::Recover,
        EngineOption::Seconds,
        EngineOption::Recover,
    ]);
    assert_eq!(a, b);
    assert_eq!(a.len(), 2);
}

#[test]
fn test_empty_set_is_default() {
    assert!(OptionSet::from_slice(&[]).is_default());
    assert_eq!(OptionSet::default().to_string(), "default");
    assert!(!OptionSet::from_slice(&[EngineOption::Seconds]).is_default());
}

#[test]
fn test_location_values_distinguish_sets() {
    let utc = OptionSet::from_slice(&[EngineOption::Location(Location::Utc)]);
    let east = OptionSet::from_slice(&[EngineOption::Location(Location::Fixed { east_secs: 3600 })]);
    assert_ne!(utc, east);
    assert_eq!(east.location(), Location::Fixed { east_secs: 3600 });
    assert_eq!(OptionSet::default().location(), Location::Local);
}

#[test]
fn test_serde_round_trip() {
    let set = OptionSet::from_slice(&[EngineOption::Seconds, EngineOption::Location(Location::Utc)]);
    let json = serde_json::to_string(&set).unwrap();
    let back: OptionSet = serde_json::from_str(&json).unwrap();
    assert_eq!(back, set);
}
