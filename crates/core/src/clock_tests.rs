use super::*;

#[test]
fn fake_clock_advances_both_instant_and_unix_timestamp() {
    let clock = FakeClock::new();
    let before = clock.now();
    let before_ts = clock.unix_timestamp();

    clock.advance(Duration::from_secs(30));

    assert!(clock.now() > before);
    assert_eq!(clock.unix_timestamp(), before_ts + 30);
}

#[test]
fn set_unix_timestamp_overrides_value() {
    let clock = FakeClock::new();
    clock.set_unix_timestamp(42);
    assert_eq!(clock.unix_timestamp(), 42);
}

#[test]
fn system_clock_returns_plausible_timestamp() {
    let clock = SystemClock;
    // Anything after 2021-01-01 is plausible; guards against an accidental 0 epoch.
    assert!(clock.unix_timestamp() > 1_600_000_000);
}
