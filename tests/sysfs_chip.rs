// Exercises `Channel` against a temporary directory laid out like a sysfs
// PWM chip. Regular files don't enforce `duty_cycle <= period`, so ordering
// is covered by the unit tests; these check paths, formats and error context.

use std::fs;
use std::io;
use std::path::Path;

use pwmchip::pwm::{Channel, Error, Polarity, PwmChip};
use tempfile::TempDir;

fn fake_chip(channels: &[u32]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();

    fs::write(dir.path().join("export"), "").unwrap();
    fs::write(dir.path().join("unexport"), "").unwrap();

    for channel in channels {
        let channel_dir = dir.path().join(format!("pwm{}", channel));
        fs::create_dir(&channel_dir).unwrap();
        fs::write(channel_dir.join("period"), "0\n").unwrap();
        fs::write(channel_dir.join("duty_cycle"), "0\n").unwrap();
        fs::write(channel_dir.join("enable"), "0\n").unwrap();
        fs::write(channel_dir.join("polarity"), "normal\n").unwrap();
    }

    dir
}

fn contents(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn round_trip() {
    let dir = fake_chip(&[0]);
    let channel = Channel::new(PwmChip::with_root(dir.path()), 0);

    channel.export().unwrap();
    channel.enable(true).unwrap();
    channel.set_period_and_duty_cycle(20_000_000, 1_500_000).unwrap();

    assert_eq!(channel.current_period().unwrap(), 20_000_000);
    assert_eq!(channel.current_duty_cycle().unwrap(), 1_500_000);
    assert!(channel.is_enabled().unwrap());

    channel.set_period_and_duty_cycle(1_000_000, 250_000).unwrap();

    assert_eq!(channel.current_period().unwrap(), 1_000_000);
    assert_eq!(channel.current_duty_cycle().unwrap(), 250_000);

    channel.unexport().unwrap();

    assert_eq!(contents(&dir.path().join("export")), "0");
    assert_eq!(contents(&dir.path().join("unexport")), "0");
}

#[test]
fn export_writes_channel_index() {
    let dir = fake_chip(&[]);
    let channel = Channel::new(PwmChip::with_root(dir.path()), 12);

    assert_eq!(channel.index(), 12);
    assert!(!channel.is_exported());

    channel.export().unwrap();

    assert_eq!(contents(&dir.path().join("export")), "12");
}

#[test]
fn attributes_are_written_as_decimal_text() {
    let dir = fake_chip(&[1]);
    let channel = Channel::new(PwmChip::with_root(dir.path()), 1);
    let channel_dir = dir.path().join("pwm1");

    assert!(channel.is_exported());

    channel.set_period_and_duty_cycle(1000, 500).unwrap();
    channel.enable(true).unwrap();

    assert_eq!(contents(&channel_dir.join("period")), "1000");
    assert_eq!(contents(&channel_dir.join("duty_cycle")), "500");
    assert_eq!(contents(&channel_dir.join("enable")), "1");

    channel.enable(false).unwrap();
    assert_eq!(contents(&channel_dir.join("enable")), "0");
}

#[test]
fn unexported_channel_reports_missing_attribute() {
    let dir = fake_chip(&[]);
    let chip = PwmChip::with_root(dir.path());
    let channel = Channel::new(chip.clone(), 0);

    match channel.current_period() {
        Err(Error::Io { path, source }) => {
            assert_eq!(path, chip.period_path(0));
            assert_eq!(source.kind(), io::ErrorKind::NotFound);
        }
        other => panic!("unexpected result: {:?}", other),
    }

    match channel.enable(true) {
        Err(Error::Io { path, source }) => {
            assert_eq!(path, chip.enable_path(0));
            assert_eq!(source.kind(), io::ErrorKind::NotFound);
        }
        other => panic!("unexpected result: {:?}", other),
    }

    // Writing never creates attribute files
    assert!(!chip.channel_dir(0).exists());
}

#[test]
fn validation_happens_before_io() {
    let dir = fake_chip(&[]);
    let channel = Channel::new(PwmChip::with_root(dir.path()), 0);

    // The channel isn't exported, so any I/O would fail with NotFound.
    match channel.set_period_and_duty_cycle(100, 200) {
        Err(Error::DutyCycleExceedsPeriod { period, duty_cycle }) => {
            assert_eq!((period, duty_cycle), (100, 200));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn invalid_attribute_contents() {
    let dir = fake_chip(&[0]);
    let channel = Channel::new(PwmChip::with_root(dir.path()), 0);
    let channel_dir = dir.path().join("pwm0");

    fs::write(channel_dir.join("duty_cycle"), "\n").unwrap();
    match channel.current_duty_cycle() {
        Err(Error::Parse { value, .. }) => assert_eq!(value, ""),
        other => panic!("unexpected result: {:?}", other),
    }

    fs::write(channel_dir.join("enable"), "2\n").unwrap();
    assert!(matches!(channel.is_enabled(), Err(Error::Parse { .. })));

    fs::write(channel_dir.join("polarity"), "sideways\n").unwrap();
    assert!(matches!(channel.polarity(), Err(Error::Parse { .. })));
}

#[test]
fn non_utf8_attribute_is_a_parse_error() {
    let dir = fake_chip(&[0]);
    let chip = PwmChip::with_root(dir.path());
    let channel = Channel::new(chip.clone(), 0);

    fs::write(chip.duty_cycle_path(0), [0xff, 0xfe, b'\n']).unwrap();

    match channel.current_duty_cycle() {
        Err(Error::Parse { path, .. }) => assert_eq!(path, chip.duty_cycle_path(0)),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn polarity() {
    let dir = fake_chip(&[0]);
    let channel = Channel::new(PwmChip::with_root(dir.path()), 0);

    assert_eq!(channel.polarity().unwrap(), Polarity::Normal);

    channel.set_polarity(Polarity::Inverse).unwrap();
    assert_eq!(contents(&dir.path().join("pwm0/polarity")), "inversed");
    assert_eq!(channel.polarity().unwrap(), Polarity::Inverse);
}

#[cfg(feature = "embedded-hal")]
#[test]
fn set_duty_cycle_scales_to_period() {
    use embedded_hal::pwm::SetDutyCycle;

    let dir = fake_chip(&[0]);
    let mut channel = Channel::new(PwmChip::with_root(dir.path()), 0);

    channel.set_period_and_duty_cycle(20_000, 0).unwrap();

    channel.set_duty_cycle_fully_on().unwrap();
    assert_eq!(channel.current_duty_cycle().unwrap(), 20_000);

    channel.set_duty_cycle_percent(25).unwrap();
    assert_eq!(channel.current_duty_cycle().unwrap(), 5_000);

    channel.set_duty_cycle_fully_off().unwrap();
    assert_eq!(channel.current_duty_cycle().unwrap(), 0);
}

#[cfg(feature = "embedded-hal-0")]
#[test]
fn pwm_pin() {
    use embedded_hal_0::PwmPin;

    let dir = fake_chip(&[0]);
    let mut channel = Channel::new(PwmChip::with_root(dir.path()), 0);

    channel.set_period_and_duty_cycle(1000, 0).unwrap();

    PwmPin::set_duty(&mut channel, 0.5);
    assert_eq!(channel.get_duty(), 0.5);
    assert_eq!(channel.get_max_duty(), 1.0);

    PwmPin::enable(&mut channel);
    assert!(channel.is_enabled().unwrap());
    PwmPin::disable(&mut channel);
    assert!(!channel.is_enabled().unwrap());

    // Failures are logged, not propagated.
    fs::remove_file(dir.path().join("pwm0/duty_cycle")).unwrap();
    PwmPin::set_duty(&mut channel, 0.25);
    assert_eq!(channel.get_duty(), 0.0);
}
