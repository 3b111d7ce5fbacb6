mod common;
use common::assert_float_eq;

use dslab_spindown::device::{DeviceProfile, RawDevice};
use dslab_spindown::error::SimError;

#[test]
fn test_break_even_without_transition_overhead() {
    // transitions cost the same as staying idle, so only the shutdown time matters
    let device = DeviceProfile::new("flat", 1., 0.001, 0.003, 0.004, 510, 6970, 0.003, 0.004).unwrap();
    assert_eq!(device.break_even_threshold(), 510.);
}

#[test]
fn test_break_even_with_transition_overhead() {
    let device = DeviceProfile::new("tiny", 1., 0.1, 1., 2., 3, 5, 1.5, 3.).unwrap();
    assert_float_eq(device.break_even_threshold(), 3. + 6.5 / 0.9, 1e-9);
}

#[test]
fn test_break_even_is_at_least_shutdown_time() {
    // shutdown and wake-up are cheaper than idling
    let device = DeviceProfile::new("cheap", 1., 0.1, 1., 2., 100, 50, 0.2, 0.5).unwrap();
    assert_eq!(device.break_even_threshold(), 100.);
    for device in [DeviceProfile::hdd_a(), DeviceProfile::hdd_b(), DeviceProfile::hdd_c()] {
        assert!(device.break_even_threshold() >= device.shutdown_duration() as f64);
    }
}

#[test]
fn test_presets() {
    let a = DeviceProfile::preset("HDD_A").unwrap();
    assert_eq!(a.name(), "HDD_A");
    assert_eq!(a.shutdown_duration(), 510);
    assert_eq!(a.wakeup_duration(), 6970);
    assert_float_eq(a.standby_power(), 0.00348, 1e-12);
    assert_float_eq(a.wakeup_power(), 0.00753, 1e-12);
    let expected = (0.51 * (2.12 - 3.48) + 6.97 * (7.53 - 3.48)) / (3.48 - 0.75) * 1000. + 510.;
    assert_float_eq(a.break_even_threshold(), expected, 1e-6);
    assert_eq!(DeviceProfile::preset("hdd_b").unwrap().wakeup_duration(), 15000);
    assert_eq!(DeviceProfile::preset("hdd_c").unwrap().capacity(), 2000.);
    assert!(DeviceProfile::preset("ssd").is_none());
}

#[test]
fn test_from_raw() {
    let raw = RawDevice {
        name: "disk".to_string(),
        capacity: 100.,
        sleeping_power: 1.,
        standby_power: 5.,
        active_power: 6.,
        shutdown_time: 2.,
        wakeup_time: 4.5,
        shutdown_power: 5.,
        wakeup_power: 6.,
    };
    let device = DeviceProfile::from_raw(&raw).unwrap();
    assert_eq!(device.shutdown_duration(), 2000);
    assert_eq!(device.wakeup_duration(), 4500);
    assert_float_eq(device.sleeping_power(), 0.001, 1e-12);
    assert_float_eq(device.active_power(), 0.006, 1e-12);
    assert_eq!(device.break_even_threshold(), 2000.);
}

#[test]
fn test_invalid_devices() {
    let err = DeviceProfile::new("neg", 1., -0.1, 1., 1., 1, 1, 1., 1.).unwrap_err();
    assert!(matches!(err, SimError::Config(_)));
    // sleeping has to save power
    assert!(DeviceProfile::new("flat", 1., 1., 1., 1., 1, 1, 1., 1.).is_err());
    assert!(DeviceProfile::new("nan", 1., 0.1, f64::NAN, 1., 1, 1, 1., 1.).is_err());
}
