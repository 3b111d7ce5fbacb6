#![allow(dead_code)]

use std::sync::Arc;

use dslab_spindown::device::DeviceProfile;

pub fn assert_float_eq(x: f64, y: f64, eps: f64) {
    assert!(x > y - eps && x < y + eps, "{} != {}", x, y);
}

/// Device from the reference scenario: HDD with 510 ms shutdown and 6970 ms wake-up.
pub fn reference_device() -> Arc<DeviceProfile> {
    Arc::new(DeviceProfile::new("reference", 6.4, 0.00075, 0.0035, 0.0035, 510, 6970, 0.00212, 0.00753).unwrap())
}

/// Device with short transitions which makes every state reachable in a few ms.
///
/// Break-even threshold is 3 + 6.5 / 0.9 ms.
pub fn tiny_device() -> Arc<DeviceProfile> {
    Arc::new(DeviceProfile::new("tiny", 1., 0.1, 1., 2., 3, 5, 1.5, 3.).unwrap())
}
