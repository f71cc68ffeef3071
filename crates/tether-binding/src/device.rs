/// Decides which binding policy applies to this host.
///
/// Low-memory devices keep at most one worker protected and drop strong bindings
/// synchronously; every other device degrades released workers to moderate bindings.
pub trait DeviceClassifier {
    fn is_low_memory_device(&self) -> bool;
}

/// A classification decided up front (configuration override, tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDeviceClass(pub bool);

impl FixedDeviceClass {
    pub const LOW_MEMORY: Self = Self(true);
    pub const NORMAL: Self = Self(false);
}

impl DeviceClassifier for FixedDeviceClass {
    fn is_low_memory_device(&self) -> bool {
        self.0
    }
}
