use std::time::SystemTime;

pub trait SystemTimeExt {
    /// Milliseconds since the unix epoch, or `None` for pre-epoch times.
    fn to_epoch_millis(&self) -> Option<u128>;
}

impl SystemTimeExt for SystemTime {
    fn to_epoch_millis(&self) -> Option<u128> {
        self.duration_since(SystemTime::UNIX_EPOCH)
            .ok()
            .map(|d| d.as_millis())
    }
}
