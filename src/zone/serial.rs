use chrono::{DateTime, Utc};

/// Serial used when a zone has no stored serial
///
/// Seconds since the Unix epoch, truncated to 32 bits. Increases with wall
/// clock time, which is all a fallback needs.
pub fn current_serial() -> u32 {
    serial_at(Utc::now())
}

pub fn serial_at(time: DateTime<Utc>) -> u32 {
    time.timestamp() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_serial_at() {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(serial_at(time), 1_704_067_200);
    }

    #[test]
    fn test_current_serial_moves_forward() {
        let before = serial_at(Utc::now());
        let now = current_serial();
        assert!(now >= before);
    }
}
