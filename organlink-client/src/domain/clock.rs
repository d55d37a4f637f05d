use chrono::{DateTime, Utc};

/// Current time rounded up to the next whole millisecond, the resolution at
/// which documents store timestamps. Never earlier than the moment of the call.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    let mut millis = now.timestamp_millis();
    if now.timestamp_subsec_nanos() % 1_000_000 != 0 {
        millis += 1;
    }
    DateTime::from_timestamp_millis(millis).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_to_whole_milliseconds() {
        for _ in 0..100 {
            let before = Utc::now();
            let stamp = now_millis();
            assert!(stamp >= before);
            assert_eq!(stamp.timestamp_subsec_nanos() % 1_000_000, 0);
            assert_eq!(
                DateTime::from_timestamp_millis(stamp.timestamp_millis()),
                Some(stamp)
            );
        }
    }
}
