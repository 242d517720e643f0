use chrono::{DateTime, SubsecRound, Utc};

/// Current time truncated to whole seconds, the precision the store keeps.
/// Interval arithmetic done in SQL stays exact against values written here.
pub fn now_second() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_now_second_has_no_subseconds() {
        assert_eq!(now_second().nanosecond(), 0);
    }
}
