use chrono::{DateTime, FixedOffset, TimeZone, Utc};

pub const DEFAULT_DAILY_REFRESH_HOUR: u32 = 9;

/// True when today's refresh hour (in `offset`) has passed and the state
/// predates it. Never-updated state is always due.
pub fn needs_daily_refresh(
    last_updated: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    hour: u32,
    offset: FixedOffset,
) -> bool {
    let Some(last) = last_updated else {
        return true;
    };
    let Some(cutoff) = daily_cutoff(now, hour, offset) else {
        return false;
    };
    now > cutoff && last < cutoff
}

/// Today's `hour:00` in `offset`, as UTC.
pub fn daily_cutoff(now: DateTime<Utc>, hour: u32, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let local_day = now.with_timezone(&offset).date_naive();
    let naive = local_day.and_hms_opt(hour, 0, 0)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, d, h, m, 0).unwrap()
    }

    fn zero() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn due_after_cutoff_when_stale() {
        assert!(needs_daily_refresh(Some(utc(1, 20, 0)), utc(2, 9, 30), 9, zero()));
        assert!(needs_daily_refresh(Some(utc(2, 8, 59)), utc(2, 9, 1), 9, zero()));
    }

    #[test]
    fn not_due_before_cutoff_or_when_fresh() {
        assert!(!needs_daily_refresh(Some(utc(1, 20, 0)), utc(2, 8, 0), 9, zero()));
        assert!(!needs_daily_refresh(Some(utc(2, 9, 5)), utc(2, 15, 0), 9, zero()));
    }

    #[test]
    fn never_updated_is_due() {
        assert!(needs_daily_refresh(None, utc(2, 3, 0), 9, zero()));
    }

    #[test]
    fn cutoff_follows_offset() {
        let tbilisi = FixedOffset::east_opt(4 * 3600).unwrap();
        // 09:00 at UTC+4 is 05:00Z.
        assert_eq!(daily_cutoff(utc(2, 12, 0), 9, tbilisi), Some(utc(2, 5, 0)));
        assert!(needs_daily_refresh(Some(utc(2, 4, 0)), utc(2, 6, 0), 9, tbilisi));
    }

    #[test]
    fn invalid_hour_is_never_due() {
        assert!(!needs_daily_refresh(Some(utc(1, 0, 0)), utc(2, 12, 0), 25, zero()));
    }
}
