//! NT time codec: 64-bit counts of 100 ns ticks since 1601-01-01 UTC, split
//! into low and high 32-bit words in every datagram header.

use chrono::{DateTime, NaiveDateTime};
use thiserror::Error;

/// Seconds between 1601-01-01 and 1970-01-01.
pub const NT_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;
pub const TICKS_PER_SECOND: u64 = 10_000_000;
const NANOS_PER_TICK: u32 = 100;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeError {
    #[error("NT tick count {0} is outside the representable range")]
    OutOfRange(u64),
    #[error("{0} cannot be expressed as an NT tick count")]
    Unrepresentable(NaiveDateTime),
}

/// Join the two header words into one tick count.
pub fn nt_ticks(low: u32, high: u32) -> u64 {
    ((high as u64) << 32) | low as u64
}

/// Split a tick count into `(low, high)` header words.
pub fn split_ticks(ticks: u64) -> (u32, u32) {
    (ticks as u32, (ticks >> 32) as u32)
}

/// Convert NT header words to a UTC-naive instant.
pub fn nt_to_datetime(low: u32, high: u32) -> Result<NaiveDateTime, TimeError> {
    let ticks = nt_ticks(low, high);
    let secs = (ticks / TICKS_PER_SECOND) as i64 - NT_EPOCH_OFFSET_SECS;
    let nanos = (ticks % TICKS_PER_SECOND) as u32 * NANOS_PER_TICK;
    DateTime::from_timestamp(secs, nanos)
        .map(|t| t.naive_utc())
        .ok_or(TimeError::OutOfRange(ticks))
}

/// Convert a UTC-naive instant to `(low, high)` NT header words.
///
/// Sub-tick precision is truncated toward the epoch.
pub fn datetime_to_nt(t: &NaiveDateTime) -> Result<(u32, u32), TimeError> {
    let utc = t.and_utc();
    let secs = utc.timestamp() + NT_EPOCH_OFFSET_SECS;
    if secs < 0 {
        return Err(TimeError::Unrepresentable(*t));
    }
    let ticks = (secs as u64)
        .checked_mul(TICKS_PER_SECOND)
        .and_then(|s| s.checked_add((utc.timestamp_subsec_nanos() / NANOS_PER_TICK) as u64))
        .ok_or(TimeError::Unrepresentable(*t))?;
    Ok(split_ticks(ticks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_epoch_is_zero() {
        let t = nt_to_datetime(0, 0).unwrap();
        assert_eq!(
            t,
            NaiveDate::from_ymd_opt(1601, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_unix_epoch() {
        let ticks = NT_EPOCH_OFFSET_SECS as u64 * TICKS_PER_SECOND;
        let (low, high) = split_ticks(ticks);
        let t = nt_to_datetime(low, high).unwrap();
        assert_eq!(t.and_utc().timestamp(), 0);
    }

    #[test]
    fn test_round_trip_is_exact() {
        let t = NaiveDate::from_ymd_opt(2019, 7, 14)
            .unwrap()
            .and_hms_nano_opt(3, 25, 41, 123_456_700)
            .unwrap();
        let (low, high) = datetime_to_nt(&t).unwrap();
        assert_eq!(nt_to_datetime(low, high).unwrap(), t);

        let (low, high) = (0xDEAD_BEEF, 0x01D5_3A7C);
        let t = nt_to_datetime(low, high).unwrap();
        assert_eq!(datetime_to_nt(&t).unwrap(), (low, high));
    }

    #[test]
    fn test_before_epoch_fails() {
        let t = NaiveDate::from_ymd_opt(1500, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(matches!(
            datetime_to_nt(&t),
            Err(TimeError::Unrepresentable(_))
        ));
    }

    #[test]
    fn test_max_ticks_decodes() {
        assert!(nt_to_datetime(u32::MAX, u32::MAX).is_ok());
    }
}
