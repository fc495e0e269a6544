//! Modified Julian Date conversion for 4A clock-time groups
//!
//! 4A groups carry local time as a 17-bit MJD plus hour/minute and a signed
//! offset from UTC in half-hour steps.

/// Compute the Modified Julian Date for a calendar date (Gregorian).
///
/// Formula from the RDS specification annex; valid for 1900-03-01 through
/// 2100-02-28, which comfortably covers the 17-bit field.
pub fn mjd_from_ymd(year: i32, month: u32, day: u32) -> u32 {
    let l = if month == 1 || month == 2 { 1 } else { 0 };
    let yp = year - 1900;
    let a = ((yp - l) as f64 * 365.25) as i64;
    let b = ((month as i64 + 1 + l as i64 * 12) as f64 * 30.6001) as i64;
    (14_956 + day as i64 + a + b) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_dates() {
        assert_eq!(mjd_from_ymd(2000, 1, 1), 51_544);
        assert_eq!(mjd_from_ymd(1997, 8, 31), 50_691);
        assert_eq!(mjd_from_ymd(2026, 8, 1), 61_253);
    }

    #[test]
    fn test_consecutive_days_increment() {
        assert_eq!(mjd_from_ymd(2024, 2, 28) + 1, mjd_from_ymd(2024, 2, 29));
        assert_eq!(mjd_from_ymd(2024, 2, 29) + 1, mjd_from_ymd(2024, 3, 1));
        assert_eq!(mjd_from_ymd(2025, 12, 31) + 1, mjd_from_ymd(2026, 1, 1));
    }

    #[test]
    fn test_fits_17_bit_field() {
        assert!(mjd_from_ymd(2099, 12, 31) < (1 << 17));
    }
}
