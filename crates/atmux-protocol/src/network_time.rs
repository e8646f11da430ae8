//! Network time banner parsing.
//!
//! The network reports wall-clock time in banners shaped like
//! `+QNITZ: "17/02/09,10:30:00+04,0"`: a two-digit year since 2000, local
//! time, a zone offset in quarter hours, and a daylight-saving flag.

use crate::pattern::{self, Capture};

/// A decoded network time banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkTime {
    /// Full year.
    pub year: i32,
    /// Month, 1 to 12.
    pub month: u8,
    /// Day of month.
    pub day: u8,
    /// Hour of the local time.
    pub hour: u8,
    /// Minute.
    pub minute: u8,
    /// Second.
    pub second: u8,
    /// Zone offset from UTC in quarter hours, signed.
    pub zone_quarter_hours: i8,
}

impl NetworkTime {
    /// Parses a time banner line, with or without its prefix.
    ///
    /// Accepts the full form with zone and daylight-saving fields as well as
    /// the bare `"yy/mm/dd,hh:mm:ss"` form, which is taken as UTC.
    pub fn parse(line: &str) -> Option<Self> {
        let text = line
            .strip_prefix("+QNITZ:")
            .or_else(|| line.strip_prefix("+QNTP:"))
            .unwrap_or(line)
            .trim();
        let fields = pattern::scan_all(text, "\"%d/%d/%d,%d:%d:%d%d,%d\"")
            .or_else(|| pattern::scan_all(text, "\"%d/%d/%d,%d:%d:%d\""))?;
        let mut ints = fields.iter().filter_map(Capture::as_int);
        let year = 2000 + i32::try_from(ints.next()?).ok()?;
        let month = u8::try_from(ints.next()?).ok().filter(|m| (1..=12).contains(m))?;
        let day = u8::try_from(ints.next()?).ok().filter(|d| (1..=31).contains(d))?;
        let hour = u8::try_from(ints.next()?).ok().filter(|h| *h < 24)?;
        let minute = u8::try_from(ints.next()?).ok().filter(|m| *m < 60)?;
        let second = u8::try_from(ints.next()?).ok().filter(|s| *s < 60)?;
        let zone_quarter_hours = match ints.next() {
            Some(zone) => i8::try_from(zone).ok()?,
            None => 0,
        };
        Some(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            zone_quarter_hours,
        })
    }

    /// Returns the banner's moment as seconds since the Unix epoch.
    pub fn unix_time(&self) -> i64 {
        let days = days_from_civil(
            i64::from(self.year),
            i64::from(self.month),
            i64::from(self.day),
        );
        let local = days * 86_400
            + i64::from(self.hour) * 3_600
            + i64::from(self.minute) * 60
            + i64::from(self.second);
        local - i64::from(self.zone_quarter_hours) * 900
    }
}

/// Days between the Unix epoch and the given civil date, proleptic
/// Gregorian.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = if year >= 0 { year } else { year - 399 } / 400;
    let year_of_era = year - era * 400;
    let month_shifted = if month > 2 { month - 3 } else { month + 9 };
    let day_of_year = (153 * month_shifted + 2) / 5 + day - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_banner() {
        let time = NetworkTime::parse("+QNITZ: \"17/02/09,10:30:00+04,0\"").unwrap();
        assert_eq!(time.year, 2017);
        assert_eq!((time.month, time.day), (2, 9));
        assert_eq!((time.hour, time.minute, time.second), (10, 30, 0));
        assert_eq!(time.zone_quarter_hours, 4);
    }

    #[test]
    fn test_parse_negative_zone() {
        let time = NetworkTime::parse("+QNITZ: \"21/12/31,23:59:59-20,1\"").unwrap();
        assert_eq!(time.zone_quarter_hours, -20);
    }

    #[test]
    fn test_parse_bare_form_is_utc() {
        let time = NetworkTime::parse("\"17/02/09,09:30:00\"").unwrap();
        assert_eq!(time.zone_quarter_hours, 0);
        assert_eq!(time.unix_time(), 1_486_632_600);
    }

    #[test]
    fn test_unix_time_subtracts_zone_offset() {
        // Local 10:30 at UTC+1 (four quarter hours) is 09:30 UTC.
        let time = NetworkTime::parse("+QNITZ: \"17/02/09,10:30:00+04,0\"").unwrap();
        assert_eq!(time.unix_time(), 1_486_632_600);
    }

    #[test]
    fn test_epoch_day_boundaries() {
        let time = NetworkTime::parse("\"00/01/01,00:00:00\"").unwrap();
        assert_eq!(time.unix_time(), 946_684_800);
        // Leap day is a valid civil date.
        let leap = NetworkTime::parse("\"20/02/29,12:00:00\"").unwrap();
        assert_eq!(leap.unix_time(), 1_582_977_600);
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(NetworkTime::parse("+QNITZ: network time lost"), None);
        assert_eq!(NetworkTime::parse("\"17/13/09,10:30:00\""), None);
        assert_eq!(NetworkTime::parse("OK"), None);
    }
}
