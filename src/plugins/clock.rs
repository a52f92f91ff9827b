use chrono::NaiveDateTime;

/// `03 07 with 09 seconds.`
pub fn spoken_time(now: NaiveDateTime) -> String {
    now.format("%I %M with %S seconds.").to_string()
}

/// `Monday, December 17.`
pub fn spoken_date(now: NaiveDateTime) -> String {
    now.format("%A, %B %-d.").to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn speaks_twelve_hour_time() {
        assert_eq!(spoken_time(at(2018, 12, 17, 15, 7, 9)), "03 07 with 09 seconds.");
        assert_eq!(spoken_time(at(2018, 12, 17, 0, 30, 0)), "12 30 with 00 seconds.");
    }

    #[test]
    fn speaks_date_without_padding() {
        assert_eq!(spoken_date(at(2018, 12, 17, 9, 0, 0)), "Monday, December 17.");
        assert_eq!(spoken_date(at(2019, 3, 1, 9, 0, 0)), "Friday, March 1.");
    }
}
