use chrono::{Datelike, Local, NaiveDate};

/// Lagringsformat för datum i databasen
pub const DB_DATE_FORMAT: &str = "%Y-%m-%d";

/// Formatera ett datum för lagring
pub fn format_date(date: NaiveDate) -> String {
    date.format(DB_DATE_FORMAT).to_string()
}

/// Formatera ett datum för visning (2024年04月01日)
pub fn format_date_display(date: NaiveDate) -> String {
    date.format("%Y年%m月%d日").to_string()
}

/// Dagens datum i lokal tid
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Räkenskapsår (april-mars) som ett datum tillhör
pub fn fiscal_year_of(date: NaiveDate) -> i32 {
    if date.month() >= 4 {
        date.year()
    } else {
        date.year() - 1
    }
}

/// Första dagen i räkenskapsåret
pub fn fiscal_year_start(fiscal_year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(fiscal_year, 4, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(format_date(d(2024, 4, 1)), "2024-04-01");
        assert_eq!(format_date_display(d(2024, 4, 1)), "2024年04月01日");
    }

    #[test]
    fn test_fiscal_year() {
        assert_eq!(fiscal_year_of(d(2024, 4, 1)), 2024);
        assert_eq!(fiscal_year_of(d(2025, 3, 31)), 2024);
        assert_eq!(fiscal_year_of(d(2025, 1, 10)), 2024);
        assert_eq!(fiscal_year_start(2024), Some(d(2024, 4, 1)));
    }
}
