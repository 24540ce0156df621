use crate::domain::{NOT_FOUND, TELEGRAM_BASE_URL};
use chrono::{DateTime, Local, NaiveDate, Utc};

/// Formats a stored timestamp in the local timezone for display
pub fn format_timestamp_to_local(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Derives the Telegram channel link from a TGStat page address.
///
/// The handle is the segment after the first `@`, up to any following `@`.
/// Addresses without a handle all map to the same placeholder key.
pub fn channel_key_from_url(page_url: &str) -> String {
    match page_url.split('@').nth(1) {
        Some(handle) if !handle.is_empty() => format!("{}{}", TELEGRAM_BASE_URL, handle),
        _ => NOT_FOUND.to_string(),
    }
}

/// File name of a CSV export made on `date`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("tgstat_channels_export_{}.csv", date.format("%Y-%m-%d"))
}

/// Trims page text, treating blank text as missing
pub fn clean_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_channel_key_from_channel_page() {
        assert_eq!(
            channel_key_from_url("https://tgstat.ru/channel/@rustlang"),
            "https://t.me/rustlang"
        );
    }

    #[test]
    fn test_channel_key_keeps_trailing_path() {
        assert_eq!(
            channel_key_from_url("https://tgstat.ru/channel/@rustlang/stat"),
            "https://t.me/rustlang/stat"
        );
    }

    #[test]
    fn test_channel_key_stops_at_second_at_sign() {
        assert_eq!(
            channel_key_from_url("https://tgstat.ru/channel/@one@two"),
            "https://t.me/one"
        );
    }

    #[test]
    fn test_channel_key_missing_handle_is_placeholder() {
        assert_eq!(channel_key_from_url("https://tgstat.ru/channel/"), NOT_FOUND);
        assert_eq!(channel_key_from_url("https://tgstat.ru/channel/@"), NOT_FOUND);
        assert_eq!(channel_key_from_url(""), NOT_FOUND);
    }

    #[test]
    fn test_export_file_name_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        assert_eq!(export_file_name(date), "tgstat_channels_export_2025-01-07.csv");
    }

    #[test]
    fn test_format_timestamp_to_local_shape() {
        let ts = Utc.with_ymd_and_hms(2025, 12, 16, 10, 30, 0).unwrap();
        let result = format_timestamp_to_local(&ts);
        // Local offset varies, so only check the layout.
        assert_eq!(result.len(), "2025-12-16 10:30:00".len());
        assert!(result.starts_with("2025-12-1"));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  12.3k  \n"), Some("12.3k".to_string()));
        assert_eq!(clean_text("   "), None);
        assert_eq!(clean_text(""), None);
    }
}
