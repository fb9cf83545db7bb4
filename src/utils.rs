//! Utility functions for the briefing date, log truncation and file system checks.
//!
//! The briefing is dated in Korean Standard Time. The offset is applied as a
//! fixed +9 hours on top of UTC so the program never depends on a timezone
//! database being present on the scheduler host.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// File created and removed by [`ensure_writable_dir`].
const WRITE_CHECK_FILE: &str = ".daily_briefing_write_check";

/// Fixed KST offset from UTC, in hours.
pub const KST_OFFSET_HOURS: i64 = 9;

/// Shift a UTC instant into KST wall-clock time.
pub fn to_kst(utc: DateTime<Utc>) -> NaiveDateTime {
    (utc + Duration::hours(KST_OFFSET_HOURS)).naive_utc()
}

/// Format a date the way the briefing shows it, e.g. `2025년 05월 06일`.
pub fn korean_date(at: &NaiveDateTime) -> String {
    at.format("%Y년 %m월 %d일").to_string()
}

/// Format a date as `YYYY-MM-DD`, used in file names.
pub fn iso_date(at: &NaiveDateTime) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at the last character boundary at or before `max`
/// bytes, with `"…(+N bytes)"` appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a marker file.
/// A marker that cannot be removed is logged but does not fail the check.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path).await?;
    let marker = path.join(WRITE_CHECK_FILE);
    drop(fs::File::create(&marker).await?);
    if let Err(e) = fs::remove_file(&marker).await {
        warn!(path = %marker.display(), error = %e, "Could not remove write-check file");
    }
    info!("Output directory is writable");
    Ok(())
}
