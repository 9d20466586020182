use anyhow::{Context, Result};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

const DATE_FMT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_FMT: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

/// Split epoch seconds into the `date` / `time` column pair
/// (`"YYYY-MM-DD"`, `"HH:MM:SS"`, UTC).
///
/// A timestamp outside the representable range is a malformed batch and
/// fails the transform, unlike a malformed permalink which only nulls the
/// derived column.
pub fn split_epoch_seconds(created_utc: i64) -> Result<(String, String)> {
    let dt = OffsetDateTime::from_unix_timestamp(created_utc)
        .with_context(|| format!("timestamp out of range: {created_utc}"))?;
    let date = dt.format(DATE_FMT).context("format date")?;
    let time = dt.format(TIME_FMT).context("format time")?;
    Ok((date, time))
}
