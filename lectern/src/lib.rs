pub mod client;
pub mod crypto;
pub mod endpoints;
pub mod error;
pub mod session;
pub mod storage;
pub mod types;

pub use client::{ApiClient, ApiConfig, Body, RequestOptions, DEFAULT_API_URL};
pub use error::ApiError;
pub use session::{Session, SessionStore, Subscription};
pub use storage::{FileStorage, MemoryStorage, Storage};

use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

const TIMESTAMP_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
);

/// Formats a timestamp as RFC 3339, UTC, with exactly millisecond precision.
///
/// Returns something like "2022-11-22T09:21:15.640Z"
pub fn format_timestamp(t: OffsetDateTime) -> String {
    // every component of the description is present on an OffsetDateTime
    t.to_offset(time::UtcOffset::UTC)
        .format(TIMESTAMP_FORMAT)
        .expect("timestamp format description is complete")
}

/// Current time via [`format_timestamp`]
pub fn timestamp_now() -> String {
    format_timestamp(OffsetDateTime::now_utc())
}

#[test]
fn test_timestamp_now() {
    // eg: 2022-11-22T09:20:44.123Z
    let ts = timestamp_now();
    println!("{ts}");
    assert_eq!(ts.len(), 24);
    assert_eq!(&ts[4..5], "-");
    assert_eq!(&ts[7..8], "-");
    assert_eq!(&ts[10..11], "T");
    assert_eq!(&ts[19..20], ".");
    assert_eq!(&ts[23..24], "Z");
}

#[test]
fn test_format_timestamp() {
    let t = OffsetDateTime::from_unix_timestamp(1_669_108_875).unwrap()
        + time::Duration::milliseconds(640);
    assert_eq!(format_timestamp(t), "2022-11-22T09:21:15.640Z");

    // whole seconds keep all three millisecond digits
    let t = OffsetDateTime::from_unix_timestamp(1_669_108_875).unwrap();
    assert_eq!(format_timestamp(t), "2022-11-22T09:21:15.000Z");

    // sub-millisecond precision is truncated, other offsets are normalized to UTC
    let t = (OffsetDateTime::from_unix_timestamp(1_669_108_875).unwrap()
        + time::Duration::microseconds(640_999))
    .to_offset(time::macros::offset!(+2));
    assert_eq!(format_timestamp(t), "2022-11-22T09:21:15.640Z");
}
