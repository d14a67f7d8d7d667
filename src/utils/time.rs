use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime};

/// Parse a timestamp as sent by the chat service.
///
/// The service stamps records with local ISO 8601 datetimes that usually
/// carry no offset; those are taken to be UTC.
pub fn parse_timestamp(s: &str) -> Option<OffsetDateTime> {
    if let Ok(datetime) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(datetime);
    }
    PrimitiveDateTime::parse(s, &Iso8601::DEFAULT)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// Format a timestamp for display as `YYYY-MM-DD HH:MM`.
///
/// Falls back to the raw string when it does not parse.
pub fn display_timestamp(s: &str) -> String {
    let Some(datetime) = parse_timestamp(s) else {
        return s.to_string();
    };
    let format = time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]");
    datetime.format(&format).unwrap_or_else(|_| s.to_string())
}
