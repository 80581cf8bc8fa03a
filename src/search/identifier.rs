//! Encoding of document keys into single backend identifiers
//!
//! Wire format: `{namespace}/{entity}/{id}/{version}` where `version` is
//! RFC 3339 with a numeric offset. Offsets that are not a whole number of
//! minutes (local mean time, e.g. `+00:19:32`) are written ISO 8601 style
//! with a seconds part. The version is rebuilt from every segment after the
//! third, since older writers appended a bracketed region zone
//! (`+01:00[Europe/Oslo]`) that itself contains `/`.

use crate::error::{IndexError, Result};
use crate::models::DocumentKey;
use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, TimeZone};

const SEPARATOR: char = '/';

/// Encode a key as `namespace/entity/id/version`
pub fn encode(key: &DocumentKey) -> String {
    format!(
        "{}/{}/{}/{}",
        key.namespace,
        key.entity,
        key.id,
        format_version(&key.version)
    )
}

/// Decode an identifier produced by [`encode`]
pub fn decode(identifier: &str) -> Result<DocumentKey> {
    let segments: Vec<&str> = identifier.split(SEPARATOR).collect();
    if segments.len() < 4 {
        return Err(malformed(
            identifier,
            format!("expected at least 4 '/'-separated segments, found {}", segments.len()),
        ));
    }

    let tail = segments[3..].join("/");
    let version = parse_version(&tail).map_err(|reason| malformed(identifier, reason))?;

    Ok(DocumentKey::new(segments[0], segments[1], segments[2], version))
}

/// Render a version the way identifiers carry it
pub fn format_version(version: &DateTime<FixedOffset>) -> String {
    if version.offset().local_minus_utc() % 60 == 0 {
        version.to_rfc3339_opts(SecondsFormat::AutoSi, false)
    } else {
        version.format("%Y-%m-%dT%H:%M:%S%.f%::z").to_string()
    }
}

fn parse_version(text: &str) -> std::result::Result<DateTime<FixedOffset>, String> {
    let text = strip_zone_id(text);
    if let Ok(version) = DateTime::parse_from_rfc3339(text) {
        return Ok(version);
    }

    // ISO 8601 forms outside RFC 3339: minute precision, seconds in the offset
    let invalid = || format!("invalid version timestamp '{}'", text);
    let (local, offset) = split_offset(text).ok_or_else(invalid)?;
    let offset = parse_offset(offset).ok_or_else(invalid)?;
    let local = NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M"))
        .map_err(|e| format!("{}: {}", invalid(), e))?;

    offset
        .from_local_datetime(&local)
        .single()
        .ok_or_else(invalid)
}

/// Split `2019-02-01T08:30+00:19:32` into local time and offset
fn split_offset(text: &str) -> Option<(&str, &str)> {
    let time_start = text.find('T')?;
    let sign = text[time_start..].rfind(['+', '-'])? + time_start;
    Some((&text[..sign], &text[sign..]))
}

/// Parse `+HH:MM` or `+HH:MM:SS`
fn parse_offset(text: &str) -> Option<FixedOffset> {
    let (sign, rest) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };

    let parts: Vec<&str> = rest.split(':').collect();
    if !(2..=3).contains(&parts.len())
        || parts
            .iter()
            .any(|p| p.len() != 2 || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let field = |i: usize| parts.get(i).and_then(|p| p.parse::<i32>().ok()).unwrap_or(0);
    let (hours, minutes, seconds) = (field(0), field(1), field(2));
    if minutes > 59 || seconds > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60 + seconds))
}

fn strip_zone_id(text: &str) -> &str {
    match (text.ends_with(']'), text.find('[')) {
        (true, Some(start)) => &text[..start],
        _ => text,
    }
}

fn malformed(identifier: &str, reason: String) -> IndexError {
    IndexError::MalformedIdentifier {
        identifier: identifier.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn key_at(version: DateTime<FixedOffset>) -> DocumentKey {
        DocumentKey::new("data", "UnitDataSet", "b9c10b86-5867-4270-b56e-ee7439fe381e", version)
    }

    #[test]
    fn test_encode_format() {
        let version = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2018, 11, 14, 10, 4, 5)
            .unwrap();

        assert_eq!(
            encode(&key_at(version)),
            "data/UnitDataSet/b9c10b86-5867-4270-b56e-ee7439fe381e/2018-11-14T10:04:05+01:00"
        );
    }

    #[test]
    fn test_utc_is_written_as_numeric_offset() {
        let version = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
            .unwrap();
        assert!(encode(&key_at(version)).ends_with("2020-01-01T00:00:00+00:00"));
    }

    #[test]
    fn test_round_trip_preserves_offset_and_nanos() {
        let version = DateTime::parse_from_rfc3339("2021-06-30T23:59:59.123456789-07:30").unwrap();
        let key = key_at(version);

        let decoded = decode(&encode(&key)).unwrap();
        assert_eq!(decoded, key);
        assert_eq!(decoded.version.offset().local_minus_utc(), -(7 * 3600 + 30 * 60));
        assert_eq!(decoded.version.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn test_decode_zone_id_suffix() {
        let decoded = decode("ns/UnitDataSet/1/2018-11-14T10:04:05.123+01:00[Europe/Oslo]").unwrap();

        assert_eq!(decoded.namespace, "ns");
        assert_eq!(decoded.entity, "UnitDataSet");
        assert_eq!(decoded.id, "1");
        assert_eq!(decoded.version.offset().local_minus_utc(), 3600);
        assert_eq!(decoded.version.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn test_decode_minute_precision() {
        let decoded = decode("ns/Person/7/2019-02-01T08:30+01:00[Europe/Oslo]").unwrap();
        assert_eq!(
            decoded.version,
            DateTime::parse_from_rfc3339("2019-02-01T08:30:00+01:00").unwrap()
        );
    }

    #[test]
    fn test_round_trip_local_mean_time_offset() {
        // Amsterdam local mean time, +00:19:32
        let version = FixedOffset::east_opt(1172)
            .unwrap()
            .with_ymd_and_hms(1890, 1, 1, 12, 0, 0)
            .unwrap();
        let key = key_at(version);

        let encoded = encode(&key);
        assert!(encoded.ends_with("/1890-01-01T12:00:00+00:19:32"), "{}", encoded);

        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, key);
        assert_eq!(decoded.version.offset().local_minus_utc(), 1172);
    }

    #[test]
    fn test_round_trip_negative_seconds_offset() {
        let version = FixedOffset::west_opt(3600 + 30)
            .unwrap()
            .with_ymd_and_hms(1900, 6, 1, 0, 0, 0)
            .unwrap()
            + chrono::Duration::nanoseconds(250_000_000);
        let key = key_at(version);

        let encoded = encode(&key);
        assert!(encoded.ends_with("/1900-06-01T00:00:00.250-01:00:30"), "{}", encoded);
        assert_eq!(decode(&encoded).unwrap(), key);
    }

    #[test]
    fn test_decode_seconds_offset_with_zone_id() {
        let decoded =
            decode("ns/E/1/1890-01-01T12:00+00:19:32[Europe/Amsterdam]").unwrap();
        assert_eq!(decoded.version.offset().local_minus_utc(), 1172);
        assert_eq!(
            decoded.version,
            FixedOffset::east_opt(1172)
                .unwrap()
                .with_ymd_and_hms(1890, 1, 1, 12, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_decode_too_few_segments() {
        for identifier in ["", "ns", "ns/Person", "ns/Person/1"] {
            match decode(identifier) {
                Err(IndexError::MalformedIdentifier { identifier: id, .. }) => {
                    assert_eq!(id, identifier)
                }
                other => panic!("expected MalformedIdentifier for {:?}, got {:?}", identifier, other),
            }
        }
    }

    #[test]
    fn test_decode_bad_timestamp() {
        for identifier in [
            "ns/Person/1/yesterday",
            "ns/Person/1/",
            "ns/Person/1/2020-01-01T00:00:00",
            "ns/Person/1/2020-13-01T00:00:00+00:00",
            "ns/Person/1/2020-01-01T00:00:00+00:19:60",
            "ns/Person/1/2020-01-01T00:00:00+1:00",
            "ns/Person/1/2020-01-01T00:00:00+00:19:32:01",
        ] {
            assert!(
                matches!(decode(identifier), Err(IndexError::MalformedIdentifier { .. })),
                "{} should be rejected",
                identifier
            );
        }
    }
}
