//! Opaque continuation tokens for article listings.
//!
//! A cursor names a position in the listing order `(published_at DESC, id DESC)`.
//! Everything strictly after that position has not been delivered yet. The token
//! is URL-safe base64 over `<rfc3339 with nanoseconds>|<article id>`; clients must
//! treat it as opaque.

use crate::error::{Error, Result};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, SecondsFormat, Utc};
use common::{Article, ArticleId};
use faststr::FastStr;
use std::cmp::Ordering;

const SEPARATOR: char = '|';

/// Sort key of one article. `Ord` is ascending; listings walk it in reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cursor {
    pub published_at: DateTime<Utc>,
    pub article_id:   ArticleId,
}

impl Cursor {
    pub fn new(article_id: ArticleId, published_at: DateTime<Utc>) -> Self {
        Self {
            published_at,
            article_id,
        }
    }

    pub fn of(article: &Article) -> Self {
        Self::new(article.id, article.published_at)
    }

    pub fn encode(&self) -> FastStr {
        let raw = format!(
            "{}{SEPARATOR}{}",
            self.published_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
            self.article_id
        );
        URL_SAFE_NO_PAD.encode(raw).into()
    }

    pub fn decode(token: &str) -> Result<Self> {
        let invalid = || Error::InvalidCursor(token.to_owned().into());

        let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| invalid())?;
        let raw = std::str::from_utf8(&bytes).map_err(|_| invalid())?;
        let (ts, id) = raw.split_once(SEPARATOR).ok_or_else(invalid)?;

        let published_at = DateTime::parse_from_rfc3339(ts)
            .map_err(|_| invalid())?
            .with_timezone(&Utc);
        let article_id = id.parse::<ArticleId>().map_err(|_| invalid())?;

        Ok(Self::new(article_id, published_at))
    }

    /// Parses an optional request parameter; empty means "first page".
    pub fn parse_param(token: Option<&str>) -> Result<Option<Self>> {
        match token.map(str::trim) {
            None | Some("") => Ok(None),
            Some(t) => Self::decode(t).map(Some),
        }
    }

    /// Whether `self` comes strictly after `boundary` in listing order.
    #[inline]
    pub fn is_after(&self, boundary: &Cursor) -> bool {
        self < boundary
    }
}

/// Listing order: newest first, higher id first on equal timestamps.
#[inline]
pub fn listing_order(a: &Article, b: &Article) -> Ordering {
    Cursor::of(b).cmp(&Cursor::of(a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64, nanos: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, nanos).unwrap()
    }

    #[test]
    fn test_decode_recovers_encoded_cursor() {
        let cursor = Cursor::new(42, at(1_700_000_000, 123_456_789));
        let token = cursor.encode();
        assert!(!token.contains('|'), "token must stay opaque: {token}");
        assert_eq!(Cursor::decode(&token).unwrap(), cursor);
    }

    #[test]
    fn test_nanosecond_ties_stay_distinct() {
        let a = Cursor::new(1, at(1_700_000_000, 1));
        let b = Cursor::new(1, at(1_700_000_000, 2));
        assert_ne!(a.encode(), b.encode());
        assert!(Cursor::decode(&a.encode()).unwrap() < Cursor::decode(&b.encode()).unwrap());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let cursor = Cursor::new(9, at(1_600_000_000, 0));
        assert_eq!(cursor.encode(), cursor.encode());
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        let no_separator = URL_SAFE_NO_PAD.encode("2024-01-01T00:00:00Z");
        let bad_id = URL_SAFE_NO_PAD.encode("2024-01-01T00:00:00Z|abc");
        let bad_time = URL_SAFE_NO_PAD.encode("yesterday|12");
        let not_utf8 = URL_SAFE_NO_PAD.encode([0xffu8, 0xfe, 0x7c, 0x31]);
        for token in [
            "%%%",
            "not base64!",
            no_separator.as_str(),
            bad_id.as_str(),
            bad_time.as_str(),
            not_utf8.as_str(),
        ] {
            let err = Cursor::decode(token).unwrap_err();
            assert!(matches!(err, Error::InvalidCursor(_)), "{token}: {err:?}");
            assert!(err.is_client_error());
        }
    }

    #[test]
    fn test_parse_param_empty_is_first_page() {
        assert_eq!(Cursor::parse_param(None).unwrap(), None);
        assert_eq!(Cursor::parse_param(Some("")).unwrap(), None);
        assert_eq!(Cursor::parse_param(Some("  ")).unwrap(), None);
        let cursor = Cursor::new(3, at(10, 0));
        assert_eq!(
            Cursor::parse_param(Some(cursor.encode().as_str())).unwrap(),
            Some(cursor)
        );
    }

    #[test]
    fn test_id_breaks_timestamp_ties() {
        let ts = at(1_700_000_000, 500);
        let older_id = Cursor::new(10, ts);
        let newer_id = Cursor::new(11, ts);
        assert!(older_id.is_after(&newer_id));
        assert!(!newer_id.is_after(&older_id));
        assert!(!newer_id.is_after(&newer_id));
    }
}
