//! Layout of feed records in the key-value store.
//!
//! ```text
//! freed:<id>    hash  feed_url notify_email email_verified frequency
//!                     last_checked last_content last_digest
//! freed:feeds   set   ids of all live feeds
//! ```
//!
//! All values are strings except `last_content`, which holds the raw page bytes.

use std::collections::HashMap;

use freed_types::feed::{Feed, normalize_frequency};

use crate::StoreError;

pub const FEED_INDEX: &str = "freed:feeds";

pub fn feed_key(id: &str) -> String {
    format!("freed:{id}")
}

pub fn encode(feed: &Feed) -> Vec<(String, Vec<u8>)> {
    let mut fields = vec![
        ("feed_url".to_string(), feed.feed_url.clone().into_bytes()),
        ("notify_email".to_string(), feed.notify_email.clone().into_bytes()),
        ("email_verified".to_string(), feed.email_verified.to_string().into_bytes()),
        ("frequency".to_string(), feed.frequency.to_string().into_bytes()),
        ("last_checked".to_string(), feed.last_checked.to_string().into_bytes()),
    ];
    if let Some(content) = &feed.last_content {
        fields.push(("last_content".to_string(), content.clone()));
    }
    if let Some(digest) = &feed.last_digest {
        fields.push(("last_digest".to_string(), digest.clone().into_bytes()));
    }
    fields
}

/// Rebuild a feed from its hash. Older records may lack the snapshot fields
/// or carry them as empty strings; both read as "no snapshot yet".
pub fn decode(id: &str, mut fields: HashMap<String, Vec<u8>>) -> Result<Feed, StoreError> {
    let mut text = |name: &str| -> Option<String> {
        fields
            .remove(name)
            .map(|v| String::from_utf8_lossy(&v).into_owned())
    };

    let corrupt = |reason: &str| StoreError::Corrupt {
        key: feed_key(id),
        reason: reason.to_string(),
    };

    let feed_url = text("feed_url").ok_or_else(|| corrupt("missing feed_url"))?;
    let notify_email = text("notify_email").ok_or_else(|| corrupt("missing notify_email"))?;
    let email_verified = text("email_verified").is_some_and(|v| v == "true");
    let frequency = normalize_frequency(text("frequency").and_then(|v| v.trim().parse().ok()));
    let last_checked = text("last_checked")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);
    let last_digest = text("last_digest").filter(|d| !d.is_empty());
    let last_content = match fields.remove("last_content") {
        Some(bytes) if bytes.is_empty() && last_digest.is_none() => None,
        other => other,
    };

    Ok(Feed {
        id: id.to_string(),
        feed_url,
        notify_email,
        email_verified,
        frequency,
        last_checked,
        last_content,
        last_digest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Feed {
        Feed {
            id: "0a1b2c3d".into(),
            feed_url: "https://example.com/a".into(),
            notify_email: "a@b.com".into(),
            email_verified: true,
            frequency: 10,
            last_checked: 1_700_000_000,
            last_content: Some(b"v1".to_vec()),
            last_digest: Some("e3b0".into()),
        }
    }

    #[test]
    fn field_names_and_string_encoding() {
        let fields: HashMap<_, _> = encode(&sample()).into_iter().collect();
        assert_eq!(fields["email_verified"], b"true");
        assert_eq!(fields["frequency"], b"10");
        assert_eq!(fields["last_checked"], b"1700000000");
        assert_eq!(fields["last_content"], b"v1");
        assert_eq!(fields.len(), 7);
        assert_eq!(feed_key("0a1b2c3d"), "freed:0a1b2c3d");
    }

    #[test]
    fn decodes_what_it_encodes() {
        let feed = sample();
        let fields = encode(&feed).into_iter().collect();
        assert_eq!(decode(&feed.id, fields).unwrap(), feed);
    }

    #[test]
    fn legacy_record_without_snapshot() {
        let fields = HashMap::from([
            ("feed_url".to_string(), b"https://example.com".to_vec()),
            ("notify_email".to_string(), b"a@b.com".to_vec()),
            ("email_verified".to_string(), b"false".to_vec()),
            ("frequency".to_string(), b"".to_vec()),
            ("last_content".to_string(), b"".to_vec()),
            ("last_digest".to_string(), b"".to_vec()),
        ]);
        let feed = decode("abc", fields).unwrap();
        assert_eq!(feed.frequency, 5);
        assert_eq!(feed.last_checked, 0);
        assert!(feed.last_content.is_none());
        assert!(feed.last_digest.is_none());
    }

    #[test]
    fn missing_url_is_corrupt() {
        let fields = HashMap::from([("notify_email".to_string(), b"a@b.com".to_vec())]);
        assert!(matches!(decode("abc", fields), Err(StoreError::Corrupt { .. })));
    }
}
