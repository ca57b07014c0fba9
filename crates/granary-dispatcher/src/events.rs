//! Object-storage finalized-object events

use serde::{Deserialize, Deserializer};

/// Event delivered when an object upload finalizes
///
/// Some event sources serialize `size` as a string; both forms are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageEvent {
    pub bucket: String,
    pub name: String,
    #[serde(default, deserialize_with = "size_from_string_or_number")]
    pub size: i64,
    #[serde(default, rename = "contentType")]
    pub content_type: String,
    #[serde(default)]
    pub generation: String,
    #[serde(default, rename = "eventId")]
    pub event_id: String,
}

fn size_from_string_or_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SizeField {
        Number(i64),
        Text(String),
    }

    match SizeField::deserialize(deserializer)? {
        SizeField::Number(n) => Ok(n),
        SizeField::Text(s) => Ok(s.parse().unwrap_or(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_numeric_size() {
        let event: StorageEvent = serde_json::from_str(
            r#"{"bucket":"b","name":"uploads/a.pdf","size":123,"contentType":"application/pdf","generation":"1","eventId":"e1"}"#,
        )
        .expect("parses");
        assert_eq!(event.size, 123);
        assert_eq!(event.content_type, "application/pdf");
    }

    #[test]
    fn accepts_string_size() {
        let event: StorageEvent = serde_json::from_str(
            r#"{"bucket":"b","name":"uploads/a.pdf","size":"456"}"#,
        )
        .expect("parses");
        assert_eq!(event.size, 456);
        assert!(event.event_id.is_empty());
    }
}
