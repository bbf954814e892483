use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bookmark row as served by the backend.
///
/// `id` and `created_at` are server-assigned; `owner` is set at creation and
/// never changes. Every record visible to a session must satisfy
/// `owner == current user`; the backend enforces this through row-level
/// security, and the client filters by the same predicate anyway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bookmark {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }
}

/// Insert payload for a new bookmark. The backend assigns id and created_at.
#[derive(Debug, Clone, Serialize)]
pub struct NewBookmark {
    pub title: String,
    pub url: String,
    pub owner: Uuid,
}

impl NewBookmark {
    pub fn new(owner: Uuid, title: &str, url: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            url: url.trim().to_string(),
            owner,
        }
    }

    /// A bookmark needs both a title and a URL to be worth a round trip.
    pub fn is_valid(&self) -> bool {
        !self.title.is_empty() && !self.url.is_empty()
    }
}

/// Sort newest first, the only order the collection is ever shown in.
pub fn sort_newest_first(bookmarks: &mut [Bookmark]) {
    bookmarks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bookmark(title: &str, ts: i64) -> Bookmark {
        Bookmark {
            id: Uuid::new_v4(),
            title: title.to_string(),
            url: "https://example.com".to_string(),
            owner: Uuid::new_v4(),
            created_at: Utc.timestamp_opt(ts, 0).unwrap(),
        }
    }

    #[test]
    fn test_display_title_fallback() {
        let mut b = bookmark("", 0);
        assert_eq!(b.display_title(), "(Untitled)");
        b.title = "Rust Blog".to_string();
        assert_eq!(b.display_title(), "Rust Blog");
    }

    #[test]
    fn test_new_bookmark_trims_input() {
        let owner = Uuid::new_v4();
        let record = NewBookmark::new(owner, "  Example  ", " http://example.com ");
        assert_eq!(record.title, "Example");
        assert_eq!(record.url, "http://example.com");
        assert!(record.is_valid());
    }

    #[test]
    fn test_new_bookmark_rejects_blank_fields() {
        let owner = Uuid::new_v4();
        assert!(!NewBookmark::new(owner, "", "http://x").is_valid());
        assert!(!NewBookmark::new(owner, "T", "").is_valid());
        assert!(!NewBookmark::new(owner, "   ", "http://x").is_valid());
    }

    #[test]
    fn test_sort_newest_first() {
        let mut rows = vec![bookmark("A", 100), bookmark("B", 300), bookmark("C", 200)];
        sort_newest_first(&mut rows);
        let titles: Vec<_> = rows.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_insert_payload_has_no_server_fields() {
        let record = NewBookmark::new(Uuid::new_v4(), "T", "http://x");
        let json = serde_json::to_value(&record).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("title"));
        assert!(obj.contains_key("url"));
        assert!(obj.contains_key("owner"));
        assert!(!obj.contains_key("id"));
        assert!(!obj.contains_key("created_at"));
    }
}
