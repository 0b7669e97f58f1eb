//! Snapshot model.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// One stored capture of a document instance's transformed text.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub id: i32,
    pub document_instance_id: i32,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub datetime: DateTime<Utc>,
    /// `None` when the fetched document was empty.
    pub text: Option<String>,
}

impl Snapshot {
    /// Whether `text` is exactly the content this snapshot already holds.
    pub fn matches(&self, text: Option<&str>) -> bool {
        self.text.as_deref() == text
    }

    pub fn text_len(&self) -> usize {
        self.text.as_ref().map_or(0, String::len)
    }
}
