use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

mod store;

pub use store::{FileHistoryStore, HistoryStore, InMemoryHistoryStore, StoreError};

/// Title stored for images that arrive without one.
pub const DEFAULT_TITLE: &str = "Без названия";

/// One previously fetched image and its attribution metadata.
///
/// Stored verbatim: the service reads the well-known camelCase keys
/// (`id`, `title`, `imageUrl`, `photographer`, `photographerUrl`,
/// `downloadUrl`) but never validates or reshapes what a producer wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryRecord(Value);

impl HistoryRecord {
    /// Record built from string attribution fields. Absent fields are left
    /// out of the stored object.
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = (&'a str, Option<String>)>) -> Self {
        let map: Map<String, Value> = fields
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.to_owned(), Value::String(v))))
            .collect();
        Self(Value::Object(map))
    }

    /// Fill in the placeholder title when `title` is missing or null.
    /// Records that are not JSON objects pass through untouched.
    pub fn with_default_title(mut self) -> Self {
        if let Value::Object(map) = &mut self.0 {
            if map.get("title").map_or(true, Value::is_null) {
                map.insert("title".to_owned(), Value::String(DEFAULT_TITLE.to_owned()));
            }
        }
        self
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.text("id")
    }

    pub fn title(&self) -> Option<&str> {
        self.text("title")
    }

    pub fn image_url(&self) -> Option<&str> {
        self.text("imageUrl")
    }

    pub fn photographer(&self) -> Option<&str> {
        self.text("photographer")
    }

    pub fn photographer_url(&self) -> Option<&str> {
        self.text("photographerUrl")
    }

    pub fn download_url(&self) -> Option<&str> {
        self.text("downloadUrl")
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for HistoryRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Ordered image history, oldest first.
///
/// Duplicate ids are allowed; insertion order is the only ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLog {
    records: Vec<HistoryRecord>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn append(&mut self, record: HistoryRecord) {
        self.records.push(record);
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record fetched just before the first one showing `image_url`.
    pub fn previous(&self, image_url: &str) -> Option<&HistoryRecord> {
        let index = self
            .records
            .iter()
            .position(|r| r.image_url() == Some(image_url))?;
        index.checked_sub(1).and_then(|i| self.records.get(i))
    }
}

impl From<Vec<HistoryRecord>> for HistoryLog {
    fn from(records: Vec<HistoryRecord>) -> Self {
        Self { records }
    }
}
