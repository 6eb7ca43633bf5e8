// Unsplash Photo Adapter
//
// Parses the payload returned by Unsplash's random-photo endpoint and
// normalizes it into a history record.

use serde::Deserialize;

use crate::log::{HistoryRecord, DEFAULT_TITLE};

/// Subset of an Unsplash photo we keep in the history.
///
/// Everything else in the payload (exif, tags, sizes, counters) is ignored.
#[derive(Debug, Deserialize)]
pub struct UnsplashPhoto {
    pub id: String,

    #[serde(default)]
    pub alt_description: Option<String>,

    pub urls: PhotoUrls,
    pub user: PhotoUser,
    pub links: PhotoLinks,
}

#[derive(Debug, Deserialize)]
pub struct PhotoUrls {
    pub regular: String,
}

#[derive(Debug, Deserialize)]
pub struct PhotoUser {
    pub name: String,
    pub links: UserLinks,
}

#[derive(Debug, Deserialize)]
pub struct UserLinks {
    pub html: String,
}

#[derive(Debug, Deserialize)]
pub struct PhotoLinks {
    pub html: String,
}

impl UnsplashPhoto {
    /// Convert the raw payload into a history record. A blank description
    /// falls back to the placeholder title.
    pub fn into_record(self) -> HistoryRecord {
        let title = self
            .alt_description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_owned());

        HistoryRecord::from_fields([
            ("id", Some(self.id)),
            ("title", Some(title)),
            ("imageUrl", Some(self.urls.regular)),
            ("photographer", Some(self.user.name)),
            ("photographerUrl", Some(self.user.links.html)),
            ("downloadUrl", Some(self.links.html)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHOTO: &str = r#"
    {
      "id": "Dwu85P9SOIk",
      "created_at": "2016-05-03T11:00:28-04:00",
      "width": 2448,
      "alt_description": "white mountain under blue sky",
      "urls": {
        "raw": "https://images.unsplash.com/photo-1?ixid=raw",
        "regular": "https://images.unsplash.com/photo-1?w=1080"
      },
      "links": {
        "self": "https://api.unsplash.com/photos/Dwu85P9SOIk",
        "html": "https://unsplash.com/photos/Dwu85P9SOIk"
      },
      "user": {
        "username": "jane",
        "name": "Jane Doe",
        "links": { "html": "https://unsplash.com/@jane" }
      }
    }
    "#;

    #[test]
    fn parse_unsplash_photo_json() {
        let photo: UnsplashPhoto = serde_json::from_str(PHOTO).unwrap();
        let record = photo.into_record();

        assert_eq!(record.id(), Some("Dwu85P9SOIk"));
        assert_eq!(record.title(), Some("white mountain under blue sky"));
        assert_eq!(
            record.image_url(),
            Some("https://images.unsplash.com/photo-1?w=1080")
        );
        assert_eq!(record.photographer(), Some("Jane Doe"));
        assert_eq!(record.photographer_url(), Some("https://unsplash.com/@jane"));
        assert_eq!(
            record.download_url(),
            Some("https://unsplash.com/photos/Dwu85P9SOIk")
        );
        assert_eq!(record.as_value().as_object().unwrap().len(), 6);
    }

    #[test]
    fn missing_or_blank_description_uses_placeholder() {
        let mut value: serde_json::Value = serde_json::from_str(PHOTO).unwrap();

        value["alt_description"] = serde_json::Value::Null;
        let photo: UnsplashPhoto = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(photo.into_record().title(), Some(DEFAULT_TITLE));

        value["alt_description"] = "".into();
        let photo: UnsplashPhoto = serde_json::from_value(value).unwrap();
        assert_eq!(photo.into_record().title(), Some(DEFAULT_TITLE));
    }

    #[test]
    fn payload_without_user_is_rejected() {
        let err = serde_json::from_str::<UnsplashPhoto>(
            r#"{ "id": "x", "urls": { "regular": "u" }, "links": { "html": "h" } }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("user"));
    }
}
