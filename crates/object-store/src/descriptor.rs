//! Listing records for stored objects.

use chrono::{DateTime, Utc};
use object_store::ObjectMeta;
use serde::{Deserialize, Serialize};

/// Separator between key segments.
pub const PATH_SEPARATOR: char = '/';

/// Coarse classification of an object, derived from its key's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Image,
    Video,
    Audio,
    Document,
    Archive,
    Code,
    Pdf,
    Apk,
    Folder,
    Other,
}

impl FileType {
    /// Classify a key by its extension (case-insensitive).
    pub fn from_key(key: &str) -> Self {
        let name = key.rsplit(PATH_SEPARATOR).next().unwrap_or(key);
        let Some((_, extension)) = name.rsplit_once('.') else {
            return FileType::Other;
        };

        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "svg" | "webp" | "bmp" => FileType::Image,
            "mp4" | "mov" | "avi" | "mkv" | "webm" | "wmv" => FileType::Video,
            "mp3" | "wav" | "ogg" | "flac" | "aac" => FileType::Audio,
            "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "txt" | "rtf" => FileType::Document,
            "zip" | "rar" | "tar" | "gz" | "7z" => FileType::Archive,
            "js" | "ts" | "jsx" | "tsx" | "html" | "css" | "scss" | "json" | "md" | "yaml"
            | "yml" => FileType::Code,
            "pdf" => FileType::Pdf,
            "apk" => FileType::Apk,
            _ => FileType::Other,
        }
    }
}

/// Metadata describing one object in a listing.
///
/// `is_folder` is derived, never set directly: it holds iff the object is
/// empty and its key ends with [`PATH_SEPARATOR`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDescriptor {
    /// Full key within the bucket
    pub key: String,
    /// Last segment of the key
    pub name: String,
    /// Full path of the object (same as the key)
    pub path: String,
    pub size: u64,
    /// Absent for folders synthesized from common prefixes
    pub last_modified: Option<DateTime<Utc>>,
    /// Entity tag reported by the store
    pub etag: Option<String>,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub is_folder: bool,
}

impl ObjectDescriptor {
    pub fn new(
        key: impl Into<String>,
        size: u64,
        last_modified: Option<DateTime<Utc>>,
        etag: Option<String>,
    ) -> Self {
        let key = key.into();
        let is_folder = is_folder(&key, size);
        let file_type = if is_folder {
            FileType::Folder
        } else {
            FileType::from_key(&key)
        };

        Self {
            name: display_name(&key).to_string(),
            path: key.clone(),
            key,
            size,
            last_modified,
            etag,
            file_type,
            is_folder,
        }
    }

    /// Folder entry for a common prefix returned by a delimited listing.
    pub fn folder(prefix: &str) -> Self {
        let key = if prefix.ends_with(PATH_SEPARATOR) {
            prefix.to_string()
        } else {
            format!("{}{}", prefix, PATH_SEPARATOR)
        };
        Self::new(key, 0, None, None)
    }

    /// Whether the key ends with `suffix`.
    ///
    /// A suffix longer than the key never matches.
    pub fn has_suffix(&self, suffix: &str) -> bool {
        self.key.len() >= suffix.len() && self.key.ends_with(suffix)
    }
}

impl From<ObjectMeta> for ObjectDescriptor {
    fn from(meta: ObjectMeta) -> Self {
        Self::new(
            meta.location.to_string(),
            meta.size as u64,
            Some(meta.last_modified),
            meta.e_tag,
        )
    }
}

fn is_folder(key: &str, size: u64) -> bool {
    size == 0 && key.ends_with(PATH_SEPARATOR)
}

fn display_name(key: &str) -> &str {
    key.trim_end_matches(PATH_SEPARATOR)
        .rsplit(PATH_SEPARATOR)
        .next()
        .unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_requires_empty_object_and_trailing_separator() {
        assert!(ObjectDescriptor::new("docs/", 0, None, None).is_folder);
        assert!(!ObjectDescriptor::new("docs/", 12, None, None).is_folder);
        assert!(!ObjectDescriptor::new("docs", 0, None, None).is_folder);
        assert!(!ObjectDescriptor::new("docs/a.txt", 0, None, None).is_folder);
        assert!(!ObjectDescriptor::new("", 0, None, None).is_folder);
    }

    #[test]
    fn test_folder_from_prefix() {
        let folder = ObjectDescriptor::folder("reports/2024");
        assert_eq!(folder.key, "reports/2024/");
        assert_eq!(folder.name, "2024");
        assert_eq!(folder.file_type, FileType::Folder);
        assert!(folder.is_folder);

        let already_terminated = ObjectDescriptor::folder("reports/");
        assert_eq!(already_terminated.key, "reports/");
    }

    #[test]
    fn test_suffix_longer_than_key_is_not_a_match() {
        let descriptor = ObjectDescriptor::new("a.apk", 3, None, None);
        assert!(descriptor.has_suffix(".apk"));
        assert!(descriptor.has_suffix(""));
        assert!(!descriptor.has_suffix("release-build.apk"));
        assert!(!descriptor.has_suffix(".txt"));
    }

    #[test]
    fn test_display_name_and_type() {
        let descriptor = ObjectDescriptor::new("media/Holiday.JPG", 10, None, None);
        assert_eq!(descriptor.name, "Holiday.JPG");
        assert_eq!(descriptor.path, "media/Holiday.JPG");
        assert_eq!(descriptor.file_type, FileType::Image);

        assert_eq!(FileType::from_key("bin/app.apk"), FileType::Apk);
        assert_eq!(FileType::from_key("notes"), FileType::Other);
        assert_eq!(FileType::from_key("v1.2/README"), FileType::Other);
    }

    #[test]
    fn test_serialized_shape() {
        let descriptor = ObjectDescriptor::new("a/b.pdf", 4, None, Some("\"abc\"".into()));
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["key"], "a/b.pdf");
        assert_eq!(json["type"], "pdf");
        assert_eq!(json["isFolder"], false);
        assert_eq!(json["lastModified"], serde_json::Value::Null);
    }
}
