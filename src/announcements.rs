//! Announcement input rules: categories, validation, media handling and paging.

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header,
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::db::{Announcement, AnnouncementFilter, AnnouncementOrder, AnnouncementRecord};
use crate::error::{ApiError, ApiJson, ValidationError, ValidationErrors};
use crate::media::{MediaKind, Upload};

pub const DEFAULT_PER_PAGE: i64 = 15;
pub const MAX_PER_PAGE: i64 = 100;
pub const MAX_TITLE_LEN: usize = 255;

pub const CATEGORIES: [(&str, &str); 8] = [
    ("pengumuman", "Pengumuman Umum"),
    ("jadwal_sholat", "Info Waktu Sholat"),
    ("kajian", "Kajian & Pengajian"),
    ("ramadhan", "Ramadhan & Idul Fitri"),
    ("zakat", "Zakat & Infaq"),
    ("kegiatan", "Kegiatan Masjid"),
    ("donasi", "Donasi & Wakaf"),
    ("penting", "Pengumuman Penting"),
];

const SORTABLE: [&str; 7] = [
    "id",
    "title",
    "created_at",
    "updated_at",
    "publish_at",
    "is_active",
    "category",
];

/// Form fields read as booleans when they arrive as multipart text.
const FLAG_FIELDS: [&str; 2] = ["is_active", "remove_media"];

pub fn categories_json() -> serde_json::Value {
    CATEGORIES
        .iter()
        .map(|(key, label)| (key.to_string(), serde_json::Value::from(*label)))
        .collect::<serde_json::Map<_, _>>()
        .into()
}

fn is_category(value: &str) -> bool {
    CATEGORIES.iter().any(|(key, _)| *key == value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    None,
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::None => "none",
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

impl From<MediaKind> for MediaType {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => MediaType::Image,
            MediaKind::Video => MediaType::Video,
        }
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Truthy form values; anything else, including unknown words, is false.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

/// Leading sign and digits of `value`, saturating at the `i64` bounds.
/// Text without a leading number reads as 0.
fn leading_int(value: &str) -> i64 {
    let value = value.trim();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, b| {
            let digit = i64::from(b - b'0');
            if negative {
                acc.saturating_mul(10).saturating_sub(digit)
            } else {
                acc.saturating_mul(10).saturating_add(digit)
            }
        })
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|value| leading_int(&value)))
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM`, `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DD`.
/// Values without an offset are read in the mosque's local time.
pub fn parse_publish_at(value: &str, offset: FixedOffset) -> Result<String, ValidationError> {
    let value = value.trim();
    let invalid = || ValidationError::new("publish_at", "The publish at field must be a valid date.");

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc).to_rfc3339());
    }

    let naive = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(chrono::NaiveTime::MIN))
        })
        .ok_or_else(invalid)?;

    let local = offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(invalid)?;
    Ok(local.with_timezone(&Utc).to_rfc3339())
}

fn validate_title(title: String) -> Result<String, ValidationError> {
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::new(
            "title",
            format!("The title field must not be greater than {} characters.", MAX_TITLE_LEN),
        ));
    }
    Ok(title)
}

fn validate_category(category: String) -> Result<String, ValidationError> {
    if !is_category(&category) {
        return Err(ValidationError::new("category", "The selected category is invalid."));
    }
    Ok(category)
}

fn required(field: &str, value: Option<String>) -> Result<String, ValidationError> {
    non_blank(value).ok_or_else(|| {
        ValidationError::new(field, format!("The {} field is required.", field))
    })
}

/// Files that came with a create or update request.
#[derive(Debug, Clone, Default)]
pub struct Uploads {
    pub image: Option<Upload>,
    pub video: Option<Upload>,
}

impl Uploads {
    fn validate(&self, errors: &mut ValidationErrors) {
        if let Some(image) = &self.image {
            errors.check(image.validate(MediaKind::Image));
        }
        if let Some(video) = &self.video {
            errors.check(video.validate(MediaKind::Video));
        }
    }

    /// The file to keep when both arrive: video wins.
    pub fn preferred(&self) -> Option<(MediaKind, &Upload)> {
        self.video
            .as_ref()
            .map(|video| (MediaKind::Video, video))
            .or_else(|| self.image.as_ref().map(|image| (MediaKind::Image, image)))
    }
}

/// Point `record` at a newly stored file. Returns the paths it replaced.
pub fn attach_media(record: &mut AnnouncementRecord, kind: MediaKind, path: String) -> Vec<String> {
    let replaced = detach_media(record);
    match kind {
        MediaKind::Image => record.image_path = Some(path),
        MediaKind::Video => record.video_path = Some(path),
    }
    record.media_type = MediaType::from(kind).as_str().to_string();
    replaced
}

/// Clear both media paths. Returns the paths that were set.
fn detach_media(record: &mut AnnouncementRecord) -> Vec<String> {
    record.media_type = MediaType::None.as_str().to_string();
    record
        .image_path
        .take()
        .into_iter()
        .chain(record.video_path.take())
        .collect()
}

/// Announcement fields plus uploads, read from either a JSON body or
/// `multipart/form-data`.
pub struct AnnouncementForm<T> {
    pub fields: T,
    pub uploads: Uploads,
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

fn form_value(name: &str, text: String) -> Value {
    if FLAG_FIELDS.contains(&name) {
        Value::Bool(parse_flag(&text))
    } else {
        Value::String(text)
    }
}

#[async_trait]
impl<S, T> FromRequest<S> for AnnouncementForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let ApiJson(fields) = ApiJson::<T>::from_request(req, state).await?;
            return Ok(Self {
                fields,
                uploads: Uploads::default(),
            });
        }

        let mut multipart = Multipart::from_request(req, state).await?;
        let mut values = Map::new();
        let mut uploads = Uploads::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    // Browsers send an empty part when no file was chosen.
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    let upload = Upload { file_name, bytes };
                    match name.as_str() {
                        "image" => uploads.image = Some(upload),
                        "video" => uploads.video = Some(upload),
                        _ => {}
                    }
                }
                None => {
                    let text = field.text().await?;
                    values.insert(name.clone(), form_value(&name, text));
                }
            }
        }

        let fields = serde_json::from_value(Value::Object(values)).map_err(|e| {
            ApiError::Validation(ValidationError::new("body", e.to_string()).into())
        })?;
        Ok(Self { fields, uploads })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAnnouncement {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub publish_at: Option<String>,
    pub is_active: Option<bool>,
}

impl CreateAnnouncement {
    /// Validate every field and upload, then build a record without media.
    pub fn into_record(
        self,
        offset: FixedOffset,
        uploads: &Uploads,
    ) -> Result<AnnouncementRecord, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let title = errors.check(required("title", self.title).and_then(validate_title));
        let content = errors.check(required("content", self.content));
        let category = errors.check(required("category", self.category).and_then(validate_category));
        let publish_at = errors
            .check(
                non_blank(self.publish_at)
                    .map(|value| parse_publish_at(&value, offset))
                    .transpose(),
            )
            .flatten();
        uploads.validate(&mut errors);

        match (title, content, category) {
            (Some(title), Some(content), Some(category)) if errors.is_empty() => {
                Ok(AnnouncementRecord {
                    title,
                    content,
                    category,
                    image_path: None,
                    video_path: None,
                    media_type: MediaType::None.as_str().to_string(),
                    publish_at,
                    is_active: self.is_active.unwrap_or(true),
                })
            }
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAnnouncement {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub publish_at: Option<Option<String>>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub remove_media: bool,
}

impl UpdateAnnouncement {
    /// Apply the changes on top of `current`.
    ///
    /// Returns the new record and the media paths it no longer references.
    /// New uploads are attached by the caller once stored.
    pub fn apply(
        self,
        current: Announcement,
        offset: FixedOffset,
        uploads: &Uploads,
    ) -> Result<(AnnouncementRecord, Vec<String>), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let mut record = AnnouncementRecord::from(current);

        if let Some(title) = self.title {
            if let Some(title) = errors.check(required("title", Some(title)).and_then(validate_title)) {
                record.title = title;
            }
        }
        if let Some(content) = self.content {
            if let Some(content) = errors.check(required("content", Some(content))) {
                record.content = content;
            }
        }
        if let Some(category) = self.category {
            if let Some(category) =
                errors.check(required("category", Some(category)).and_then(validate_category))
            {
                record.category = category;
            }
        }
        if let Some(publish_at) = self.publish_at {
            let parsed = non_blank(publish_at)
                .map(|value| parse_publish_at(&value, offset))
                .transpose();
            if let Some(publish_at) = errors.check(parsed) {
                record.publish_at = publish_at;
            }
        }
        if let Some(is_active) = self.is_active {
            record.is_active = is_active;
        }
        uploads.validate(&mut errors);
        errors.into_result()?;

        let stale = if self.remove_media {
            detach_media(&mut record)
        } else {
            Vec::new()
        };
        Ok((record, stale))
    }
}

/// Query string for the announcement listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub is_active: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub per_page: Option<i64>,
}

impl ListQuery {
    pub fn filter(&self) -> AnnouncementFilter {
        AnnouncementFilter {
            search: self.search.clone().filter(|s| !s.is_empty()),
            category: self.category.clone().filter(|c| !c.is_empty()),
            is_active: self.is_active.as_deref().map(parse_flag),
        }
    }

    /// Unknown columns fall back to `created_at`, unknown directions to descending.
    pub fn order(&self) -> AnnouncementOrder {
        let column = self
            .sort_by
            .as_deref()
            .and_then(|wanted| SORTABLE.iter().find(|column| **column == wanted))
            .copied()
            .unwrap_or("created_at");
        let descending = !matches!(
            self.sort_order.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("asc")
        );
        AnnouncementOrder { column, descending }
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn offset(&self) -> i64 {
        page_offset(self.page(), self.per_page())
    }
}

fn page_offset(page: i64, per_page: i64) -> i64 {
    (page - 1).saturating_mul(per_page)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: i64,
    pub per_page: i64,
    pub total: i64,
    pub last_page: i64,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64, total: i64, returned: usize) -> Self {
        let offset = page_offset(page, per_page);
        let returned = i64::try_from(returned).unwrap_or(i64::MAX);
        let (from, to) = if returned == 0 {
            (None, None)
        } else {
            (
                Some(offset.saturating_add(1)),
                Some(offset.saturating_add(returned)),
            )
        };
        Self {
            current_page: page,
            per_page,
            total,
            last_page: (total.saturating_add(per_page - 1) / per_page).max(1),
            from,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn wib() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn existing() -> Announcement {
        Announcement {
            id: 1,
            title: "Kajian".to_string(),
            content: "Isi".to_string(),
            category: "kajian".to_string(),
            image_path: Some("announcements/a.jpg".to_string()),
            video_path: None,
            media_type: "image".to_string(),
            publish_at: Some("2026-10-01T00:00:00+00:00".to_string()),
            is_active: true,
            created_at: "2026-10-01T00:00:00+00:00".to_string(),
            updated_at: "2026-10-01T00:00:00+00:00".to_string(),
        }
    }

    fn valid_create() -> CreateAnnouncement {
        CreateAnnouncement {
            title: Some("Santunan Anak Yatim".to_string()),
            content: Some("<p>Minggu pagi</p>".to_string()),
            category: Some("donasi".to_string()),
            ..Default::default()
        }
    }

    fn file(name: &str, size: usize) -> Upload {
        Upload {
            file_name: name.to_string(),
            bytes: Bytes::from(vec![1u8; size]),
        }
    }

    fn no_uploads() -> Uploads {
        Uploads::default()
    }

    mod create_tests {
        use super::*;

        #[test]
        fn test_minimal_create() {
            let record = valid_create().into_record(wib(), &no_uploads()).unwrap();
            assert_eq!(record.media_type, "none");
            assert!(record.is_active);
            assert!(record.publish_at.is_none());
        }

        #[test]
        fn test_required_fields() {
            let mut input = valid_create();
            input.title = Some("   ".to_string());
            assert!(input.into_record(wib(), &no_uploads()).unwrap_err().contains("title"));

            let mut input = valid_create();
            input.content = None;
            assert!(input.into_record(wib(), &no_uploads()).unwrap_err().contains("content"));
        }

        #[test]
        fn test_all_failures_reported_together() {
            let input = CreateAnnouncement {
                category: Some("olahraga".to_string()),
                publish_at: Some("someday".to_string()),
                ..Default::default()
            };
            let uploads = Uploads {
                image: Some(file("flyer.pdf", 4)),
                video: None,
            };

            let err = input.into_record(wib(), &uploads).unwrap_err();

            for field in ["title", "content", "category", "publish_at", "image"] {
                assert!(err.contains(field), "missing error for {}", field);
            }
            assert_eq!(err.len(), 5);
        }

        #[test]
        fn test_unknown_category() {
            let mut input = valid_create();
            input.category = Some("olahraga".to_string());
            assert!(input.into_record(wib(), &no_uploads()).unwrap_err().contains("category"));
        }

        #[test]
        fn test_title_length_limit() {
            let mut input = valid_create();
            input.title = Some("a".repeat(256));
            assert!(input.into_record(wib(), &no_uploads()).unwrap_err().contains("title"));

            let mut input = valid_create();
            input.title = Some("a".repeat(255));
            assert!(input.into_record(wib(), &no_uploads()).is_ok());
        }

        #[test]
        fn test_oversized_video_rejected() {
            let uploads = Uploads {
                image: None,
                video: Some(file("khutbah.mp4", 50 * 1024 * 1024 + 1)),
            };
            let err = valid_create().into_record(wib(), &uploads).unwrap_err();
            assert!(err.contains("video"));
        }

        #[test]
        fn test_path_fields_are_not_accepted() {
            let input: CreateAnnouncement = serde_json::from_str(
                r#"{"title": "t", "content": "c", "category": "kajian", "image_path": "/etc/passwd"}"#,
            )
            .unwrap();
            let record = input.into_record(wib(), &no_uploads()).unwrap();
            assert!(record.image_path.is_none());
            assert_eq!(record.media_type, "none");
        }
    }

    mod media_tests {
        use super::*;

        #[test]
        fn test_video_preferred_over_image() {
            let uploads = Uploads {
                image: Some(file("a.jpg", 1)),
                video: Some(file("a.mp4", 1)),
            };
            assert_eq!(uploads.preferred().unwrap().0, MediaKind::Video);

            let uploads = Uploads {
                image: Some(file("a.jpg", 1)),
                video: None,
            };
            assert_eq!(uploads.preferred().unwrap().0, MediaKind::Image);
            assert!(no_uploads().preferred().is_none());
        }

        #[test]
        fn test_attach_replaces_existing_media() {
            let mut record = AnnouncementRecord::from(existing());

            let replaced = attach_media(
                &mut record,
                MediaKind::Video,
                "announcements/videos/b.mp4".to_string(),
            );

            assert_eq!(replaced, vec!["announcements/a.jpg".to_string()]);
            assert_eq!(record.media_type, "video");
            assert!(record.image_path.is_none());
            assert_eq!(record.video_path.as_deref(), Some("announcements/videos/b.mp4"));
        }

        #[test]
        fn test_remove_then_replace() {
            let update = UpdateAnnouncement {
                remove_media: true,
                ..Default::default()
            };
            let uploads = Uploads {
                image: None,
                video: Some(file("b.webm", 1)),
            };
            let (mut record, mut stale) = update.apply(existing(), wib(), &uploads).unwrap();
            stale.extend(attach_media(
                &mut record,
                MediaKind::Video,
                "announcements/videos/b.webm".to_string(),
            ));

            assert_eq!(stale, vec!["announcements/a.jpg".to_string()]);
            assert_eq!(record.media_type, "video");
            assert!(record.image_path.is_none());
        }

        #[test]
        fn test_attach_to_bare_record() {
            let mut record = valid_create().into_record(wib(), &no_uploads()).unwrap();
            let replaced = attach_media(&mut record, MediaKind::Image, "announcements/c.png".to_string());
            assert!(replaced.is_empty());
            assert_eq!(record.media_type, "image");
        }
    }

    mod update_tests {
        use super::*;

        #[test]
        fn test_omitted_fields_unchanged() {
            let (record, stale) = UpdateAnnouncement::default()
                .apply(existing(), wib(), &no_uploads())
                .unwrap();
            assert_eq!(record.title, "Kajian");
            assert_eq!(record.media_type, "image");
            assert!(record.publish_at.is_some());
            assert!(stale.is_empty());
        }

        #[test]
        fn test_remove_media() {
            let update = UpdateAnnouncement {
                remove_media: true,
                ..Default::default()
            };
            let (record, stale) = update.apply(existing(), wib(), &no_uploads()).unwrap();
            assert_eq!(record.media_type, "none");
            assert!(record.image_path.is_none());
            assert_eq!(stale, vec!["announcements/a.jpg".to_string()]);
        }

        #[test]
        fn test_invalid_upload_rejected() {
            let uploads = Uploads {
                image: Some(file("poster.bmp", 1)),
                video: None,
            };
            let err = UpdateAnnouncement::default()
                .apply(existing(), wib(), &uploads)
                .unwrap_err();
            assert!(err.contains("image"));
        }

        #[test]
        fn test_null_publish_at_clears() {
            let update: UpdateAnnouncement =
                serde_json::from_str(r#"{"publish_at": null}"#).unwrap();
            let (record, _) = update.apply(existing(), wib(), &no_uploads()).unwrap();
            assert!(record.publish_at.is_none());
        }

        #[test]
        fn test_blank_title_rejected() {
            let update = UpdateAnnouncement {
                title: Some(String::new()),
                category: Some("gosip".to_string()),
                ..Default::default()
            };
            let err = update.apply(existing(), wib(), &no_uploads()).unwrap_err();
            assert!(err.contains("title"));
            assert!(err.contains("category"));
        }
    }

    mod publish_at_tests {
        use super::*;

        #[test]
        fn test_rfc3339_normalized_to_utc() {
            let value = parse_publish_at("2026-10-17T08:00:00+07:00", wib()).unwrap();
            assert_eq!(value, "2026-10-17T01:00:00+00:00");
        }

        #[test]
        fn test_local_datetime_uses_offset() {
            assert_eq!(
                parse_publish_at("2026-10-17T08:00", wib()).unwrap(),
                "2026-10-17T01:00:00+00:00"
            );
            assert_eq!(
                parse_publish_at("2026-10-17 08:00:00", wib()).unwrap(),
                "2026-10-17T01:00:00+00:00"
            );
        }

        #[test]
        fn test_date_only() {
            assert_eq!(
                parse_publish_at("2026-10-17", wib()).unwrap(),
                "2026-10-16T17:00:00+00:00"
            );
        }

        #[test]
        fn test_invalid_date() {
            let err = parse_publish_at("next friday", wib()).unwrap_err();
            assert_eq!(err.field, "publish_at");
        }
    }

    mod list_query_tests {
        use super::*;

        fn query(s: &str) -> ListQuery {
            serde_urlencoded::from_str(s).unwrap()
        }

        #[test]
        fn test_defaults() {
            let q = query("");
            assert_eq!(q.page(), 1);
            assert_eq!(q.per_page(), 15);
            assert_eq!(q.offset(), 0);
            let order = q.order();
            assert_eq!(order.column, "created_at");
            assert!(order.descending);
            assert!(q.filter().is_active.is_none());
        }

        #[test]
        fn test_per_page_is_clamped() {
            assert_eq!(query("per_page=0").per_page(), 1);
            assert_eq!(query("per_page=500").per_page(), 100);
            assert_eq!(query("per_page=20&page=3").offset(), 40);
        }

        #[test]
        fn test_non_numeric_paging_is_lenient() {
            assert_eq!(query("per_page=abc").per_page(), 1);
            assert_eq!(query("per_page=25abc").per_page(), 25);
            assert_eq!(query("page=abc").page(), 1);
            assert_eq!(query("page=-4").page(), 1);
        }

        #[test]
        fn test_huge_page_saturates() {
            let q = query("page=9223372036854775807&per_page=100");
            assert_eq!(q.page(), i64::MAX);
            assert_eq!(q.offset(), i64::MAX);

            let q = query("page=99999999999999999999999");
            assert_eq!(q.page(), i64::MAX);
        }

        #[test]
        fn test_sort_whitelist() {
            let order = query("sort_by=title&sort_order=ASC").order();
            assert_eq!(order.column, "title");
            assert!(!order.descending);

            let order = query("sort_by=content;DROP&sort_order=sideways").order();
            assert_eq!(order.column, "created_at");
            assert!(order.descending);
        }

        #[test]
        fn test_is_active_flag() {
            assert_eq!(query("is_active=1").filter().is_active, Some(true));
            assert_eq!(query("is_active=false").filter().is_active, Some(false));
            assert_eq!(query("is_active=maybe").filter().is_active, Some(false));
        }
    }

    mod pagination_tests {
        use super::*;

        #[test]
        fn test_pagination_window() {
            let p = Pagination::new(2, 10, 25, 10);
            assert_eq!(p.last_page, 3);
            assert_eq!(p.from, Some(11));
            assert_eq!(p.to, Some(20));
        }

        #[test]
        fn test_empty_page() {
            let p = Pagination::new(5, 10, 25, 0);
            assert_eq!(p.from, None);
            assert_eq!(p.to, None);
            assert_eq!(Pagination::new(1, 15, 0, 0).last_page, 1);
        }

        #[test]
        fn test_huge_page_does_not_overflow() {
            let p = Pagination::new(i64::MAX, 100, 3, 0);
            assert_eq!(p.current_page, i64::MAX);
            assert_eq!(p.from, None);
            assert_eq!(p.last_page, 1);
        }
    }

    #[test]
    fn test_categories_json() {
        let value = categories_json();
        assert_eq!(value["kajian"], "Kajian & Pengajian");
        assert_eq!(value.as_object().unwrap().len(), 8);
    }
}
