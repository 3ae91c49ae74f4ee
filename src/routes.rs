use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::info;

use crate::announcements::{
    attach_media, categories_json, AnnouncementForm, CreateAnnouncement, ListQuery, Pagination,
    UpdateAnnouncement,
};
use crate::auth::AdminUser;
use crate::config::{AdminConfig, LocationConfig};
use crate::db::Database;
use crate::error::{ApiError, ApiJson, ApiQuery};
use crate::media::{discard, MediaStore};
use crate::resolver::{OverrideUpdate, PrayerTimeResolver, ResolvedSchedule};

/// Largest announcement request body: one video plus form fields.
const MAX_ANNOUNCEMENT_BODY: usize = 56 * 1024 * 1024;

pub struct AppState {
    pub db: Arc<Database>,
    pub resolver: Arc<PrayerTimeResolver>,
    pub location: LocationConfig,
    pub admins: Vec<AdminConfig>,
    pub media: Arc<dyn MediaStore>,
}

impl AppState {
    fn offset(&self) -> chrono::FixedOffset {
        *self.resolver.calendar().now().offset()
    }

    /// Remove a file stored for a write that then failed.
    async fn rollback(&self, stored: Option<String>) {
        discard(self.media.as_ref(), stored.into_iter().collect()).await;
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api", get(welcome))
        .route("/health", get(health))
        .route(
            "/api/prayer-times",
            get(prayer_times).put(update_prayer_times),
        )
        .route("/api/prayer-times/refresh", post(refresh_prayer_times))
        .route("/api/prayer-times/reset-jumat", post(reset_jumat))
        .route(
            "/api/announcements",
            get(list_announcements)
                .post(create_announcement)
                .layer(DefaultBodyLimit::max(MAX_ANNOUNCEMENT_BODY)),
        )
        .route(
            "/api/announcements/:id",
            get(show_announcement)
                .put(update_announcement)
                .delete(delete_announcement)
                .layer(DefaultBodyLimit::max(MAX_ANNOUNCEMENT_BODY)),
        )
        .with_state(state)
}

pub async fn welcome() -> impl IntoResponse {
    Json(json!({
        "message": "Selamat datang di Sistem Pengumuman Masjid Digital API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}

fn schedule_body(state: &AppState, resolved: ResolvedSchedule, message: Option<&str>) -> Value {
    let mut body = json!({
        "success": true,
        "data": resolved.times,
        "source": resolved.source,
        "jumat_source": resolved.jumat_source,
        "location": state.location.name,
        "coordinates": {
            "latitude": state.location.latitude,
            "longitude": state.location.longitude,
        },
        "date": resolved.date,
    });
    if let Some(message) = message {
        body["message"] = json!(message);
    }
    body
}

pub async fn prayer_times(State(state): State<Arc<AppState>>) -> Json<Value> {
    let resolved = state.resolver.todays_schedule().await;
    Json(schedule_body(&state, resolved, None))
}

pub async fn update_prayer_times(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    ApiJson(update): ApiJson<OverrideUpdate>,
) -> Result<Json<Value>, ApiError> {
    let resolved = state.resolver.update_override(update, admin.id).await?;
    info!("Prayer times updated by {}", admin.name);
    Ok(Json(schedule_body(
        &state,
        resolved,
        Some("Prayer times updated"),
    )))
}

pub async fn refresh_prayer_times(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
) -> Json<Value> {
    info!("Prayer times refresh requested by {}", admin.name);
    let resolved = state.resolver.force_refresh().await;
    Json(schedule_body(
        &state,
        resolved,
        Some("Prayer times refreshed"),
    ))
}

pub async fn reset_jumat(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
) -> Result<Json<Value>, ApiError> {
    let resolved = state.resolver.reset_jumat_override(admin.id).await?;
    Ok(Json(schedule_body(
        &state,
        resolved,
        Some("Jumat time reset to automatic"),
    )))
}

pub async fn list_announcements(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let filter = query.filter();
    let per_page = query.per_page();
    let page = query.page();

    let items = state
        .db
        .list_announcements(&filter, query.order(), per_page, query.offset())
        .await?;
    let total = state.db.count_announcements(&filter).await?;
    let pagination = Pagination::new(page, per_page, total, items.len());

    Ok(Json(json!({
        "success": true,
        "data": items,
        "pagination": pagination,
        "categories": categories_json(),
    })))
}

pub async fn show_announcement(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let announcement = state
        .db
        .get_announcement(id)
        .await?
        .ok_or(ApiError::NotFound("Announcement"))?;

    Ok(Json(json!({
        "success": true,
        "data": announcement,
        "categories": categories_json(),
    })))
}

pub async fn create_announcement(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    form: AnnouncementForm<CreateAnnouncement>,
) -> Result<impl IntoResponse, ApiError> {
    let AnnouncementForm { fields, uploads } = form;
    let mut record = fields.into_record(state.offset(), &uploads)?;

    let mut stored = None;
    if let Some((kind, upload)) = uploads.preferred() {
        let path = state.media.store(kind, upload).await?;
        attach_media(&mut record, kind, path.clone());
        stored = Some(path);
    }

    let announcement = match state.db.insert_announcement(&record).await {
        Ok(announcement) => announcement,
        Err(e) => {
            state.rollback(stored).await;
            return Err(e.into());
        }
    };
    info!("Announcement {} created by {}", announcement.id, admin.name);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Announcement created",
            "data": announcement,
        })),
    ))
}

pub async fn update_announcement(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<i64>,
    form: AnnouncementForm<UpdateAnnouncement>,
) -> Result<Json<Value>, ApiError> {
    let AnnouncementForm { fields, uploads } = form;
    let current = state
        .db
        .get_announcement(id)
        .await?
        .ok_or(ApiError::NotFound("Announcement"))?;

    let (mut record, mut stale) = fields.apply(current, state.offset(), &uploads)?;

    let mut stored = None;
    if let Some((kind, upload)) = uploads.preferred() {
        let path = state.media.store(kind, upload).await?;
        stale.extend(attach_media(&mut record, kind, path.clone()));
        stored = Some(path);
    }

    let announcement = match state.db.update_announcement(id, &record).await {
        Ok(Some(announcement)) => announcement,
        Ok(None) => {
            state.rollback(stored).await;
            return Err(ApiError::NotFound("Announcement"));
        }
        Err(e) => {
            state.rollback(stored).await;
            return Err(e.into());
        }
    };
    discard(state.media.as_ref(), stale).await;
    info!("Announcement {} updated by {}", id, admin.name);

    Ok(Json(json!({
        "success": true,
        "message": "Announcement updated",
        "data": announcement,
    })))
}

pub async fn delete_announcement(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let announcement = state
        .db
        .get_announcement(id)
        .await?
        .ok_or(ApiError::NotFound("Announcement"))?;

    if !state.db.delete_announcement(id).await? {
        return Err(ApiError::NotFound("Announcement"));
    }
    let files = announcement
        .image_path
        .into_iter()
        .chain(announcement.video_path)
        .collect();
    discard(state.media.as_ref(), files).await;
    info!("Announcement {} deleted by {}", id, admin.name);

    Ok(Json(json!({
        "success": true,
        "message": "Announcement deleted",
    })))
}
