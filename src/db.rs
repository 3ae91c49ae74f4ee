use chrono::Utc;
use serde::Serialize;
use sqlx::{sqlite::SqlitePoolOptions, FromRow, QueryBuilder, Sqlite, SqlitePool};

/// Manually set prayer times; every field may be unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct OverrideFields {
    pub imsak: Option<String>,
    pub subuh: Option<String>,
    pub dzuhur: Option<String>,
    pub ashar: Option<String>,
    pub maghrib: Option<String>,
    pub isya: Option<String>,
    pub jumat: Option<String>,
}

/// The single override row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PrayerOverride {
    pub id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: OverrideFields,
    pub updated_by: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Announcement {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub image_path: Option<String>,
    pub video_path: Option<String>,
    pub media_type: String,
    pub publish_at: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Column values written on insert or update.
#[derive(Debug, Clone)]
pub struct AnnouncementRecord {
    pub title: String,
    pub content: String,
    pub category: String,
    pub image_path: Option<String>,
    pub video_path: Option<String>,
    pub media_type: String,
    pub publish_at: Option<String>,
    pub is_active: bool,
}

impl From<Announcement> for AnnouncementRecord {
    fn from(a: Announcement) -> Self {
        Self {
            title: a.title,
            content: a.content,
            category: a.category,
            image_path: a.image_path,
            video_path: a.video_path,
            media_type: a.media_type,
            publish_at: a.publish_at,
            is_active: a.is_active,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnnouncementFilter {
    /// Substring matched against title and content
    pub search: Option<String>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

/// Already-whitelisted ORDER BY clause.
#[derive(Debug, Clone, Copy)]
pub struct AnnouncementOrder {
    pub column: &'static str,
    pub descending: bool,
}

impl Default for AnnouncementOrder {
    fn default() -> Self {
        Self {
            column: "created_at",
            descending: true,
        }
    }
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// In-memory databases live per connection, so keep exactly one.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS prayer_times (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                imsak TEXT,
                subuh TEXT,
                dzuhur TEXT,
                ashar TEXT,
                maghrib TEXT,
                isya TEXT,
                jumat TEXT,
                updated_by INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS announcements (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT 'pengumuman',
                image_path TEXT,
                video_path TEXT,
                media_type TEXT NOT NULL DEFAULT 'none',
                publish_at TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for index in [
            "CREATE INDEX IF NOT EXISTS idx_announcements_category ON announcements(category)",
            "CREATE INDEX IF NOT EXISTS idx_announcements_active ON announcements(is_active)",
            "CREATE INDEX IF NOT EXISTS idx_announcements_publish ON announcements(publish_at)",
        ] {
            sqlx::query(index).execute(&self.pool).await?;
        }

        Ok(())
    }

    pub async fn get_prayer_override(&self) -> anyhow::Result<Option<PrayerOverride>> {
        let row = sqlx::query_as::<_, PrayerOverride>("SELECT * FROM prayer_times WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Write the whole override row, creating it on first use.
    pub async fn save_prayer_override(
        &self,
        fields: &OverrideFields,
        updated_by: i64,
    ) -> anyhow::Result<PrayerOverride> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO prayer_times
                (id, imsak, subuh, dzuhur, ashar, maghrib, isya, jumat, updated_by, created_at, updated_at)
            VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                imsak = excluded.imsak,
                subuh = excluded.subuh,
                dzuhur = excluded.dzuhur,
                ashar = excluded.ashar,
                maghrib = excluded.maghrib,
                isya = excluded.isya,
                jumat = excluded.jumat,
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&fields.imsak)
        .bind(&fields.subuh)
        .bind(&fields.dzuhur)
        .bind(&fields.ashar)
        .bind(&fields.maghrib)
        .bind(&fields.isya)
        .bind(&fields.jumat)
        .bind(updated_by)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_prayer_override()
            .await?
            .ok_or_else(|| anyhow::anyhow!("prayer_times row missing after upsert"))
    }

    fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &AnnouncementFilter) {
        builder.push(" WHERE 1 = 1");
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            builder
                .push(" AND (title LIKE ")
                .push_bind(pattern.clone())
                .push(" OR content LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
            builder.push(" AND category = ").push_bind(category.to_string());
        }
        if let Some(is_active) = filter.is_active {
            builder.push(" AND is_active = ").push_bind(is_active);
        }
    }

    pub async fn list_announcements(
        &self,
        filter: &AnnouncementFilter,
        order: AnnouncementOrder,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Announcement>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM announcements");
        Self::push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY ")
            .push(order.column)
            .push(if order.descending { " DESC" } else { " ASC" })
            .push(", id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let items = builder
            .build_query_as::<Announcement>()
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn count_announcements(&self, filter: &AnnouncementFilter) -> anyhow::Result<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM announcements");
        Self::push_filter(&mut builder, filter);

        let count = builder.build_query_as::<(i64,)>().fetch_one(&self.pool).await?;
        Ok(count.0)
    }

    pub async fn get_announcement(&self, id: i64) -> anyhow::Result<Option<Announcement>> {
        let item = sqlx::query_as::<_, Announcement>("SELECT * FROM announcements WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    pub async fn insert_announcement(
        &self,
        record: &AnnouncementRecord,
    ) -> anyhow::Result<Announcement> {
        let now = Utc::now().to_rfc3339();
        let id = sqlx::query(
            r#"
            INSERT INTO announcements
                (title, content, category, image_path, video_path, media_type, publish_at, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.title)
        .bind(&record.content)
        .bind(&record.category)
        .bind(&record.image_path)
        .bind(&record.video_path)
        .bind(&record.media_type)
        .bind(&record.publish_at)
        .bind(record.is_active)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get_announcement(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("announcement {} missing after insert", id))
    }

    /// Returns `None` when no announcement has this id.
    pub async fn update_announcement(
        &self,
        id: i64,
        record: &AnnouncementRecord,
    ) -> anyhow::Result<Option<Announcement>> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE announcements
            SET title = ?, content = ?, category = ?, image_path = ?, video_path = ?,
                media_type = ?, publish_at = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.title)
        .bind(&record.content)
        .bind(&record.category)
        .bind(&record.image_path)
        .bind(&record.video_path)
        .bind(&record.media_type)
        .bind(&record.publish_at)
        .bind(record.is_active)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_announcement(id).await
    }

    pub async fn delete_announcement(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
