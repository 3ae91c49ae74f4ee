//! Prayer-time resolution: external providers with fallback, a per-day cache,
//! the manual override row and hardcoded defaults.
//!
//! Lookup order for today's schedule:
//!
//! 1. the cached external schedule for today's date
//! 2. each provider in turn (myQuran, then Aladhan); the first success is
//!    cached until local midnight
//! 3. the override row, when it holds all five daily prayers
//! 4. [`DailyTimes::defaults`]
//!
//! With an external schedule only the override's `jumat` is honoured; without
//! a manual `jumat` it is derived from `dzuhur`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, error, info, warn};

use crate::cache::{daily_key, ScheduleCache};
use crate::calendar::LocalCalendar;
use crate::db::{Database, OverrideFields};
use crate::error::{ValidationError, ValidationErrors};
use crate::providers::{FetchError, ScheduleProvider};
use crate::schedule::{
    auto_jumat, parse_time, DailyTimes, ExternalSchedule, JumatSource, PrayerTimes,
    ScheduleSource,
};

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Persistence for the single override row.
#[async_trait]
pub trait OverrideStore: Send + Sync {
    async fn load_override(&self) -> anyhow::Result<Option<OverrideFields>>;
    async fn save_override(&self, fields: &OverrideFields, actor_id: i64) -> anyhow::Result<()>;
}

#[async_trait]
impl OverrideStore for Database {
    async fn load_override(&self) -> anyhow::Result<Option<OverrideFields>> {
        Ok(self.get_prayer_override().await?.map(|row| row.fields))
    }

    async fn save_override(&self, fields: &OverrideFields, actor_id: i64) -> anyhow::Result<()> {
        self.save_prayer_override(fields, actor_id).await?;
        Ok(())
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Partial override update.
///
/// Outer `None` leaves a field untouched, `Some(None)` clears it. Blank
/// strings count as null.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverrideUpdate {
    #[serde(default, deserialize_with = "present")]
    pub imsak: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub subuh: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub dzuhur: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub ashar: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub maghrib: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub isya: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub jumat: Option<Option<String>>,
}

impl OverrideUpdate {
    fn entries(&self) -> [(&'static str, &Option<Option<String>>); 7] {
        [
            ("imsak", &self.imsak),
            ("subuh", &self.subuh),
            ("dzuhur", &self.dzuhur),
            ("ashar", &self.ashar),
            ("maghrib", &self.maghrib),
            ("isya", &self.isya),
            ("jumat", &self.jumat),
        ]
    }

    /// Check every provided time, reporting all malformed fields at once.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        for (field, value) in self.entries() {
            if let Some(Some(time)) = value {
                if time.trim().is_empty() {
                    continue;
                }
                if parse_time(time.trim()).is_err() {
                    errors.push(ValidationError::new(
                        field,
                        format!("The {} field must match the format H:i.", field),
                    ));
                }
            }
        }
        errors.into_result()
    }

    /// Merge provided fields into `fields`.
    pub fn apply(self, fields: &mut OverrideFields) {
        let merge = |target: &mut Option<String>, value: Option<Option<String>>| {
            if let Some(value) = value {
                *target = value
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty());
            }
        };
        merge(&mut fields.imsak, self.imsak);
        merge(&mut fields.subuh, self.subuh);
        merge(&mut fields.dzuhur, self.dzuhur);
        merge(&mut fields.ashar, self.ashar);
        merge(&mut fields.maghrib, self.maghrib);
        merge(&mut fields.isya, self.isya);
        merge(&mut fields.jumat, self.jumat);
    }
}

/// Composite schedule document returned by every resolver operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSchedule {
    pub date: NaiveDate,
    pub times: PrayerTimes,
    pub source: ScheduleSource,
    pub jumat_source: JumatSource,
}

#[derive(Debug)]
pub struct ProviderFailure {
    pub source: ScheduleSource,
    pub error: FetchError,
}

pub struct PrayerTimeResolver {
    providers: Vec<Arc<dyn ScheduleProvider>>,
    cache: Arc<dyn ScheduleCache>,
    store: Arc<dyn OverrideStore>,
    calendar: LocalCalendar,
}

impl PrayerTimeResolver {
    pub fn new(
        providers: Vec<Arc<dyn ScheduleProvider>>,
        cache: Arc<dyn ScheduleCache>,
        store: Arc<dyn OverrideStore>,
        calendar: LocalCalendar,
    ) -> Self {
        Self {
            providers,
            cache,
            store,
            calendar,
        }
    }

    pub fn calendar(&self) -> &LocalCalendar {
        &self.calendar
    }

    /// Today's schedule from the best available tier. Never fails.
    pub async fn todays_schedule(&self) -> ResolvedSchedule {
        let date = self.calendar.today();
        let key = daily_key(date);

        let external = match self.cache.get(&key).await {
            Some(cached) => {
                debug!("Using cached {} schedule for {}", cached.source, date);
                Some(cached)
            }
            None => {
                let (fetched, failures) = self.fetch_external(date).await;
                for failure in &failures {
                    warn!(
                        provider = %failure.source,
                        date = %date,
                        "Prayer-time provider failed: {}",
                        failure.error
                    );
                }
                if let Some(schedule) = &fetched {
                    info!("Fetched prayer times for {} from {}", date, schedule.source);
                    self.cache
                        .put(&key, schedule.clone(), self.calendar.until_midnight())
                        .await;
                } else {
                    warn!("No external prayer times for {}, using local fallback", date);
                }
                fetched
            }
        };

        let stored = match self.store.load_override().await {
            Ok(stored) => stored,
            Err(e) => {
                error!("Failed to read prayer time override: {:#}", e);
                None
            }
        };

        compose(date, external, stored)
    }

    /// Try providers in order; stops at the first success.
    async fn fetch_external(
        &self,
        date: NaiveDate,
    ) -> (Option<ExternalSchedule>, Vec<ProviderFailure>) {
        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.fetch(date).await {
                Ok(schedule) => return (Some(schedule), failures),
                Err(error) => failures.push(ProviderFailure {
                    source: provider.source(),
                    error,
                }),
            }
        }
        (None, failures)
    }

    async fn invalidate_today(&self) {
        self.cache.forget(&daily_key(self.calendar.today())).await;
    }

    pub async fn update_override(
        &self,
        update: OverrideUpdate,
        actor_id: i64,
    ) -> Result<ResolvedSchedule, ResolverError> {
        update.validate()?;

        let mut fields = self.store.load_override().await?.unwrap_or_default();
        update.apply(&mut fields);
        self.store.save_override(&fields, actor_id).await?;
        info!("Prayer time override updated by {}", actor_id);

        self.invalidate_today().await;
        Ok(self.todays_schedule().await)
    }

    /// Clear the manual Friday time so it is derived from Dzuhur again.
    pub async fn reset_jumat_override(
        &self,
        actor_id: i64,
    ) -> Result<ResolvedSchedule, ResolverError> {
        let mut fields = self.store.load_override().await?.unwrap_or_default();
        fields.jumat = None;
        self.store.save_override(&fields, actor_id).await?;
        info!("Jumat override reset by {}", actor_id);

        self.invalidate_today().await;
        Ok(self.todays_schedule().await)
    }

    pub async fn force_refresh(&self) -> ResolvedSchedule {
        self.invalidate_today().await;
        self.todays_schedule().await
    }
}

fn compose(
    date: NaiveDate,
    external: Option<ExternalSchedule>,
    stored: Option<OverrideFields>,
) -> ResolvedSchedule {
    let stored = stored.unwrap_or_default();

    if let Some(external) = external {
        let (jumat, jumat_source) = jumat_for(stored.jumat, &external.times.dzuhur);
        return ResolvedSchedule {
            date,
            times: PrayerTimes {
                daily: external.times,
                jumat,
            },
            source: external.source,
            jumat_source,
        };
    }

    if let (Some(subuh), Some(dzuhur), Some(ashar), Some(maghrib), Some(isya)) = (
        stored.subuh,
        stored.dzuhur,
        stored.ashar,
        stored.maghrib,
        stored.isya,
    ) {
        let (jumat, jumat_source) = jumat_for(stored.jumat, &dzuhur);
        return ResolvedSchedule {
            date,
            times: PrayerTimes {
                daily: DailyTimes {
                    imsak: stored.imsak.unwrap_or_else(|| DailyTimes::defaults().imsak),
                    subuh,
                    sunrise: None,
                    dzuhur,
                    ashar,
                    maghrib,
                    isya,
                },
                jumat,
            },
            source: ScheduleSource::Database,
            jumat_source,
        };
    }

    let daily = DailyTimes::defaults();
    let jumat = auto_jumat(&daily.dzuhur);
    ResolvedSchedule {
        date,
        times: PrayerTimes { daily, jumat },
        source: ScheduleSource::Default,
        jumat_source: JumatSource::Auto,
    }
}

fn jumat_for(manual: Option<String>, dzuhur: &str) -> (String, JumatSource) {
    match manual {
        Some(jumat) => (jumat, JumatSource::Manual),
        None => (auto_jumat(dzuhur), JumatSource::Auto),
    }
}
