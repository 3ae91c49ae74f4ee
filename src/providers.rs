//! External prayer-time providers.
//!
//! Each provider turns one HTTP call into an [`ExternalSchedule`] or a
//! [`FetchError`]; the resolver decides what to do with failures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::Config;
use crate::schedule::{parse_time, strip_annotation, DailyTimes, ExternalSchedule, ScheduleSource};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("malformed payload: {0}")]
    Payload(String),
}

#[async_trait]
pub trait ScheduleProvider: Send + Sync {
    fn source(&self) -> ScheduleSource;

    async fn fetch(&self, date: NaiveDate) -> Result<ExternalSchedule, FetchError>;
}

pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent("MasjidBoard/1.0 (Prayer Times)")
        .build()
}

/// Primary then secondary, in the order they must be tried.
pub fn provider_chain(config: &Config) -> anyhow::Result<Vec<Arc<dyn ScheduleProvider>>> {
    let client = build_client(config.providers.timeout())?;
    let location = &config.location;

    let primary: Arc<dyn ScheduleProvider> = Arc::new(MyQuranProvider::new(
        client.clone(),
        &config.providers.myquran_base_url,
        &location.city_id,
    ));
    let secondary: Arc<dyn ScheduleProvider> = Arc::new(AladhanProvider::new(
        client,
        &config.providers.aladhan_base_url,
        location.latitude,
        location.longitude,
        location.method,
        &location.timezone,
    ));

    Ok(vec![primary, secondary])
}

async fn get_body(request: reqwest::RequestBuilder) -> Result<Vec<u8>, FetchError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }
    Ok(response.bytes().await?.to_vec())
}

/// Raw field values pulled from a provider payload, before defaults.
#[derive(Debug, Default)]
struct RawTimes {
    imsak: Option<String>,
    subuh: Option<String>,
    sunrise: Option<String>,
    dzuhur: Option<String>,
    ashar: Option<String>,
    maghrib: Option<String>,
    isya: Option<String>,
}

impl RawTimes {
    /// Fill gaps from the location defaults and reject values that are not times.
    fn into_daily(self) -> Result<DailyTimes, FetchError> {
        let core = [&self.subuh, &self.dzuhur, &self.ashar, &self.maghrib, &self.isya];
        if core.iter().all(|field| field.is_none()) {
            return Err(FetchError::Payload("schedule has no prayer times".to_string()));
        }

        let defaults = DailyTimes::defaults();
        let pick = |name: &str, value: Option<String>, default: String| -> Result<String, FetchError> {
            match value.map(|v| strip_annotation(&v)) {
                Some(v) => {
                    parse_time(&v).map_err(|e| FetchError::Payload(format!("{}: {}", name, e)))?;
                    Ok(v)
                }
                None => Ok(default),
            }
        };

        let sunrise = match self.sunrise.map(|v| strip_annotation(&v)) {
            Some(v) if parse_time(&v).is_ok() => Some(v),
            _ => None,
        };

        Ok(DailyTimes {
            imsak: pick("imsak", self.imsak, defaults.imsak)?,
            subuh: pick("subuh", self.subuh, defaults.subuh)?,
            sunrise,
            dzuhur: pick("dzuhur", self.dzuhur, defaults.dzuhur)?,
            ashar: pick("ashar", self.ashar, defaults.ashar)?,
            maghrib: pick("maghrib", self.maghrib, defaults.maghrib)?,
            isya: pick("isya", self.isya, defaults.isya)?,
        })
    }
}

// myQuran v2: /sholat/jadwal/{city}/{yyyy}/{mm}/{dd}

#[derive(Debug, Deserialize)]
struct MyQuranResponse {
    #[serde(default)]
    status: bool,
    data: Option<MyQuranData>,
}

#[derive(Debug, Deserialize)]
struct MyQuranData {
    jadwal: Option<MyQuranJadwal>,
}

#[derive(Debug, Deserialize)]
struct MyQuranJadwal {
    imsak: Option<String>,
    subuh: Option<String>,
    #[serde(alias = "sunrise")]
    terbit: Option<String>,
    dzuhur: Option<String>,
    ashar: Option<String>,
    maghrib: Option<String>,
    isya: Option<String>,
}

pub struct MyQuranProvider {
    client: Client,
    base_url: String,
    city_id: String,
}

impl MyQuranProvider {
    pub fn new(client: Client, base_url: &str, city_id: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            city_id: city_id.to_string(),
        }
    }

    pub fn url_for(&self, date: NaiveDate) -> String {
        format!(
            "{}/sholat/jadwal/{}/{}/{:02}/{:02}",
            self.base_url,
            self.city_id,
            date.year(),
            date.month(),
            date.day()
        )
    }

    pub fn parse(body: &[u8]) -> Result<DailyTimes, FetchError> {
        let response: MyQuranResponse =
            serde_json::from_slice(body).map_err(|e| FetchError::Payload(e.to_string()))?;
        if !response.status {
            return Err(FetchError::Payload("status flag is false".to_string()));
        }
        let jadwal = response
            .data
            .and_then(|data| data.jadwal)
            .ok_or_else(|| FetchError::Payload("missing jadwal".to_string()))?;

        RawTimes {
            imsak: jadwal.imsak,
            subuh: jadwal.subuh,
            sunrise: jadwal.terbit,
            dzuhur: jadwal.dzuhur,
            ashar: jadwal.ashar,
            maghrib: jadwal.maghrib,
            isya: jadwal.isya,
        }
        .into_daily()
    }
}

#[async_trait]
impl ScheduleProvider for MyQuranProvider {
    fn source(&self) -> ScheduleSource {
        ScheduleSource::MyQuran
    }

    async fn fetch(&self, date: NaiveDate) -> Result<ExternalSchedule, FetchError> {
        let body = get_body(self.client.get(self.url_for(date))).await?;
        Ok(ExternalSchedule {
            times: Self::parse(&body)?,
            source: self.source(),
        })
    }
}

// Aladhan: /timings/{dd-mm-yyyy}?latitude=&longitude=&method=&timezonestring=

#[derive(Debug, Deserialize)]
struct AladhanResponse {
    code: Option<u16>,
    data: Option<AladhanData>,
}

#[derive(Debug, Deserialize)]
struct AladhanData {
    timings: Option<AladhanTimings>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AladhanTimings {
    imsak: Option<String>,
    fajr: Option<String>,
    sunrise: Option<String>,
    dhuhr: Option<String>,
    asr: Option<String>,
    maghrib: Option<String>,
    isha: Option<String>,
}

pub struct AladhanProvider {
    client: Client,
    base_url: String,
    latitude: f64,
    longitude: f64,
    method: u8,
    timezone: String,
}

impl AladhanProvider {
    pub fn new(
        client: Client,
        base_url: &str,
        latitude: f64,
        longitude: f64,
        method: u8,
        timezone: &str,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            latitude,
            longitude,
            method,
            timezone: timezone.to_string(),
        }
    }

    pub fn url_for(&self, date: NaiveDate) -> String {
        format!("{}/timings/{}", self.base_url, date.format("%d-%m-%Y"))
    }

    pub fn parse(body: &[u8]) -> Result<DailyTimes, FetchError> {
        let response: AladhanResponse =
            serde_json::from_slice(body).map_err(|e| FetchError::Payload(e.to_string()))?;
        if let Some(code) = response.code.filter(|code| *code != 200) {
            return Err(FetchError::Payload(format!("response code {}", code)));
        }
        let timings = response
            .data
            .and_then(|data| data.timings)
            .ok_or_else(|| FetchError::Payload("missing timings".to_string()))?;

        RawTimes {
            imsak: timings.imsak,
            subuh: timings.fajr,
            sunrise: timings.sunrise,
            dzuhur: timings.dhuhr,
            ashar: timings.asr,
            maghrib: timings.maghrib,
            isya: timings.isha,
        }
        .into_daily()
    }
}

#[async_trait]
impl ScheduleProvider for AladhanProvider {
    fn source(&self) -> ScheduleSource {
        ScheduleSource::Aladhan
    }

    async fn fetch(&self, date: NaiveDate) -> Result<ExternalSchedule, FetchError> {
        let request = self.client.get(self.url_for(date)).query(&[
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
            ("method", self.method.to_string()),
            ("timezonestring", self.timezone.clone()),
        ]);
        let body = get_body(request).await?;
        Ok(ExternalSchedule {
            times: Self::parse(&body)?,
            source: self.source(),
        })
    }
}
