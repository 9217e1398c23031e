use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::api_types::*;
use crate::config::{ConfigError, MarketplaceSettings};
use crate::store::{NoticeStore, StoreError};

pub const PAGE_SIZE: u32 = 100;
const SEARCH_PATH: &str = "notice/search";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("marketplace {stage} request failed: {source}")]
    Http {
        stage: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("marketplace {stage} response rejected: {reason}")]
    Upstream { stage: &'static str, reason: String },
    #[error("could not write notice store: {0}")]
    Store(#[from] StoreError),
}

pub struct MarketplaceClient {
    http: Client,
    settings: MarketplaceSettings,
}

impl MarketplaceClient {
    pub fn new(settings: MarketplaceSettings) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|source| FetchError::Http { stage: "client", source })?;
        Ok(Self { http, settings })
    }

    /// Client-credentials grant; returns the bearer token.
    pub async fn fetch_token(&self) -> Result<String, FetchError> {
        let start = std::time::Instant::now();
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
        ];
        if let Some(scope) = self.settings.scope.as_deref() {
            form.push(("scope", scope));
        }

        debug!("Requesting marketplace token - url={}", self.settings.token_url);
        let http_err = |source| FetchError::Http { stage: "token", source };
        let resp = self
            .http
            .post(self.settings.token_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(http_err)?
            .error_for_status()
            .map_err(http_err)?;
        let token: TokenResponse = resp.json().await.map_err(http_err)?;

        if token.access_token.trim().is_empty() {
            return Err(FetchError::Upstream { stage: "token", reason: "empty access_token".into() });
        }
        info!(
            "Marketplace token acquired - duration={:.2}s, expires_in={:?}",
            start.elapsed().as_secs_f32(),
            token.expires_in
        );
        Ok(token.access_token)
    }

    /// One search call, newest first. Items are returned untouched.
    pub async fn search_notices(&self, token: &str, since: DateTime<Utc>) -> Result<Vec<Value>, FetchError> {
        let start = std::time::Instant::now();
        let url = self.settings.api_base.join(SEARCH_PATH).map_err(|e| FetchError::Upstream {
            stage: "search",
            reason: format!("bad search URL: {}", e),
        })?;
        let body = search_request(since);

        debug!("Searching notices - url={}, since={}", url, body.last_updated_date_from);
        let http_err = |source| FetchError::Http { stage: "search", source };
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(http_err)?
            .error_for_status()
            .map_err(http_err)?;
        let page: SearchResponse = resp.json().await.map_err(http_err)?;

        if let Some(total) = page.total_items {
            if total > page.items.len() as u64 {
                warn!(
                    "Search window holds more notices than one page - total={}, returned={}",
                    total,
                    page.items.len()
                );
            }
        }
        info!(
            "Notice search completed - duration={:.2}s, items={}",
            start.elapsed().as_secs_f32(),
            page.items.len()
        );
        Ok(page.items)
    }
}

pub fn window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now - Duration::days(i64::from(days.max(1)))
}

pub fn search_request(since: DateTime<Utc>) -> SearchRequest {
    SearchRequest {
        last_updated_date_from: since.to_rfc3339_opts(SecondsFormat::Millis, true),
        page_size: PAGE_SIZE,
        page_number: 1,
        sort: SearchSort { name: "lastUpdatedDate".into(), order: "desc".into() },
    }
}

/// One fetch run: authenticate, search once, replace the store. Nothing is written on failure.
pub async fn run_fetch(settings: MarketplaceSettings, store: &NoticeStore, days: u32) -> Result<usize, FetchError> {
    let run_start = std::time::Instant::now();
    let now = Utc::now();
    let since = window_start(now, days);
    info!("Fetch run started - window={} to {}, store={}", since, now, store.path().display());

    // No catch-up: a scheduler outage longer than the window leaves a gap. Say so loudly.
    let window = std::time::Duration::from_secs(u64::from(days.max(1)) * 24 * 60 * 60);
    if let Some(age) = store.age() {
        if age > window {
            warn!(
                "Store older than fetch window; notices updated in between may be missed - store_age_hours={}, window_hours={}",
                age.as_secs() / 3600,
                window.as_secs() / 3600
            );
        }
    }

    let client = MarketplaceClient::new(settings)?;
    let token = client.fetch_token().await?;
    let items = client.search_notices(&token, since).await?;

    for item in items.iter().take(5) {
        debug!(
            "Notice - id={}, title={}",
            item.get("id").map(|v| v.to_string()).unwrap_or_default(),
            item.get("title").and_then(|v| v.as_str()).unwrap_or_default()
        );
    }

    store.replace(&items)?;
    info!(
        "Fetch run completed - duration={:.2}s, notices={}",
        run_start.elapsed().as_secs_f32(),
        items.len()
    );
    Ok(items.len())
}

/// Fetch every `period` until `shutdown` resolves. Runs are sequential: a slow fetch delays the
/// next tick instead of overlapping it, and a failed run is retried on the next tick.
pub async fn watch<F>(settings: MarketplaceSettings, store: &NoticeStore, period: std::time::Duration, days: u32, shutdown: F)
where
    F: std::future::Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(shutdown);
    info!("Scheduler started - interval={:?}, window_days={}", period, days);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                info!("Scheduler stopped");
                return;
            }
        }
        match run_fetch(settings.clone(), store, days).await {
            Ok(count) => info!("Scheduled fetch done - notices={}", count),
            Err(e) => error!("Scheduled fetch failed; retrying next tick - error={}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_is_one_day_by_default_and_never_zero() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 6, 0, 0).unwrap();
        assert_eq!(window_start(now, 1), Utc.with_ymd_and_hms(2026, 10, 18, 6, 0, 0).unwrap());
        assert_eq!(window_start(now, 0), window_start(now, 1));
        assert_eq!(window_start(now, 3), Utc.with_ymd_and_hms(2026, 10, 16, 6, 0, 0).unwrap());
    }

    #[test]
    fn search_body_matches_marketplace_contract() {
        let since = Utc.with_ymd_and_hms(2026, 10, 18, 6, 0, 0).unwrap();
        let req = search_request(since);
        assert_eq!(req.last_updated_date_from, "2026-10-18T06:00:00.000Z");
        assert_eq!(req.page_size, 100);
        assert_eq!(req.page_number, 1);
        assert_eq!(req.sort.name, "lastUpdatedDate");
        assert_eq!(req.sort.order, "desc");
    }
}
