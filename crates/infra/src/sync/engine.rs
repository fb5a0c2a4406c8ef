//! Bidirectional sync engine.
//!
//! Moves three data categories between the local store and the remote
//! backend: canonical request records, daily analytics rows and
//! configuration entries. One pass uploads local changes then downloads
//! remote ones, category by category, in a fixed order.
//!
//! Concurrency contract: at most one pass runs at a time, enforced with an
//! atomic flag cleared by a drop guard. Fast-fail conditions (already
//! syncing, not authenticated) return before any network traffic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use netlens_core::{CanonicalRecordStore, KeyValueStore, StatsStore};
use netlens_domain::constants::{
    DEFAULT_SYNC_BATCH_SIZE, KV_CONFIG_PREFIX, KV_LAST_SYNC_TIMESTAMP,
};
use netlens_domain::{CanonicalRecord, CategoryError, DailyAnalytics, SyncCategory, SyncReport};

use crate::api::types::{ConfigEntry, UploadRequest};
use crate::api::{ApiClient, AuthService};

use super::errors::SyncError;

/// Configuration for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncEngineConfig {
    /// Maximum rows uploaded or downloaded per category per pass
    pub batch_size: usize,
}

impl Default for SyncEngineConfig {
    fn default() -> Self {
        Self { batch_size: DEFAULT_SYNC_BATCH_SIZE }
    }
}

/// Clears the in-progress flag when a pass ends, normally or by early return.
struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SyncEngine {
    api: Arc<ApiClient>,
    auth: Arc<AuthService>,
    records: Arc<dyn CanonicalRecordStore>,
    stats: Arc<dyn StatsStore>,
    kv: Arc<dyn KeyValueStore>,
    syncing: AtomicBool,
    batch_size: usize,
}

impl SyncEngine {
    pub fn new(
        api: Arc<ApiClient>,
        auth: Arc<AuthService>,
        records: Arc<dyn CanonicalRecordStore>,
        stats: Arc<dyn StatsStore>,
        kv: Arc<dyn KeyValueStore>,
        config: SyncEngineConfig,
    ) -> Self {
        Self {
            api,
            auth,
            records,
            stats,
            kv,
            syncing: AtomicBool::new(false),
            batch_size: config.batch_size,
        }
    }

    /// Whether a pass is currently running.
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    /// Run one full sync pass.
    ///
    /// Categories run sequentially in the order of [`SyncCategory::ALL`];
    /// within a category, upload strictly precedes download. A failing
    /// category is recorded in the report and the pass continues with the
    /// next one. Once every category has been attempted the cursor advances,
    /// errors or not; only fast-fail returns leave it untouched.
    #[instrument(skip(self))]
    pub async fn sync_all(&self) -> Result<SyncReport, SyncError> {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("sync already in progress, skipping");
            return Err(SyncError::SyncInProgress);
        }
        let _guard = SyncGuard(&self.syncing);

        if !self.auth.is_authenticated().await {
            return Err(SyncError::NotAuthenticated);
        }
        let team_id = self.auth.team_id().await.ok_or(SyncError::NotAuthenticated)?;

        let since = self.load_cursor().await?;
        let now = Utc::now().timestamp_millis();
        info!(since, "starting sync pass");

        let mut report = SyncReport::default();
        for category in SyncCategory::ALL {
            match self.sync_category(category, since, now, &team_id).await {
                Ok((uploaded, downloaded)) => {
                    debug!(category = category.as_str(), uploaded, downloaded, "category synced");
                    report.uploaded += uploaded;
                    report.downloaded += downloaded;
                }
                Err(e) => {
                    warn!(category = category.as_str(), error = %e, "category failed");
                    report
                        .errors
                        .push(CategoryError { category, message: e.to_string() });
                }
            }
        }

        // Every category was attempted, so the window up to `now` is settled;
        // the cursor advances even when some categories recorded errors.
        let next = since.max(now);
        self.kv.set(KV_LAST_SYNC_TIMESTAMP, &next.to_string()).await?;
        if report.is_clean() {
            info!(
                uploaded = report.uploaded,
                downloaded = report.downloaded,
                cursor = next,
                "sync pass complete"
            );
        } else {
            warn!(
                errors = report.errors.len(),
                cursor = next,
                "sync pass finished with category errors"
            );
        }

        Ok(report)
    }

    async fn load_cursor(&self) -> Result<i64, SyncError> {
        let raw = self.kv.get(KV_LAST_SYNC_TIMESTAMP).await?;
        Ok(raw.and_then(|v| v.parse::<i64>().ok()).unwrap_or(0))
    }

    async fn sync_category(
        &self,
        category: SyncCategory,
        since: i64,
        now: i64,
        team_id: &str,
    ) -> Result<(u64, u64), SyncError> {
        match category {
            SyncCategory::Requests => self.sync_requests(since, now, team_id).await,
            SyncCategory::Analytics => self.sync_analytics(since, now, team_id).await,
            SyncCategory::Configuration => self.sync_configuration(since, now, team_id).await,
        }
    }

    /// Request records: local rows are authoritative, downloads merge by
    /// existence check.
    async fn sync_requests(
        &self,
        since: i64,
        now: i64,
        team_id: &str,
    ) -> Result<(u64, u64), SyncError> {
        let pending = self.records.find_created_after(since, self.batch_size).await?;
        let uploaded = self
            .upload_batch(SyncCategory::Requests, &pending, since, now, team_id)
            .await?;

        let response = self
            .api
            .download(SyncCategory::Requests.as_str(), team_id, since, self.batch_size)
            .await?;

        let mut downloaded = 0u64;
        for item in response.items {
            let record: CanonicalRecord = match serde_json::from_value(item) {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "skipping malformed remote request record");
                    continue;
                }
            };
            if self.records.insert_if_absent(&record).await? {
                downloaded += 1;
            }
        }
        Ok((uploaded, downloaded))
    }

    /// Daily analytics: remote rows are authoritative, downloads replace.
    async fn sync_analytics(
        &self,
        since: i64,
        now: i64,
        team_id: &str,
    ) -> Result<(u64, u64), SyncError> {
        let pending = self.stats.daily_created_after(since, self.batch_size).await?;
        let uploaded = self
            .upload_batch(SyncCategory::Analytics, &pending, since, now, team_id)
            .await?;

        let response = self
            .api
            .download(SyncCategory::Analytics.as_str(), team_id, since, self.batch_size)
            .await?;

        let mut downloaded = 0u64;
        for item in response.items {
            let row: DailyAnalytics = match serde_json::from_value(item) {
                Ok(row) => row,
                Err(e) => {
                    warn!(error = %e, "skipping malformed remote analytics row");
                    continue;
                }
            };
            self.stats.upsert_daily(&row).await?;
            downloaded += 1;
        }
        Ok((uploaded, downloaded))
    }

    /// Configuration entries: merged by existence check in both directions.
    async fn sync_configuration(
        &self,
        since: i64,
        now: i64,
        team_id: &str,
    ) -> Result<(u64, u64), SyncError> {
        let entries: Vec<ConfigEntry> = self
            .kv
            .list_prefix(KV_CONFIG_PREFIX)
            .await?
            .into_iter()
            .map(|(key, value)| ConfigEntry { key, value })
            .collect();
        let uploaded = self
            .upload_batch(SyncCategory::Configuration, &entries, since, now, team_id)
            .await?;

        let response = self
            .api
            .download(SyncCategory::Configuration.as_str(), team_id, since, self.batch_size)
            .await?;

        let mut downloaded = 0u64;
        for item in response.items {
            let entry: ConfigEntry = match serde_json::from_value(item) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping malformed remote config entry");
                    continue;
                }
            };
            if !entry.key.starts_with(KV_CONFIG_PREFIX) {
                warn!(key = %entry.key, "ignoring remote config entry outside the config namespace");
                continue;
            }
            if self.kv.get(&entry.key).await?.is_none() {
                self.kv.set(&entry.key, &entry.value).await?;
                downloaded += 1;
            }
        }
        Ok((uploaded, downloaded))
    }

    /// Serialize and upload one category batch; empty batches skip the call.
    async fn upload_batch<T: serde::Serialize>(
        &self,
        category: SyncCategory,
        rows: &[T],
        since: i64,
        now: i64,
        team_id: &str,
    ) -> Result<u64, SyncError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let data = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                SyncError::Storage(netlens_domain::NetLensError::Internal(format!(
                    "failed to serialize upload batch: {e}"
                )))
            })?;
        let request = UploadRequest {
            data_type: category.as_str().to_string(),
            team_id: team_id.to_string(),
            data,
            merge: true,
            last_sync_timestamp: since,
            timestamp: now,
        };
        self.api.upload(&request).await?;
        Ok(rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use netlens_domain::{
        DomainStat, HourlyStat, RecordFilter, ResourceStat, Result as DomainResult, StatDelta,
    };

    use crate::api::http::{HttpApi, HttpApiConfig};
    use super::*;

    struct MockKv {
        entries: StdMutex<HashMap<String, String>>,
    }

    impl MockKv {
        fn new() -> Arc<Self> {
            Arc::new(Self { entries: StdMutex::new(HashMap::new()) })
        }
    }

    #[async_trait]
    impl KeyValueStore for MockKv {
        async fn get(&self, key: &str) -> DomainResult<Option<String>> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }
        async fn set(&self, key: &str, value: &str) -> DomainResult<()> {
            self.entries.lock().unwrap().insert(key.into(), value.into());
            Ok(())
        }
        async fn delete(&self, key: &str) -> DomainResult<()> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }
        async fn list_prefix(&self, prefix: &str) -> DomainResult<Vec<(String, String)>> {
            let mut out: Vec<_> = self
                .entries
                .lock()
                .unwrap()
                .iter()
                .filter(|(k, _)| k.starts_with(prefix))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            out.sort();
            Ok(out)
        }
    }

    #[derive(Default)]
    struct MockRecordStore {
        rows: StdMutex<HashMap<String, CanonicalRecord>>,
    }

    #[async_trait]
    impl CanonicalRecordStore for MockRecordStore {
        async fn upsert(
            &self,
            record: &CanonicalRecord,
        ) -> DomainResult<netlens_core::UpsertOutcome> {
            self.rows.lock().unwrap().insert(record.id.clone(), record.clone());
            Ok(netlens_core::UpsertOutcome::Inserted)
        }
        async fn get(&self, id: &str) -> DomainResult<Option<CanonicalRecord>> {
            Ok(self.rows.lock().unwrap().get(id).cloned())
        }
        async fn insert_if_absent(&self, record: &CanonicalRecord) -> DomainResult<bool> {
            let mut rows = self.rows.lock().unwrap();
            if rows.contains_key(&record.id) {
                return Ok(false);
            }
            rows.insert(record.id.clone(), record.clone());
            Ok(true)
        }
        async fn find_by_date(&self, _date: NaiveDate) -> DomainResult<Vec<CanonicalRecord>> {
            Ok(Vec::new())
        }
        async fn find_created_after(
            &self,
            created_after: i64,
            limit: usize,
        ) -> DomainResult<Vec<CanonicalRecord>> {
            let mut out: Vec<_> = self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.created_at > created_after)
                .cloned()
                .collect();
            out.sort_by_key(|r| r.created_at);
            out.truncate(limit);
            Ok(out)
        }
        async fn query(&self, _filter: &RecordFilter) -> DomainResult<Vec<CanonicalRecord>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct MockStatsStore {
        dailies: StdMutex<HashMap<NaiveDate, DailyAnalytics>>,
    }

    #[async_trait]
    impl StatsStore for MockStatsStore {
        async fn apply_delta(&self, _delta: &StatDelta) -> DomainResult<()> {
            Ok(())
        }
        async fn upsert_daily(&self, row: &DailyAnalytics) -> DomainResult<()> {
            self.dailies.lock().unwrap().insert(row.date, row.clone());
            Ok(())
        }
        async fn daily_created_after(
            &self,
            created_after: i64,
            limit: usize,
        ) -> DomainResult<Vec<DailyAnalytics>> {
            let mut out: Vec<_> = self
                .dailies
                .lock()
                .unwrap()
                .values()
                .filter(|d| d.created_at > created_after)
                .cloned()
                .collect();
            out.sort_by_key(|d| d.created_at);
            out.truncate(limit);
            Ok(out)
        }
        async fn get_daily(&self, date: NaiveDate) -> DomainResult<Option<DailyAnalytics>> {
            Ok(self.dailies.lock().unwrap().get(&date).cloned())
        }
        async fn domain_stats(&self) -> DomainResult<Vec<DomainStat>> {
            Ok(Vec::new())
        }
        async fn resource_stats(&self) -> DomainResult<Vec<ResourceStat>> {
            Ok(Vec::new())
        }
        async fn hourly_stats(&self, _start: i64, _end: i64) -> DomainResult<Vec<HourlyStat>> {
            Ok(Vec::new())
        }
    }

    struct Harness {
        engine: Arc<SyncEngine>,
        records: Arc<MockRecordStore>,
        stats: Arc<MockStatsStore>,
        kv: Arc<MockKv>,
    }

    async fn harness(server: &MockServer) -> Harness {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "access-1",
                "refreshToken": "refresh-1",
                "user": {"id": "u1", "teamId": "team1"}
            })))
            .mount(server)
            .await;

        let http = Arc::new(
            HttpApi::new(HttpApiConfig { base_url: server.uri(), ..Default::default() })
                .unwrap(),
        );
        let kv = MockKv::new();
        let auth = Arc::new(AuthService::new(http.clone(), kv.clone()));
        auth.login("a@b.c", "pw").await.unwrap();

        let api = Arc::new(ApiClient::new(http, auth.clone()));
        let records = Arc::new(MockRecordStore::default());
        let stats = Arc::new(MockStatsStore::default());
        let engine = Arc::new(SyncEngine::new(
            api,
            auth,
            records.clone(),
            stats.clone(),
            kv.clone(),
            SyncEngineConfig::default(),
        ));
        Harness { engine, records, stats, kv }
    }

    fn record(id: &str, created_at: i64) -> CanonicalRecord {
        CanonicalRecord {
            id: id.into(),
            url: "https://a.com/x".into(),
            method: "GET".into(),
            domain: "a.com".into(),
            page_url: None,
            resource_type: "xhr".into(),
            status: 200,
            duration_ms: 100,
            size_bytes: 2048,
            from_cache: false,
            timestamp: created_at,
            created_at,
            updated_at: created_at,
        }
    }

    fn empty_download() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({"items": [], "timestamp": 0}))
    }

    fn upload_ok() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({"syncId": "s1", "timestamp": 0}))
    }

    async fn mount_quiet_backend(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/sync/upload"))
            .respond_with(upload_ok())
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sync/download"))
            .respond_with(empty_download())
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn unauthenticated_sync_fails_fast() {
        let server = MockServer::start().await;

        let http = Arc::new(
            HttpApi::new(HttpApiConfig { base_url: server.uri(), ..Default::default() })
                .unwrap(),
        );
        let kv = MockKv::new();
        let auth = Arc::new(AuthService::new(http.clone(), kv.clone()));
        let api = Arc::new(ApiClient::new(http, auth.clone()));
        let engine = SyncEngine::new(
            api,
            auth,
            Arc::new(MockRecordStore::default()),
            Arc::new(MockStatsStore::default()),
            kv.clone(),
            SyncEngineConfig::default(),
        );

        let err = engine.sync_all().await.unwrap_err();
        assert!(matches!(err, SyncError::NotAuthenticated));
        // No cursor written, no network traffic attempted.
        assert_eq!(kv.get(KV_LAST_SYNC_TIMESTAMP).await.unwrap(), None);
    }

    #[tokio::test]
    async fn concurrent_sync_is_rejected_without_network_calls() {
        let server = MockServer::start().await;
        let h = harness(&server).await;

        Mock::given(method("GET"))
            .and(path("/sync/download"))
            .respond_with(empty_download().set_delay(Duration::from_millis(300)))
            .mount(&server)
            .await;

        let first = {
            let engine = h.engine.clone();
            tokio::spawn(async move { engine.sync_all().await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let second = h.engine.sync_all().await;
        assert!(matches!(second.unwrap_err(), SyncError::SyncInProgress));

        let report = first.await.unwrap().unwrap();
        assert!(report.is_clean());
        assert!(!h.engine.is_syncing());
    }

    #[tokio::test]
    async fn uploads_pending_rows_and_advances_cursor() {
        let server = MockServer::start().await;
        let h = harness(&server).await;

        h.records.upsert(&record("r1", 100)).await.unwrap();

        Mock::given(method("POST"))
            .and(path("/sync/upload"))
            .and(body_partial_json(json!({
                "dataType": "requests",
                "teamId": "team1",
                "merge": true,
                "lastSyncTimestamp": 0
            })))
            .respond_with(upload_ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sync/download"))
            .respond_with(empty_download())
            .mount(&server)
            .await;

        let before = Utc::now().timestamp_millis();
        let report = h.engine.sync_all().await.unwrap();

        assert!(report.is_clean());
        assert_eq!(report.uploaded, 1);
        let cursor: i64 =
            h.kv.get(KV_LAST_SYNC_TIMESTAMP).await.unwrap().unwrap().parse().unwrap();
        assert!(cursor >= before);
    }

    #[tokio::test]
    async fn downloaded_requests_never_overwrite_local_rows() {
        let server = MockServer::start().await;
        let h = harness(&server).await;

        let local = record("r1", 100);
        h.records.upsert(&local).await.unwrap();
        // Push the cursor past the local row so nothing uploads.
        h.kv.set(KV_LAST_SYNC_TIMESTAMP, "200").await.unwrap();

        let mut remote_conflict = serde_json::to_value(record("r1", 100)).unwrap();
        remote_conflict["domain"] = json!("remote.example");
        let remote_new = serde_json::to_value(record("r2", 150)).unwrap();

        Mock::given(method("GET"))
            .and(path("/sync/download"))
            .and(query_param("dataType", "requests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [remote_conflict, remote_new],
                "timestamp": 0
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sync/download"))
            .respond_with(empty_download())
            .mount(&server)
            .await;

        let report = h.engine.sync_all().await.unwrap();

        assert!(report.is_clean());
        assert_eq!(report.downloaded, 1);
        assert_eq!(h.records.get("r1").await.unwrap().unwrap().domain, "a.com");
        assert!(h.records.get("r2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn downloaded_analytics_overwrite_local_rows() {
        let server = MockServer::start().await;
        let h = harness(&server).await;
        h.kv.set(KV_LAST_SYNC_TIMESTAMP, "1000").await.unwrap();

        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        h.stats
            .upsert_daily(&DailyAnalytics {
                date,
                total_requests: 5,
                total_bytes: 500,
                avg_duration_ms: 10.0,
                error_rate: 0.0,
                unique_domains: 1,
                created_at: 900,
            })
            .await
            .unwrap();

        Mock::given(method("GET"))
            .and(path("/sync/download"))
            .and(query_param("dataType", "analytics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "date": "2026-03-10",
                    "totalRequests": 50,
                    "totalBytes": 5000,
                    "avgDurationMs": 12.5,
                    "errorRate": 0.1,
                    "uniqueDomains": 3,
                    "createdAt": 1500
                }],
                "timestamp": 0
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sync/download"))
            .respond_with(empty_download())
            .mount(&server)
            .await;

        let report = h.engine.sync_all().await.unwrap();

        assert!(report.is_clean());
        let stored = h.stats.get_daily(date).await.unwrap().unwrap();
        assert_eq!(stored.total_requests, 50);
        assert_eq!(stored.created_at, 1500);
    }

    #[tokio::test]
    async fn configuration_merges_by_existence_check() {
        let server = MockServer::start().await;
        let h = harness(&server).await;
        h.kv.set("config.theme", "dark").await.unwrap();

        Mock::given(method("POST"))
            .and(path("/sync/upload"))
            .and(body_partial_json(json!({"dataType": "configuration"})))
            .respond_with(upload_ok())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sync/download"))
            .and(query_param("dataType", "configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"key": "config.theme", "value": "light"},
                    {"key": "config.alerts", "value": "on"}
                ],
                "timestamp": 0
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sync/download"))
            .respond_with(empty_download())
            .mount(&server)
            .await;

        let report = h.engine.sync_all().await.unwrap();

        assert!(report.is_clean());
        // Existing key wins locally; missing key is adopted.
        assert_eq!(h.kv.get("config.theme").await.unwrap(), Some("dark".into()));
        assert_eq!(h.kv.get("config.alerts").await.unwrap(), Some("on".into()));
    }

    #[tokio::test]
    async fn a_failing_category_does_not_stop_the_others_or_freeze_the_cursor() {
        let server = MockServer::start().await;
        let h = harness(&server).await;
        let before = Utc::now().timestamp_millis();

        Mock::given(method("GET"))
            .and(path("/sync/download"))
            .and(query_param("dataType", "analytics"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sync/download"))
            .and(query_param("dataType", "requests"))
            .respond_with(empty_download())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sync/download"))
            .and(query_param("dataType", "configuration"))
            .respond_with(empty_download())
            .expect(1)
            .mount(&server)
            .await;

        let report = h.engine.sync_all().await.unwrap();

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].category, SyncCategory::Analytics);
        // All three categories were attempted, so the cursor still advances.
        let cursor: i64 =
            h.kv.get(KV_LAST_SYNC_TIMESTAMP).await.unwrap().unwrap().parse().unwrap();
        assert!(cursor >= before);
    }

    #[tokio::test]
    async fn cursor_never_moves_backwards() {
        let server = MockServer::start().await;
        let h = harness(&server).await;
        mount_quiet_backend(&server).await;

        let future = Utc::now().timestamp_millis() + 60_000;
        h.kv.set(KV_LAST_SYNC_TIMESTAMP, &future.to_string()).await.unwrap();

        let report = h.engine.sync_all().await.unwrap();
        assert!(report.is_clean());

        let cursor: i64 =
            h.kv.get(KV_LAST_SYNC_TIMESTAMP).await.unwrap().unwrap().parse().unwrap();
        assert_eq!(cursor, future);
    }
}
