//! Optional backend threat feed.
//!
//! A worker thread polls `GET {base}/api/threats` with a bounded retry and
//! hands results to the render loop over a channel. The map never depends
//! on it; an unreachable backend only shows up as a waiting state.

use crate::config::FeedConfig;
use crate::error::MapError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const THREATS_PATH: &str = "/api/threats";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Level for a backend `threat_score` in `[0, 1]`
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            RiskLevel::High
        } else if score >= 0.5 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// One row of `/api/threats`.
///
/// The backend sends access-log rows (`threat_score`, `is_threat`, login and
/// transaction figures); an explicit `risk_level` is honoured when present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Threat {
    pub id: u64,
    pub ip_address: String,
    pub country: String,
    /// ISO 8601, as sent by the backend
    pub timestamp: String,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub threat_score: Option<f64>,
    #[serde(default)]
    pub is_threat: Option<bool>,
    #[serde(default)]
    pub login_attempts: Option<u32>,
    #[serde(default)]
    pub transaction_value: Option<f64>,
    #[serde(default)]
    pub description: String,
}

impl Threat {
    /// Explicit level, else derived from the score, else from the threat flag
    pub fn level(&self) -> RiskLevel {
        match (self.risk_level, self.threat_score, self.is_threat) {
            (Some(level), _, _) => level,
            (None, Some(score), _) => RiskLevel::from_score(score),
            (None, None, Some(true)) => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

/// Fixed-delay retry for idempotent reads
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Run `op` until it succeeds or the retries run out.
    ///
    /// `op` receives the zero-based attempt number; the last error is
    /// returned.
    pub fn run<T, E: Display>(&self, mut op: impl FnMut(u32) -> Result<T, E>) -> Result<T, E> {
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    debug!(attempt, max = self.max_retries, error = %e, "retrying");
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl From<&FeedConfig> for RetryPolicy {
    fn from(config: &FeedConfig) -> Self {
        Self::new(config.max_retries, Duration::from_millis(config.retry_delay_ms))
    }
}

/// Blocking JSON client for the dashboard backend
#[derive(Clone)]
pub struct ApiClient {
    agent: ureq::Agent,
    base_url: String,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(config: &FeedConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build();
        Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::from(config),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path` and decode the JSON body, retrying per the policy
    pub fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, MapError> {
        let url = self.url(path);
        self.retry.run(|_| {
            let response = self.agent.get(&url).call().map_err(|e| MapError::Fetch {
                url: url.clone(),
                source: Box::new(e),
            })?;
            Ok(serde_json::from_reader(response.into_reader())?)
        })
    }

    pub fn threats(&self) -> Result<Vec<Threat>, MapError> {
        self.get_json(THREATS_PATH)
    }
}

/// Message from the polling thread
#[derive(Clone, Debug, PartialEq)]
pub enum FeedUpdate {
    Threats(Vec<Threat>),
    Unavailable(String),
}

/// Counts shown in the stat cards
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedSummary {
    pub total: usize,
    pub high: usize,
    pub latest: Option<Threat>,
}

impl FeedSummary {
    pub fn from_threats(threats: &[Threat]) -> Self {
        Self {
            total: threats.len(),
            high: threats.iter().filter(|t| t.level() == RiskLevel::High).count(),
            latest: threats.iter().max_by(|a, b| a.timestamp.cmp(&b.timestamp)).cloned(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum FeedStatus {
    #[default]
    Waiting,
    Live(FeedSummary),
    /// Last poll failed; the previous summary is kept if there was one
    Unavailable {
        reason: String,
        last: Option<FeedSummary>,
    },
}

/// Handle to the polling thread; stops it when dropped
pub struct ThreatFeed {
    rx: Receiver<FeedUpdate>,
    stop: Arc<AtomicBool>,
    status: FeedStatus,
}

impl ThreatFeed {
    pub fn spawn(config: FeedConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let client = ApiClient::new(&config);
        let period = Duration::from_millis(config.poll_interval_ms.max(100));

        info!(url = %client.url(THREATS_PATH), ?period, "threat feed started");
        thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                let update = match client.threats() {
                    Ok(threats) => FeedUpdate::Threats(threats),
                    Err(e) => {
                        warn!(error = %e, "threat feed unavailable");
                        FeedUpdate::Unavailable(e.to_string())
                    }
                };
                if tx.send(update).is_err() {
                    break;
                }
                let started = Instant::now();
                while started.elapsed() < period && !stop_flag.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(50));
                }
            }
            debug!("threat feed stopped");
        });

        Self {
            rx,
            stop,
            status: FeedStatus::Waiting,
        }
    }

    #[cfg(test)]
    fn from_receiver(rx: Receiver<FeedUpdate>) -> Self {
        Self {
            rx,
            stop: Arc::new(AtomicBool::new(false)),
            status: FeedStatus::Waiting,
        }
    }

    pub fn status(&self) -> &FeedStatus {
        &self.status
    }

    /// Drain pending updates without blocking; true when the status changed
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.rx.try_recv() {
                Ok(update) => {
                    self.apply(update);
                    changed = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if matches!(self.status, FeedStatus::Waiting) {
                        self.apply(FeedUpdate::Unavailable("feed stopped".into()));
                        changed = true;
                    }
                    break;
                }
            }
        }
        changed
    }

    fn apply(&mut self, update: FeedUpdate) {
        self.status = match update {
            FeedUpdate::Threats(threats) => FeedStatus::Live(FeedSummary::from_threats(&threats)),
            FeedUpdate::Unavailable(reason) => {
                let last = match std::mem::take(&mut self.status) {
                    FeedStatus::Live(summary) => Some(summary),
                    FeedStatus::Unavailable { last, .. } => last,
                    FeedStatus::Waiting => None,
                };
                FeedStatus::Unavailable { reason, last }
            }
        };
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for ThreatFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threat(id: u64, level: RiskLevel, ts: &str) -> Threat {
        Threat {
            id,
            ip_address: format!("10.0.0.{id}"),
            country: "BR".into(),
            timestamp: ts.into(),
            risk_level: Some(level),
            ..Threat::default()
        }
    }

    #[test]
    fn test_threat_json() {
        let json = r#"[{"id": 7, "ip_address": "1.2.3.4", "country": "US",
            "timestamp": "2024-05-01T10:00:00", "risk_level": "high",
            "description": "port scan"}]"#;
        let threats: Vec<Threat> = serde_json::from_str(json).unwrap();
        assert_eq!(threats[0].level(), RiskLevel::High);
        assert_eq!(threats[0].description, "port scan");
    }

    #[test]
    fn test_access_log_rows_decode() {
        let json = r#"[
            {"id": 1, "ip_address": "5.6.7.8", "country": "RU", "login_attempts": 12,
             "transaction_value": null, "timestamp": "2024-05-01T10:00:00",
             "is_threat": true, "threat_score": 0.91},
            {"id": 2, "ip_address": "9.9.9.9", "country": "CN", "login_attempts": 3,
             "transaction_value": 250.5, "timestamp": "2024-05-01T11:00:00",
             "is_threat": true, "threat_score": 0.62},
            {"id": 3, "ip_address": "1.1.1.1", "country": "US", "login_attempts": 1,
             "transaction_value": 10.0, "timestamp": "2024-05-01T09:00:00",
             "is_threat": false, "threat_score": 0.1}
        ]"#;
        let threats: Vec<Threat> = serde_json::from_str(json).unwrap();
        assert_eq!(threats[0].risk_level, None);
        assert_eq!(threats[0].login_attempts, Some(12));
        assert_eq!(threats[0].transaction_value, None);
        assert_eq!(threats[1].transaction_value, Some(250.5));
        let levels: Vec<_> = threats.iter().map(Threat::level).collect();
        assert_eq!(levels, [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low]);

        let summary = FeedSummary::from_threats(&threats);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.latest.map(|t| t.id), Some(2));
    }

    #[test]
    fn test_level_fallbacks() {
        let flagged = Threat { is_threat: Some(true), ..Threat::default() };
        assert_eq!(flagged.level(), RiskLevel::Medium);
        assert_eq!(Threat::default().level(), RiskLevel::Low);
        let explicit = Threat {
            risk_level: Some(RiskLevel::Low),
            threat_score: Some(0.95),
            ..Threat::default()
        };
        assert_eq!(explicit.level(), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.8), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.5), RiskLevel::Medium);
    }

    #[test]
    fn test_summary() {
        let summary = FeedSummary::from_threats(&[
            threat(1, RiskLevel::High, "2024-05-01T10:00:00"),
            threat(2, RiskLevel::Low, "2024-05-02T10:00:00"),
            threat(3, RiskLevel::High, "2024-04-30T10:00:00"),
        ]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.high, 2);
        assert_eq!(summary.latest.map(|t| t.id), Some(2));
        assert_eq!(FeedSummary::from_threats(&[]).latest, None);
    }

    #[test]
    fn test_retry_gives_up_after_limit() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut calls = 0;
        let result: Result<(), String> = policy.run(|_| {
            calls += 1;
            Err("refused".to_string())
        });
        assert_eq!(result, Err("refused".to_string()));
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_retry_recovers() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let result: Result<u32, String> =
            policy.run(|attempt| if attempt < 2 { Err(format!("attempt {attempt}")) } else { Ok(attempt) });
        assert_eq!(result, Ok(2));
    }

    #[test]
    fn test_poll_keeps_last_summary() {
        let (tx, rx) = mpsc::channel();
        let mut feed = ThreatFeed::from_receiver(rx);
        assert!(!feed.poll());
        assert_eq!(feed.status(), &FeedStatus::Waiting);

        tx.send(FeedUpdate::Threats(vec![threat(1, RiskLevel::Medium, "t")])).unwrap();
        assert!(feed.poll());
        assert!(matches!(feed.status(), FeedStatus::Live(s) if s.total == 1));

        tx.send(FeedUpdate::Unavailable("timeout".into())).unwrap();
        assert!(feed.poll());
        match feed.status() {
            FeedStatus::Unavailable { reason, last } => {
                assert_eq!(reason, "timeout");
                assert_eq!(last.as_ref().map(|s| s.total), Some(1));
            }
            other => panic!("unexpected {other:?}"),
        }

        drop(tx);
        assert!(!feed.poll());
    }

    #[test]
    fn test_unreachable_backend_reports_fetch_error() {
        let client = ApiClient::new(&FeedConfig {
            base_url: "http://127.0.0.1:1/".into(),
            timeout_ms: 200,
            max_retries: 0,
            ..FeedConfig::default()
        });
        assert_eq!(client.url(THREATS_PATH), "http://127.0.0.1:1/api/threats");
        assert!(matches!(client.threats(), Err(MapError::Fetch { .. })));
    }
}
