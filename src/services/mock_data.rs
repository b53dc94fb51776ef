// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Synthetic WHOOP upstream for local runs and tests.
//!
//! Generates one cycle, recovery and sleep per day plus a workout every other
//! day, ending at a fixed anchor. Values are derived from the day index, so
//! the same anchor always yields the same data. Cursors are plain offsets.

use crate::error::SyncError;
use crate::models::{EntityKind, RawRecord, TokenRefreshResponse, UpstreamPage};
use crate::services::whoop::{PageQuery, UpstreamApi};
use crate::time_utils::format_utc_rfc3339_millis;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

const MOCK_USER_ID: i64 = 10129;
const FIRST_CYCLE_ID: i64 = 90_000;

const SPORTS: [(i64, &str); 4] = [(0, "running"), (1, "cycling"), (44, "yoga"), (63, "walking")];

pub struct MockUpstream {
    anchor: DateTime<Utc>,
    days: u32,
    refreshes: AtomicU64,
}

impl MockUpstream {
    /// `days` days of history ending at `anchor`.
    pub fn new(anchor: DateTime<Utc>, days: u32) -> Self {
        Self {
            anchor,
            days,
            refreshes: AtomicU64::new(0),
        }
    }

    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Every record of `kind`, oldest first.
    pub fn records(&self, kind: EntityKind) -> Vec<RawRecord> {
        (0..self.days)
            .filter_map(|day| self.generate(kind, day))
            .collect()
    }

    fn day_start(&self, day: u32) -> DateTime<Utc> {
        self.anchor - Duration::days(i64::from(self.days - day))
    }

    fn generate(&self, kind: EntityKind, day: u32) -> Option<RawRecord> {
        let base = self.day_start(day);
        let cycle_id = FIRST_CYCLE_ID + i64::from(day);
        let sleep_id = format!("mock-sleep-{:05}", day);
        let sleep_start = base - Duration::hours(1);
        let sleep_end = base + Duration::hours(7) - Duration::minutes(wobble(day, 3, 45) as i64);
        let ts = format_utc_rfc3339_millis;

        let value = match kind {
            EntityKind::Cycle => json!({
                "id": cycle_id,
                "user_id": MOCK_USER_ID,
                "created_at": ts(base + Duration::hours(8)),
                "updated_at": ts(base + Duration::hours(14)),
                "start": ts(sleep_start),
                "end": ts(sleep_start + Duration::days(1)),
                "timezone_offset": "-08:00",
                "score_state": "SCORED",
                "score": {
                    "strain": 6.0 + wobble(day, 1, 120) / 10.0,
                    "kilojoule": 7000.0 + wobble(day, 2, 3000),
                    "average_heart_rate": 60 + wobble(day, 3, 15) as i64,
                    "max_heart_rate": 140 + wobble(day, 4, 40) as i64
                }
            }),
            EntityKind::Recovery => json!({
                "cycle_id": cycle_id,
                "sleep_id": sleep_id,
                "user_id": MOCK_USER_ID,
                "created_at": ts(base + Duration::hours(8)),
                "updated_at": ts(base + Duration::hours(8) + Duration::minutes(5)),
                "score_state": "SCORED",
                "score": {
                    "user_calibrating": day < 4,
                    "recovery_score": 30.0 + wobble(day, 5, 65),
                    "resting_heart_rate": 48.0 + wobble(day, 6, 12),
                    "hrv_rmssd_milli": 35.0 + wobble(day, 7, 60),
                    "spo2_percentage": 94.0 + wobble(day, 8, 5),
                    "skin_temp_celsius": 33.0 + wobble(day, 9, 20) / 10.0
                }
            }),
            EntityKind::Sleep => {
                let in_bed = (sleep_end - sleep_start).num_milliseconds();
                let awake = 20 * 60 * 1000 + (wobble(day, 10, 30) as i64) * 60 * 1000;
                let rem = in_bed / 5;
                let slow_wave = in_bed / 5;
                json!({
                    "id": sleep_id,
                    "user_id": MOCK_USER_ID,
                    "created_at": ts(sleep_end + Duration::minutes(10)),
                    "updated_at": ts(sleep_end + Duration::minutes(30)),
                    "start": ts(sleep_start),
                    "end": ts(sleep_end),
                    "timezone_offset": "-08:00",
                    "nap": false,
                    "score_state": "SCORED",
                    "score": {
                        "stage_summary": {
                            "total_in_bed_time_milli": in_bed,
                            "total_awake_time_milli": awake,
                            "total_light_sleep_time_milli": in_bed - awake - rem - slow_wave,
                            "total_slow_wave_sleep_time_milli": slow_wave,
                            "total_rem_sleep_time_milli": rem,
                            "disturbance_count": 5 + wobble(day, 11, 10) as i64
                        },
                        "respiratory_rate": 14.0 + wobble(day, 12, 30) / 10.0,
                        "sleep_performance_percentage": 70.0 + wobble(day, 13, 30),
                        "sleep_consistency_percentage": 60.0 + wobble(day, 14, 35),
                        "sleep_efficiency_percentage": 85.0 + wobble(day, 15, 14)
                    }
                })
            }
            EntityKind::Workout => {
                if day % 2 != 0 {
                    return None;
                }
                let (sport_id, sport_name) = SPORTS[(day as usize / 2) % SPORTS.len()];
                let start = base + Duration::hours(9);
                let end = start + Duration::minutes(30 + wobble(day, 16, 60) as i64);
                json!({
                    "id": format!("mock-workout-{:05}", day),
                    "user_id": MOCK_USER_ID,
                    "created_at": ts(end + Duration::minutes(2)),
                    "updated_at": ts(end + Duration::minutes(20)),
                    "start": ts(start),
                    "end": ts(end),
                    "timezone_offset": "-08:00",
                    "sport_id": sport_id,
                    "sport_name": sport_name,
                    "score_state": "SCORED",
                    "score": {
                        "strain": 8.0 + wobble(day, 17, 80) / 10.0,
                        "average_heart_rate": 120 + wobble(day, 18, 30) as i64,
                        "max_heart_rate": 160 + wobble(day, 19, 25) as i64,
                        "kilojoule": 900.0 + wobble(day, 20, 1200),
                        "percent_recorded": 100.0,
                        "distance_meter": 3000.0 + wobble(day, 21, 9000),
                        "altitude_gain_meter": wobble(day, 22, 300),
                        "altitude_change_meter": 0.0
                    }
                })
            }
        };

        Some(value)
    }
}

/// Deterministic pseudo-random value in `0..range` for a day and field.
fn wobble(day: u32, salt: u32, range: u32) -> f64 {
    let mut x = u64::from(day)
        .wrapping_mul(0x9E37_79B9)
        .wrapping_add(u64::from(salt).wrapping_mul(0x85EB_CA6B))
        .wrapping_add(1);
    x ^= x >> 13;
    x = x.wrapping_mul(0xC2B2_AE35);
    x ^= x >> 16;
    (x % u64::from(range.max(1))) as f64
}

fn updated_at(record: &RawRecord) -> Option<DateTime<Utc>> {
    record
        .get("updated_at")
        .and_then(Value::as_str)
        .and_then(crate::time_utils::parse_utc)
}

#[async_trait]
impl UpstreamApi for MockUpstream {
    async fn get_page(
        &self,
        access_token: &str,
        path: &str,
        query: &PageQuery,
    ) -> Result<UpstreamPage, SyncError> {
        if access_token.is_empty() {
            return Err(SyncError::UpstreamAuth {
                status: 401,
                message: "missing bearer token".to_string(),
            });
        }

        let kind = EntityKind::ALL
            .into_iter()
            .find(|k| k.path() == path)
            .ok_or_else(|| SyncError::UpstreamRejected {
                status: 404,
                message: format!("unknown collection {}", path),
            })?;

        let offset = match &query.next_token {
            Some(token) => token.parse::<usize>().map_err(|_| SyncError::UpstreamRejected {
                status: 400,
                message: format!("invalid nextToken {}", token),
            })?,
            None => 0,
        };

        let matching: Vec<RawRecord> = self
            .records(kind)
            .into_iter()
            .filter(|r| match (query.start, updated_at(r)) {
                (Some(start), Some(updated)) => updated >= start,
                _ => true,
            })
            .collect();

        let limit = query.limit.max(1) as usize;
        let end = (offset + limit).min(matching.len());
        let records = matching
            .get(offset..end)
            .map(<[RawRecord]>::to_vec)
            .unwrap_or_default();
        let next_token = (end < matching.len()).then(|| end.to_string());

        tracing::debug!(%kind, offset, returned = records.len(), "Mock page served");
        Ok(UpstreamPage {
            records,
            next_token,
        })
    }

    async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, SyncError> {
        if refresh_token.is_empty() {
            return Err(SyncError::RefreshFailed("empty refresh token".to_string()));
        }
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TokenRefreshResponse {
            access_token: format!("mock-access-{}", n),
            refresh_token: Some(format!("mock-refresh-{}", n)),
            expires_in: 3600,
            scope: Some("offline read:recovery read:cycles read:sleep read:workout".to_string()),
            token_type: Some("bearer".to_string()),
        })
    }
}
