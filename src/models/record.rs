// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed WHOOP records as stored locally.
//!
//! Identity types follow WHOOP: cycles and recoveries are keyed by a numeric
//! cycle ID, sleeps and workouts by a UUID string. They are kept distinct on
//! purpose so an upstream change shows up as a mapping failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The entity kinds pulled from WHOOP, in sync order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Cycle,
    Recovery,
    Sleep,
    Workout,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Cycle,
        EntityKind::Recovery,
        EntityKind::Sleep,
        EntityKind::Workout,
    ];

    /// Collection path relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            EntityKind::Cycle => "/v1/cycle",
            EntityKind::Recovery => "/v1/recovery",
            EntityKind::Sleep => "/v1/activity/sleep",
            EntityKind::Workout => "/v1/activity/workout",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Cycle => "cycle",
            EntityKind::Recovery => "recovery",
            EntityKind::Sleep => "sleep",
            EntityKind::Workout => "workout",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream-assigned identity of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Numeric(id) => write!(f, "{}", id),
            RecordId::Text(id) => f.write_str(id),
        }
    }
}

/// Scoring status reported by WHOOP for every scored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreState {
    Scored,
    PendingScore,
    Unscorable,
}

impl ScoreState {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SCORED" => Some(ScoreState::Scored),
            "PENDING_SCORE" => Some(ScoreState::PendingScore),
            "UNSCORABLE" => Some(ScoreState::Unscorable),
            _ => None,
        }
    }
}

/// Physiological cycle (roughly one day, wake to wake).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: i64,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub start: DateTime<Utc>,
    /// Absent while the cycle is still in progress.
    pub end: Option<DateTime<Utc>>,
    pub timezone_offset: Option<String>,
    pub score_state: Option<ScoreState>,
    pub strain: Option<f64>,
    pub kilojoule: Option<f64>,
    pub average_heart_rate: Option<i64>,
    pub max_heart_rate: Option<i64>,
}

/// Recovery score, one per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recovery {
    pub cycle_id: i64,
    pub sleep_id: String,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub score_state: Option<ScoreState>,
    pub user_calibrating: Option<bool>,
    pub recovery_score: Option<f64>,
    pub resting_heart_rate: Option<f64>,
    pub hrv_rmssd_milli: Option<f64>,
    pub spo2_percentage: Option<f64>,
    pub skin_temp_celsius: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sleep {
    pub id: String,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone_offset: Option<String>,
    pub nap: Option<bool>,
    pub score_state: Option<ScoreState>,
    pub respiratory_rate: Option<f64>,
    pub sleep_performance_percentage: Option<f64>,
    pub sleep_consistency_percentage: Option<f64>,
    pub sleep_efficiency_percentage: Option<f64>,
    pub total_in_bed_time_milli: Option<i64>,
    pub total_awake_time_milli: Option<i64>,
    pub total_light_sleep_time_milli: Option<i64>,
    pub total_slow_wave_sleep_time_milli: Option<i64>,
    pub total_rem_sleep_time_milli: Option<i64>,
    pub disturbance_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: String,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone_offset: Option<String>,
    pub sport_id: Option<i64>,
    pub sport_name: Option<String>,
    pub score_state: Option<ScoreState>,
    pub strain: Option<f64>,
    pub average_heart_rate: Option<i64>,
    pub max_heart_rate: Option<i64>,
    pub kilojoule: Option<f64>,
    pub percent_recorded: Option<f64>,
    pub distance_meter: Option<f64>,
    pub altitude_gain_meter: Option<f64>,
    pub altitude_change_meter: Option<f64>,
}

/// A validated record of any kind, ready to upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainRecord {
    Cycle(Cycle),
    Recovery(Recovery),
    Sleep(Sleep),
    Workout(Workout),
}

impl DomainRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            DomainRecord::Cycle(_) => EntityKind::Cycle,
            DomainRecord::Recovery(_) => EntityKind::Recovery,
            DomainRecord::Sleep(_) => EntityKind::Sleep,
            DomainRecord::Workout(_) => EntityKind::Workout,
        }
    }

    /// Upsert key within the record's kind.
    pub fn id(&self) -> RecordId {
        match self {
            DomainRecord::Cycle(c) => RecordId::Numeric(c.id),
            DomainRecord::Recovery(r) => RecordId::Numeric(r.cycle_id),
            DomainRecord::Sleep(s) => RecordId::Text(s.id.clone()),
            DomainRecord::Workout(w) => RecordId::Text(w.id.clone()),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            DomainRecord::Cycle(c) => c.created_at,
            DomainRecord::Recovery(r) => r.created_at,
            DomainRecord::Sleep(s) => s.created_at,
            DomainRecord::Workout(w) => w.created_at,
        }
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            DomainRecord::Cycle(c) => c.updated_at,
            DomainRecord::Recovery(r) => r.updated_at,
            DomainRecord::Sleep(s) => s.updated_at,
            DomainRecord::Workout(w) => w.updated_at,
        }
    }

    pub fn score_state(&self) -> Option<ScoreState> {
        match self {
            DomainRecord::Cycle(c) => c.score_state,
            DomainRecord::Recovery(r) => r.score_state,
            DomainRecord::Sleep(s) => s.score_state,
            DomainRecord::Workout(w) => w.score_state,
        }
    }
}
