// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Raw WHOOP JSON → typed records.
//!
//! Required fields are strict: absent or mistyped fails the record with a
//! validation error naming its upstream ID. Optional fields are permissive:
//! anything absent or malformed (including bad timestamps) becomes `None`.
//! The nested `score` object is flattened into top-level fields, and unknown
//! fields are dropped.

use crate::error::SyncError;
use crate::models::{
    Cycle, DomainRecord, EntityKind, RawRecord, Recovery, ScoreState, Sleep, Workout,
};
use crate::time_utils::parse_utc;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Map one raw record of `kind`.
pub fn map_record(kind: EntityKind, raw: &RawRecord) -> Result<DomainRecord, SyncError> {
    match kind {
        EntityKind::Cycle => map_cycle(raw).map(DomainRecord::Cycle),
        EntityKind::Recovery => map_recovery(raw).map(DomainRecord::Recovery),
        EntityKind::Sleep => map_sleep(raw).map(DomainRecord::Sleep),
        EntityKind::Workout => map_workout(raw).map(DomainRecord::Workout),
    }
}

pub fn map_cycle(raw: &RawRecord) -> Result<Cycle, SyncError> {
    let f = Fields::new(EntityKind::Cycle, raw, "id")?;
    let score = f.score();

    Ok(Cycle {
        id: f.required_i64("id")?,
        user_id: f.optional_i64("user_id"),
        created_at: f.required_ts("created_at")?,
        updated_at: f.required_ts("updated_at")?,
        start: f.required_ts("start")?,
        end: f.optional_ts("end"),
        timezone_offset: f.optional_str("timezone_offset"),
        score_state: f.score_state(),
        strain: score.optional_f64("strain"),
        kilojoule: score.optional_f64("kilojoule"),
        average_heart_rate: score.optional_i64("average_heart_rate"),
        max_heart_rate: score.optional_i64("max_heart_rate"),
    })
}

pub fn map_recovery(raw: &RawRecord) -> Result<Recovery, SyncError> {
    let f = Fields::new(EntityKind::Recovery, raw, "cycle_id")?;
    let score = f.score();

    Ok(Recovery {
        cycle_id: f.required_i64("cycle_id")?,
        sleep_id: f.required_id_str("sleep_id")?,
        user_id: f.optional_i64("user_id"),
        created_at: f.required_ts("created_at")?,
        updated_at: f.required_ts("updated_at")?,
        score_state: f.score_state(),
        user_calibrating: score.optional_bool("user_calibrating"),
        recovery_score: score.optional_f64("recovery_score"),
        resting_heart_rate: score.optional_f64("resting_heart_rate"),
        hrv_rmssd_milli: score.optional_f64("hrv_rmssd_milli"),
        spo2_percentage: score.optional_f64("spo2_percentage"),
        skin_temp_celsius: score.optional_f64("skin_temp_celsius"),
    })
}

pub fn map_sleep(raw: &RawRecord) -> Result<Sleep, SyncError> {
    let f = Fields::new(EntityKind::Sleep, raw, "id")?;
    let score = f.score();
    let stages = score.nested("stage_summary");

    Ok(Sleep {
        id: f.required_str("id")?,
        user_id: f.optional_i64("user_id"),
        created_at: f.required_ts("created_at")?,
        updated_at: f.required_ts("updated_at")?,
        start: f.required_ts("start")?,
        end: f.required_ts("end")?,
        timezone_offset: f.optional_str("timezone_offset"),
        nap: f.optional_bool("nap"),
        score_state: f.score_state(),
        respiratory_rate: score.optional_f64("respiratory_rate"),
        sleep_performance_percentage: score.optional_f64("sleep_performance_percentage"),
        sleep_consistency_percentage: score.optional_f64("sleep_consistency_percentage"),
        sleep_efficiency_percentage: score.optional_f64("sleep_efficiency_percentage"),
        total_in_bed_time_milli: stages.optional_i64("total_in_bed_time_milli"),
        total_awake_time_milli: stages.optional_i64("total_awake_time_milli"),
        total_light_sleep_time_milli: stages.optional_i64("total_light_sleep_time_milli"),
        total_slow_wave_sleep_time_milli: stages.optional_i64("total_slow_wave_sleep_time_milli"),
        total_rem_sleep_time_milli: stages.optional_i64("total_rem_sleep_time_milli"),
        disturbance_count: stages.optional_i64("disturbance_count"),
    })
}

pub fn map_workout(raw: &RawRecord) -> Result<Workout, SyncError> {
    let f = Fields::new(EntityKind::Workout, raw, "id")?;
    let score = f.score();

    Ok(Workout {
        id: f.required_str("id")?,
        user_id: f.optional_i64("user_id"),
        created_at: f.required_ts("created_at")?,
        updated_at: f.required_ts("updated_at")?,
        start: f.required_ts("start")?,
        end: f.required_ts("end")?,
        timezone_offset: f.optional_str("timezone_offset"),
        sport_id: f.optional_i64("sport_id"),
        sport_name: f.optional_str("sport_name"),
        score_state: f.score_state(),
        strain: score.optional_f64("strain"),
        average_heart_rate: score.optional_i64("average_heart_rate"),
        max_heart_rate: score.optional_i64("max_heart_rate"),
        kilojoule: score.optional_f64("kilojoule"),
        percent_recorded: score.optional_f64("percent_recorded"),
        distance_meter: score.optional_f64("distance_meter"),
        altitude_gain_meter: score.optional_f64("altitude_gain_meter"),
        altitude_change_meter: score.optional_f64("altitude_change_meter"),
    })
}

/// Typed field access over a JSON object, carrying context for errors.
struct Fields<'a> {
    kind: EntityKind,
    record_id: String,
    object: Option<&'a serde_json::Map<String, Value>>,
}

impl<'a> Fields<'a> {
    /// Fails when the record is not a JSON object at all.
    fn new(kind: EntityKind, raw: &'a RawRecord, id_key: &str) -> Result<Self, SyncError> {
        let Some(object) = raw.as_object() else {
            return Err(SyncError::validation(
                kind,
                "<unknown>",
                format!("record is a JSON {}, not an object", json_type(raw)),
            ));
        };
        let record_id = match object.get(id_key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => "<unknown>".to_string(),
        };
        Ok(Self {
            kind,
            record_id,
            object: Some(object),
        })
    }

    /// Sub-object view; missing or non-object nesting yields all-`None` reads.
    fn nested(&self, key: &str) -> Fields<'a> {
        Fields {
            kind: self.kind,
            record_id: self.record_id.clone(),
            object: self.object.and_then(|o| o.get(key)).and_then(Value::as_object),
        }
    }

    fn score(&self) -> Fields<'a> {
        self.nested("score")
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.object
            .and_then(|o| o.get(key))
            .filter(|v| !v.is_null())
    }

    fn invalid(&self, reason: String) -> SyncError {
        SyncError::validation(self.kind, self.record_id.clone(), reason)
    }

    fn required_i64(&self, key: &str) -> Result<i64, SyncError> {
        match self.get(key) {
            None => Err(self.invalid(format!("missing required field `{}`", key))),
            Some(v) => v
                .as_i64()
                .ok_or_else(|| self.invalid(format!("field `{}` is not an integer", key))),
        }
    }

    fn required_str(&self, key: &str) -> Result<String, SyncError> {
        match self.get(key) {
            None => Err(self.invalid(format!("missing required field `{}`", key))),
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(_) => Err(self.invalid(format!("field `{}` is not a non-empty string", key))),
        }
    }

    /// Identifier that WHOOP has served both as integer and as UUID string.
    fn required_id_str(&self, key: &str) -> Result<String, SyncError> {
        match self.get(key) {
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
            _ => self.required_str(key),
        }
    }

    fn required_ts(&self, key: &str) -> Result<DateTime<Utc>, SyncError> {
        match self.get(key) {
            None => Err(self.invalid(format!("missing required field `{}`", key))),
            Some(Value::String(s)) => parse_utc(s)
                .ok_or_else(|| self.invalid(format!("field `{}` is not an ISO-8601 timestamp", key))),
            Some(_) => Err(self.invalid(format!("field `{}` is not a timestamp string", key))),
        }
    }

    fn optional_ts(&self, key: &str) -> Option<DateTime<Utc>> {
        self.get(key).and_then(Value::as_str).and_then(parse_utc)
    }

    fn optional_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(Value::as_str).map(str::to_string)
    }

    fn optional_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    fn optional_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    fn optional_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    fn score_state(&self) -> Option<ScoreState> {
        self.get("score_state")
            .and_then(Value::as_str)
            .and_then(ScoreState::parse)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
