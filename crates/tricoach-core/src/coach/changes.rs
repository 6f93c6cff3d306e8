//! The `[PLAN_CHANGES]` block and the validated [`Change`] union.
//!
//! The advisory text generator embeds mutation intent in its prose as
//!
//! ```text
//! [PLAN_CHANGES] [{"action": "cancel", "sessionId": "..."}] [/PLAN_CHANGES]
//! ```
//!
//! The block is stripped before display. Parsing is best-effort: malformed
//! JSON yields no changes, and elements with an unknown action or invalid
//! fields are dropped one by one.

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use tricoach_db::models::{Intensity, Sport};

pub const OPEN_TAG: &str = "[PLAN_CHANGES]";
pub const CLOSE_TAG: &str = "[/PLAN_CHANGES]";

/// A new session requested by the coach. Omitted fields take defaults when
/// applied.
#[derive(Debug, Clone, PartialEq)]
pub struct AddSession {
    pub date: NaiveDate,
    pub sport: Sport,
    pub workout_type: Option<String>,
    pub duration_min: Option<i32>,
    pub distance_km: Option<f64>,
    pub intensity: Option<Intensity>,
    pub description: Option<String>,
}

/// One validated plan mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// `cancel` or `skip`: terminal coach cancellation.
    Cancel { session_id: Uuid },
    Reschedule { session_id: Uuid, new_date: NaiveDate },
    Add(AddSession),
}

impl Change {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Cancel { .. } => "cancel",
            Self::Reschedule { .. } => "reschedule",
            Self::Add(_) => "add",
        }
    }
}

/// Wire shape of a change before field validation.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum RawChange {
    #[serde(alias = "skip")]
    Cancel {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },
    Reschedule {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
        #[serde(rename = "newDate")]
        new_date: NaiveDate,
    },
    Add {
        date: NaiveDate,
        sport: String,
        #[serde(rename = "type")]
        workout_type: Option<String>,
        duration: Option<f64>,
        distance: Option<f64>,
        intensity: Option<String>,
        description: Option<String>,
    },
}

fn validate(raw: RawChange) -> Result<Change, String> {
    match raw {
        RawChange::Cancel { session_id } => Ok(Change::Cancel { session_id }),
        RawChange::Reschedule { session_id, new_date } => {
            Ok(Change::Reschedule { session_id, new_date })
        }
        RawChange::Add {
            date,
            sport,
            workout_type,
            duration,
            distance,
            intensity,
            description,
        } => {
            let sport = sport.parse::<Sport>().map_err(|e| e.to_string())?;
            let intensity = intensity
                .map(|i| i.parse::<Intensity>())
                .transpose()
                .map_err(|e| e.to_string())?;
            let duration_min = match duration {
                Some(d) if d.is_finite() && d > 0.0 => Some(d.round() as i32),
                Some(d) => return Err(format!("invalid duration {d}")),
                None => None,
            };
            if distance.is_some_and(|km| !km.is_finite() || km < 0.0) {
                return Err("invalid distance".to_string());
            }
            Ok(Change::Add(AddSession {
                date,
                sport,
                workout_type: workout_type.filter(|t| !t.trim().is_empty()),
                duration_min,
                distance_km: distance,
                intensity,
                description: description.filter(|d| !d.trim().is_empty()),
            }))
        }
    }
}

/// Validate a JSON array of changes, dropping invalid elements.
///
/// `null` means "no changes". Anything else that is not an array is
/// treated as malformed and yields nothing.
pub fn parse_changes(value: &serde_json::Value) -> Vec<Change> {
    let items = match value {
        serde_json::Value::Null => return Vec::new(),
        serde_json::Value::Array(items) => items,
        other => {
            tracing::warn!(kind = json_kind(other), "plan changes are not a JSON array, ignoring");
            return Vec::new();
        }
    };

    items
        .iter()
        .filter_map(|item| {
            let action = item
                .get("action")
                .and_then(|a| a.as_str())
                .unwrap_or("<missing>")
                .to_string();
            let parsed = serde_json::from_value::<RawChange>(item.clone())
                .map_err(|e| e.to_string())
                .and_then(validate);
            match parsed {
                Ok(change) => Some(change),
                Err(reason) => {
                    tracing::warn!(%action, %reason, "dropping plan change");
                    None
                }
            }
        })
        .collect()
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Prose with the change blocks removed.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedReply {
    pub message: String,
    /// `None` when the prose carried no block; `Some` (possibly empty)
    /// when it did.
    pub changes: Option<Vec<Change>>,
}

/// Strip every `[PLAN_CHANGES]...[/PLAN_CHANGES]` block from `text` and
/// parse their contents. An opening tag without a closing tag is left in
/// place as prose.
pub fn extract_plan_changes(text: &str) -> ExtractedReply {
    let mut message = String::with_capacity(text.len());
    let mut changes: Option<Vec<Change>> = None;
    let mut rest = text;

    while let Some(start) = rest.find(OPEN_TAG) {
        let after_open = &rest[start + OPEN_TAG.len()..];
        let Some(end) = after_open.find(CLOSE_TAG) else {
            break;
        };
        message.push_str(&rest[..start]);

        let body = after_open[..end].trim();
        let parsed = match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value) => parse_changes(&value),
            Err(e) => {
                tracing::warn!(error = %e, "malformed PLAN_CHANGES block, ignoring");
                Vec::new()
            }
        };
        changes.get_or_insert_with(Vec::new).extend(parsed);

        rest = &after_open[end + CLOSE_TAG.len()..];
    }
    message.push_str(rest);

    ExtractedReply {
        message: message.trim().to_string(),
        changes,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const SESSION: &str = "0b9e7c1e-2f43-4c8b-9a51-6f0d2d2f8a10";

    #[test]
    fn strips_block_and_parses() {
        let text = format!(
            "Take it easy this week.\n[PLAN_CHANGES] [{{\"action\":\"cancel\",\"sessionId\":\"{SESSION}\"}}] [/PLAN_CHANGES]\nSee you Monday."
        );
        let out = extract_plan_changes(&text);
        assert_eq!(out.message, "Take it easy this week.\n\nSee you Monday.");
        assert_eq!(
            out.changes,
            Some(vec![Change::Cancel {
                session_id: SESSION.parse().unwrap()
            }])
        );
    }

    #[test]
    fn no_block_is_none() {
        let out = extract_plan_changes("Great work!");
        assert_eq!(out.message, "Great work!");
        assert_eq!(out.changes, None);
    }

    #[test]
    fn malformed_block_is_empty_but_stripped() {
        let out = extract_plan_changes("Hi [PLAN_CHANGES] [{not json [/PLAN_CHANGES]");
        assert_eq!(out.message, "Hi");
        assert_eq!(out.changes, Some(Vec::new()));
    }

    #[test]
    fn unterminated_block_stays_prose() {
        let out = extract_plan_changes("Hi [PLAN_CHANGES] []");
        assert_eq!(out.message, "Hi [PLAN_CHANGES] []");
        assert_eq!(out.changes, None);
    }

    #[test]
    fn skip_is_an_alias_of_cancel() {
        let changes = parse_changes(&json!([{"action": "skip", "sessionId": SESSION}]));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action(), "cancel");
    }

    #[test]
    fn unknown_actions_are_dropped() {
        let changes = parse_changes(&json!([
            {"action": "delete_everything"},
            {"action": "add", "date": "2025-06-01", "sport": "Run"},
        ]));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action(), "add");
    }

    #[test]
    fn add_parses_optional_fields() {
        let changes = parse_changes(&json!([{
            "action": "add",
            "date": "2025-06-01",
            "sport": "bike",
            "type": "Intervals",
            "duration": 60,
            "distance": 30.5,
            "intensity": "hard",
            "description": "4x8min threshold"
        }]));
        let Change::Add(add) = &changes[0] else {
            panic!("expected add");
        };
        assert_eq!(add.sport, Sport::Bike);
        assert_eq!(add.workout_type.as_deref(), Some("Intervals"));
        assert_eq!(add.duration_min, Some(60));
        assert_eq!(add.distance_km, Some(30.5));
        assert_eq!(add.intensity, Some(Intensity::Hard));
    }

    #[test]
    fn invalid_elements_are_dropped_individually() {
        let changes = parse_changes(&json!([
            {"action": "add", "date": "2025-06-01", "sport": "Rowing"},
            {"action": "reschedule", "sessionId": "not-a-uuid", "newDate": "2025-06-05"},
            {"action": "reschedule", "sessionId": SESSION, "newDate": "2025-06-05"},
        ]));
        assert_eq!(
            changes,
            vec![Change::Reschedule {
                session_id: SESSION.parse().unwrap(),
                new_date: NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
            }]
        );
    }

    #[test]
    fn non_array_is_ignored() {
        assert!(parse_changes(&json!({"action": "add"})).is_empty());
        assert!(parse_changes(&serde_json::Value::Null).is_empty());
    }
}
