use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;
use crate::models::{ClassRoom, EntityKind, Facility, Lab, Slot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabAttendance {
    pub id: String,
    pub date: NaiveDate,
    pub lab_id: String,
    pub slot: Slot,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAttendance {
    pub id: String,
    pub date: NaiveDate,
    pub class_id: String,
    pub slot: Slot,
    pub count: u32,
}

/// Shared view over both attendance collections.
pub trait AttendanceRecord {
    type Owner: Facility;

    fn new(id: String, input: AttendanceInput) -> Self;
    fn id(&self) -> &str;
    fn entity_id(&self) -> &str;
    fn date(&self) -> NaiveDate;
    fn slot(&self) -> Slot;
    fn count(&self) -> u32;
}

macro_rules! impl_attendance {
    ($ty:ty, $owner:ty, $fk:ident) => {
        impl AttendanceRecord for $ty {
            type Owner = $owner;

            fn new(id: String, input: AttendanceInput) -> Self {
                Self {
                    id,
                    date: input.date,
                    $fk: input.entity_id,
                    slot: input.slot,
                    count: input.count,
                }
            }

            fn id(&self) -> &str {
                &self.id
            }

            fn entity_id(&self) -> &str {
                &self.$fk
            }

            fn date(&self) -> NaiveDate {
                self.date
            }

            fn slot(&self) -> Slot {
                self.slot
            }

            fn count(&self) -> u32 {
                self.count
            }
        }
    };
}

impl_attendance!(LabAttendance, Lab, lab_id);
impl_attendance!(ClassAttendance, ClassRoom, class_id);

/// Raw form input for an attendance entry. `entityId` also accepts the
/// `labId`/`classId` spellings used by the remote store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRequest {
    pub date: Option<String>,
    #[serde(alias = "labId", alias = "classId")]
    pub entity_id: Option<String>,
    pub slot: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_int")]
    pub count: Option<i64>,
}

/// Attendance fields after parsing; capacity is checked by the store,
/// which knows the referenced facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceInput {
    pub date: NaiveDate,
    pub entity_id: String,
    pub slot: Slot,
    pub count: u32,
}

impl AttendanceRequest {
    pub fn new(date: &str, entity_id: &str, slot: &str, count: i64) -> Self {
        Self {
            date: Some(date.to_string()),
            entity_id: Some(entity_id.to_string()),
            slot: Some(slot.to_string()),
            count: Some(count),
        }
    }

    pub fn parse(&self, kind: EntityKind) -> Result<AttendanceInput, AppError> {
        let missing = || AppError::Validation("Please fill all fields!".to_string());

        let date = self.date.as_deref().filter(|d| !d.is_empty()).ok_or_else(missing)?;
        let entity_id = self
            .entity_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(missing)?;
        let slot = self.slot.as_deref().filter(|s| !s.is_empty()).ok_or_else(missing)?;
        let count = self.count.ok_or_else(missing)?;

        let date = parse_date(date)?;
        let slot = Slot::parse_for(kind, slot)?;
        if count < 0 {
            return Err(AppError::Validation(
                "Student count cannot be negative!".to_string(),
            ));
        }
        let count = u32::try_from(count)
            .map_err(|_| AppError::Validation(format!("Student count {} is too large", count)))?;

        Ok(AttendanceInput {
            date,
            entity_id: entity_id.to_string(),
            slot,
            count,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Accepts a number or numeric text for form fields. Text is read up to the
/// first non-digit; text without a leading integer reads as absent.
pub fn deserialize_lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        None => None,
        Some(NumberOrText::Int(n)) => Some(n),
        Some(NumberOrText::Float(f)) if f.is_finite() => Some(f.trunc() as i64),
        Some(NumberOrText::Float(_)) => None,
        Some(NumberOrText::Text(s)) => parse_leading_int(&s),
    })
}

/// Optional sign followed by digits, ignoring leading whitespace and
/// anything after the digits.
pub fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_request() {
        let input = AttendanceRequest::new("2024-01-10", "lab-1", "9:10-11:10", 25)
            .parse(EntityKind::Lab)
            .expect("valid");
        assert_eq!(input.date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(input.slot, Slot::LabMorning);
        assert_eq!(input.count, 25);
    }

    #[test]
    fn test_parse_rejects_missing_and_malformed() {
        let mut req = AttendanceRequest::new("2024-01-10", "lab-1", "9:10-11:10", 25);
        req.count = None;
        assert!(req.parse(EntityKind::Lab).is_err());

        let req = AttendanceRequest::new("10/01/2024", "lab-1", "9:10-11:10", 25);
        assert!(req.parse(EntityKind::Lab).is_err());

        let req = AttendanceRequest::new("2024-01-10", "lab-1", "9:10-10:10", 25);
        assert!(req.parse(EntityKind::Lab).is_err());

        let req = AttendanceRequest::new("2024-01-10", "lab-1", "9:10-11:10", -3);
        assert!(req.parse(EntityKind::Lab).is_err());
    }

    #[test]
    fn test_request_accepts_lab_id_alias() {
        let req: AttendanceRequest = serde_json::from_str(
            r#"{"date":"2024-01-10","labId":"abc","slot":"9:10-11:10","count":3}"#,
        )
        .unwrap();
        assert_eq!(req.entity_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_wire_format_uses_foreign_key_names() {
        let record = ClassAttendance {
            id: "a".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            class_id: "c".to_string(),
            slot: Slot::ClassFirst,
            count: 12,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["classId"], "c");
        assert_eq!(value["date"], "2024-01-10");
        assert_eq!(value["slot"], "9:10-10:10");
    }

    #[test]
    fn test_count_accepts_numeric_text() {
        let req: AttendanceRequest = serde_json::from_value(serde_json::json!({
            "date": "2024-01-10",
            "labId": "l1",
            "slot": "9:10-11:10",
            "count": "25"
        }))
        .expect("text count should deserialize");
        assert_eq!(req.count, Some(25));
        assert_eq!(req.parse(EntityKind::Lab).unwrap().count, 25);

        let req: AttendanceRequest =
            serde_json::from_value(serde_json::json!({"count": "lots"})).unwrap();
        assert_eq!(req.count, None);
        let req: AttendanceRequest = serde_json::from_value(serde_json::json!({"count": 12.0})).unwrap();
        assert_eq!(req.count, Some(12));
        let req: AttendanceRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(req.count, None);
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int(" 12 students"), Some(12));
        assert_eq!(parse_leading_int("-4"), Some(-4));
        assert_eq!(parse_leading_int("abc"), None);
    }
}
