use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Which collection a facility or attendance record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Lab,
    Class,
}

impl EntityKind {
    pub const ALL: [EntityKind; 2] = [EntityKind::Lab, EntityKind::Class];

    /// Upper bound for a facility's capacity.
    pub fn max_capacity(self) -> u32 {
        match self {
            EntityKind::Lab => 40,
            EntityKind::Class => 90,
        }
    }

    /// Fixed slots in their declared order.
    pub fn slots(self) -> &'static [Slot] {
        match self {
            EntityKind::Lab => &Slot::LAB,
            EntityKind::Class => &Slot::CLASS,
        }
    }

    /// Value of the `Type` column in spreadsheets.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Lab => "Lab",
            EntityKind::Class => "Class",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Lab" => Some(EntityKind::Lab),
            "Class" => Some(EntityKind::Class),
            _ => None,
        }
    }
}

/// A fixed time window. Lab and class windows never share a value, so one
/// closed enum covers both and [`Slot::kind`] tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    #[serde(rename = "9:10-11:10")]
    LabMorning,
    #[serde(rename = "12:10-14:10")]
    LabMidday,
    #[serde(rename = "14:20-16:20")]
    LabAfternoon,
    #[serde(rename = "9:10-10:10")]
    ClassFirst,
    #[serde(rename = "10:10-11:10")]
    ClassSecond,
    #[serde(rename = "12:10-13:10")]
    ClassThird,
    #[serde(rename = "13:10-14:10")]
    ClassFourth,
    #[serde(rename = "14:20-15:20")]
    ClassFifth,
    #[serde(rename = "15:20-16:20")]
    ClassSixth,
}

impl Slot {
    pub const LAB: [Slot; 3] = [Slot::LabMorning, Slot::LabMidday, Slot::LabAfternoon];

    pub const CLASS: [Slot; 6] = [
        Slot::ClassFirst,
        Slot::ClassSecond,
        Slot::ClassThird,
        Slot::ClassFourth,
        Slot::ClassFifth,
        Slot::ClassSixth,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::LabMorning => "9:10-11:10",
            Slot::LabMidday => "12:10-14:10",
            Slot::LabAfternoon => "14:20-16:20",
            Slot::ClassFirst => "9:10-10:10",
            Slot::ClassSecond => "10:10-11:10",
            Slot::ClassThird => "12:10-13:10",
            Slot::ClassFourth => "13:10-14:10",
            Slot::ClassFifth => "14:20-15:20",
            Slot::ClassSixth => "15:20-16:20",
        }
    }

    pub fn kind(self) -> EntityKind {
        if Slot::LAB.contains(&self) {
            EntityKind::Lab
        } else {
            EntityKind::Class
        }
    }

    /// Exact match against the slot value; no trimming or range matching.
    pub fn parse(value: &str) -> Option<Self> {
        Slot::LAB
            .iter()
            .chain(Slot::CLASS.iter())
            .copied()
            .find(|slot| slot.as_str() == value)
    }

    /// Parses a slot and checks that it belongs to `kind`'s enumeration.
    pub fn parse_for(kind: EntityKind, value: &str) -> Result<Self, AppError> {
        match Slot::parse(value) {
            Some(slot) if slot.kind() == kind => Ok(slot),
            _ => Err(AppError::Validation(format!(
                "\"{}\" is not a valid {} slot",
                value,
                kind.label().to_lowercase()
            ))),
        }
    }

    /// Column header used by the summary sheets.
    pub fn summary_header(self) -> &'static str {
        match self {
            Slot::LabMorning => "9:10-11:10 AM",
            Slot::LabMidday => "12:10-2:10 PM",
            Slot::LabAfternoon => "2:20-4:20 PM",
            Slot::ClassFirst => "9:10-10:10 AM",
            Slot::ClassSecond => "10:10-11:10 AM",
            Slot::ClassThird => "12:10-1:10 PM",
            Slot::ClassFourth => "1:10-2:10 PM",
            Slot::ClassFifth => "2:20-3:20 PM",
            Slot::ClassSixth => "3:20-4:20 PM",
        }
    }

    /// `9:10 AM – 11:10 AM` style label for attendance listings.
    pub fn twelve_hour_label(self) -> String {
        let (start, end) = self
            .as_str()
            .split_once('-')
            .unwrap_or((self.as_str(), ""));
        format!("{} – {}", to_twelve_hour(start), to_twelve_hour(end))
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn to_twelve_hour(time: &str) -> String {
    let (hours, minutes) = time.split_once(':').unwrap_or((time, "00"));
    let hour: u32 = hours.parse().unwrap_or(0);
    let suffix = if hour >= 12 { "PM" } else { "AM" };
    let display = match hour {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    format!("{}:{} {}", display, minutes, suffix)
}
