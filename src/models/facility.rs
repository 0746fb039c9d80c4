use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::{EntityKind, deserialize_lenient_int};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Lab {
    pub id: String,
    pub name: String,
    #[serde(alias = "strength")]
    pub capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ClassRoom {
    pub id: String,
    pub name: String,
    #[serde(alias = "strength")]
    pub capacity: u32,
}

/// Shared view over labs and classrooms used by the store and aggregation.
pub trait Facility {
    const KIND: EntityKind;

    fn new(id: String, input: FacilityInput) -> Self;
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn capacity(&self) -> u32;
    fn apply(&mut self, input: FacilityInput);
}

macro_rules! impl_facility {
    ($ty:ty, $kind:expr) => {
        impl Facility for $ty {
            const KIND: EntityKind = $kind;

            fn new(id: String, input: FacilityInput) -> Self {
                Self {
                    id,
                    name: input.name,
                    capacity: input.capacity,
                }
            }

            fn id(&self) -> &str {
                &self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn capacity(&self) -> u32 {
                self.capacity
            }

            fn apply(&mut self, input: FacilityInput) {
                self.name = input.name;
                self.capacity = input.capacity;
            }
        }
    };
}

impl_facility!(Lab, EntityKind::Lab);
impl_facility!(ClassRoom, EntityKind::Class);

/// Raw form input for creating or editing a lab or class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacilityRequest {
    pub name: Option<String>,
    #[serde(default, alias = "strength", deserialize_with = "deserialize_lenient_int")]
    pub capacity: Option<i64>,
}

/// Validated facility fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityInput {
    pub name: String,
    pub capacity: u32,
}

impl FacilityRequest {
    pub fn new(name: &str, capacity: i64) -> Self {
        Self {
            name: Some(name.to_string()),
            capacity: Some(capacity),
        }
    }

    pub fn validate(&self, kind: EntityKind) -> Result<FacilityInput, AppError> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::Validation("Please fill all fields!".to_string()))?;
        let capacity = self
            .capacity
            .ok_or_else(|| AppError::Validation("Please fill all fields!".to_string()))?;

        let max = kind.max_capacity();
        if capacity < 0 || capacity > i64::from(max) {
            return Err(AppError::Validation(format!(
                "{} strength must be between 0 and {}!",
                kind.label(),
                max
            )));
        }

        Ok(FacilityInput {
            name: name.to_string(),
            capacity: capacity as u32,
        })
    }
}
