//! Locating the night record inside the payload handed over by the host workflow
//!
//! The host may deliver the record bare, wrapped in a list, wrapped in a
//! `nights` collection, or both. Resolution happens once, up front, into an
//! [`InputShape`], and checks the shapes in a fixed priority order:
//!
//! 1. list whose first element carries `nights` -> first night
//! 2. list whose first element is the record -> that element
//! 3. object carrying `nights` -> first night
//! 4. any other object -> the object itself

use serde_json::{Map, Value};
use std::fmt;

use crate::error::{Result, SleepError};

const NIGHTS_KEY: &str = "nights";

/// Recognized input layouts, each holding the resolved record mapping
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputShape<'a> {
    /// `[{"nights": [record, ...]}, ...]`
    ListOfNightCollections(&'a Map<String, Value>),
    /// `[record, ...]`
    ListOfRecords(&'a Map<String, Value>),
    /// `{"nights": [record, ...]}`
    NightCollection(&'a Map<String, Value>),
    /// `record`
    Record(&'a Map<String, Value>),
}

impl<'a> InputShape<'a> {
    /// Classify an input value and resolve the record it wraps
    pub fn resolve(input: &'a Value) -> Result<Self> {
        match input {
            Value::Array(items) => {
                let first = items.first().ok_or_else(|| invalid("empty sequence"))?;
                let first = first
                    .as_object()
                    .ok_or_else(|| invalid("first element of sequence is not an object"))?;

                match first.get(NIGHTS_KEY) {
                    Some(nights) => Ok(InputShape::ListOfNightCollections(first_night(nights)?)),
                    None => Ok(InputShape::ListOfRecords(first)),
                }
            }
            Value::Object(map) => match map.get(NIGHTS_KEY) {
                Some(nights) => Ok(InputShape::NightCollection(first_night(nights)?)),
                None => Ok(InputShape::Record(map)),
            },
            other => Err(invalid(&format!("expected object or sequence, got {}", kind(other)))),
        }
    }

    /// The resolved night record
    pub fn record(&self) -> &'a Map<String, Value> {
        match *self {
            InputShape::ListOfNightCollections(record)
            | InputShape::ListOfRecords(record)
            | InputShape::NightCollection(record)
            | InputShape::Record(record) => record,
        }
    }
}

impl fmt::Display for InputShape<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputShape::ListOfNightCollections(_) => write!(f, "list of night collections"),
            InputShape::ListOfRecords(_) => write!(f, "list of records"),
            InputShape::NightCollection(_) => write!(f, "night collection"),
            InputShape::Record(_) => write!(f, "record"),
        }
    }
}

/// Locate the night record inside an input value
pub fn locate_record(input: &Value) -> Result<&Map<String, Value>> {
    InputShape::resolve(input).map(|shape| shape.record())
}

fn first_night(nights: &Value) -> Result<&Map<String, Value>> {
    let nights = nights
        .as_array()
        .ok_or_else(|| invalid("\"nights\" is not a sequence"))?;

    nights
        .first()
        .ok_or_else(|| invalid("\"nights\" is empty"))?
        .as_object()
        .ok_or_else(|| invalid("first night is not an object"))
}

fn invalid(reason: &str) -> SleepError {
    SleepError::InvalidInputShape {
        reason: reason.to_string(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "object",
    }
}
