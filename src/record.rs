use std::time::{SystemTime, UNIX_EPOCH};

use geo::Point;
use serde_json::Value;

use crate::error::{RecordValidationError, Result};

/// One loosely typed value of a [`RawRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Instant(SystemTime),
    Real(f64),
    Integer(i64),
    Text(String),
    Json(Value),
}

impl Field {
    fn kind(&self) -> &'static str {
        match self {
            Field::Instant(_) => "a time instant",
            Field::Real(_) => "a real number",
            Field::Integer(_) => "an integer",
            Field::Text(_) => "text",
            Field::Json(Value::Array(_) | Value::Object(_)) => "structured data",
            Field::Json(_) => "a scalar JSON value",
        }
    }
}

/// The seven-field tuple handed over by a directions provider:
/// time, origin x, origin y, destination x, destination y, transit payload,
/// driving payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord(pub Vec<Field>);

impl RawRecord {
    pub fn new(
        time: SystemTime,
        origin: Point<f64>,
        destination: Point<f64>,
        transit: Value,
        driving: Value,
    ) -> Self {
        Self(vec![
            Field::Instant(time),
            Field::Real(origin.x()),
            Field::Real(origin.y()),
            Field::Real(destination.x()),
            Field::Real(destination.y()),
            Field::Json(transit),
            Field::Json(driving),
        ])
    }
}

const FIELD_NAMES: [&str; 7] = [
    "time",
    "latitude_from",
    "longitude_from",
    "latitude_to",
    "longitude_to",
    "transit_response",
    "driving_response",
];

/// A validated sample: when it was taken, where from, where to, and the two
/// directions payloads. The payloads are kept as-is and never interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub time: SystemTime,
    pub origin: Point<f64>,
    pub destination: Point<f64>,
    pub transit: Value,
    pub driving: Value,
}

impl TryFrom<RawRecord> for Record {
    type Error = RecordValidationError;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        let fields: [Field; 7] =
            raw.0
                .try_into()
                .map_err(|fields: Vec<Field>| RecordValidationError::Arity {
                    expected: FIELD_NAMES.len(),
                    actual: fields.len(),
                })?;
        let [time, from_x, from_y, to_x, to_y, transit, driving] = fields;

        Ok(Record {
            time: instant(0, time)?,
            origin: Point::new(real(1, from_x)?, real(2, from_y)?),
            destination: Point::new(real(3, to_x)?, real(4, to_y)?),
            transit: structured(5, transit)?,
            driving: structured(6, driving)?,
        })
    }
}

fn mismatch(position: usize, expected: &'static str, actual: &Field) -> RecordValidationError {
    RecordValidationError::Type {
        position,
        field: FIELD_NAMES[position],
        expected,
        actual: actual.kind(),
    }
}

fn instant(position: usize, field: Field) -> Result<SystemTime, RecordValidationError> {
    match field {
        Field::Instant(time) => Ok(time),
        other => Err(mismatch(position, "a time instant", &other)),
    }
}

fn real(position: usize, field: Field) -> Result<f64, RecordValidationError> {
    match field {
        Field::Real(value) if value.is_finite() => Ok(value),
        Field::Real(_) => Err(RecordValidationError::NonFinite {
            position,
            field: FIELD_NAMES[position],
        }),
        other => Err(mismatch(position, "a real number", &other)),
    }
}

fn structured(position: usize, field: Field) -> Result<Value, RecordValidationError> {
    match field {
        Field::Json(value @ (Value::Array(_) | Value::Object(_))) => Ok(value),
        other => Err(mismatch(position, "structured data", &other)),
    }
}

/// Storage encoding of a [`Record`], in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub time: f64,
    pub latitude_from: f64,
    pub longitude_from: f64,
    pub latitude_to: f64,
    pub longitude_to: f64,
    pub transit_response: String,
    pub driving_response: String,
}

impl Record {
    pub fn to_row(&self) -> Result<Row> {
        Ok(Row {
            time: epoch_seconds(self.time),
            latitude_from: self.origin.x(),
            longitude_from: self.origin.y(),
            latitude_to: self.destination.x(),
            longitude_to: self.destination.y(),
            transit_response: serde_json::to_string(&self.transit)?,
            driving_response: serde_json::to_string(&self.driving)?,
        })
    }
}

/// Seconds since the Unix epoch, negative for earlier instants.
pub fn epoch_seconds(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs_f64(),
        Err(err) => -err.duration().as_secs_f64(),
    }
}
