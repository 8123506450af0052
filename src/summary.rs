use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::record::Row;

/// Totals extracted from a directions response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionsSummary {
    /// Duration of the whole trip, in seconds.
    pub duration: f64,
    /// Distance covered per travel mode, in metres.
    pub distances: BTreeMap<String, f64>,
    /// Time spent per travel mode, in seconds.
    pub durations: BTreeMap<String, f64>,
}

#[derive(Deserialize)]
struct Route {
    legs: Vec<Leg>,
}

#[derive(Deserialize)]
struct Leg {
    duration: Quantity,
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Deserialize)]
struct Step {
    travel_mode: String,
    distance: Quantity,
    duration: Quantity,
}

#[derive(Deserialize)]
struct Quantity {
    value: f64,
}

/// Summarizes the first leg of the first route of a directions response.
pub fn summarize_directions(response: &Value) -> Result<DirectionsSummary> {
    let routes = Vec::<Route>::deserialize(response).map_err(Error::MalformedResponse)?;
    let leg = routes
        .first()
        .and_then(|route| route.legs.first())
        .ok_or(Error::EmptyResponse)?;

    let mut distances = BTreeMap::new();
    let mut durations = BTreeMap::new();
    for step in &leg.steps {
        *distances.entry(step.travel_mode.clone()).or_insert(0.0) += step.distance.value;
        *durations.entry(step.travel_mode.clone()).or_insert(0.0) += step.duration.value;
    }

    Ok(DirectionsSummary {
        duration: leg.duration.value,
        distances,
        durations,
    })
}

/// A stored row with both payloads summarized. A payload without any route
/// (no transit service, unreachable destination) summarizes to `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSummary {
    pub time: f64,
    pub origin: (f64, f64),
    pub destination: (f64, f64),
    pub transit: Option<DirectionsSummary>,
    pub driving: Option<DirectionsSummary>,
}

pub fn summarize_row(row: &Row) -> Result<RowSummary> {
    Ok(RowSummary {
        time: row.time,
        origin: (row.latitude_from, row.longitude_from),
        destination: (row.latitude_to, row.longitude_to),
        transit: summarize_stored(&row.transit_response)?,
        driving: summarize_stored(&row.driving_response)?,
    })
}

fn summarize_stored(text: &str) -> Result<Option<DirectionsSummary>> {
    let response: Value = serde_json::from_str(text)?;
    match summarize_directions(&response) {
        Ok(summary) => Ok(Some(summary)),
        Err(Error::EmptyResponse) => Ok(None),
        Err(err) => Err(err),
    }
}
