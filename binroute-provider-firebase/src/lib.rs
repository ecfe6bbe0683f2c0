//! Telemetry provider reading bins and vans from a Firebase Realtime Database.
//!
//! The database keeps two nodes, `/Data/bins` and `/Data/vans`. Each is either an
//! object keyed by push id or an array, and every entry uses the column names of the
//! sensor firmware (`"Fill Level (%)"`, `"Temperature (°C)"`, ...).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Number, Value};
use tracing::debug;

use binroute_core::{
    model::{Bin, Van},
    ports::{PortError, TelemetryPort},
    record::{
        BinRecord, RecordDefect, RecordIssue, RecordKind, TelemetryBatch, VanRecord, collect_bins,
        collect_vans,
    },
};

const BINS_NODE: &str = "Data/bins";
const VANS_NODE: &str = "Data/vans";

/// Bin entry as stored by the sensors.
#[derive(Debug, Deserialize)]
struct BinEntry {
    #[serde(rename = "Bin ID")]
    bin_id: Option<Identifier>,
    #[serde(rename = "Latitude")]
    latitude: Option<f64>,
    #[serde(rename = "Longitude")]
    longitude: Option<f64>,
    #[serde(rename = "Fill Level (%)")]
    fill_level: Option<f64>,
    #[serde(rename = "Tilt")]
    tilt: Option<TiltReading>,
    #[serde(rename = "Temperature (°C)")]
    temperature: Option<f64>,
    #[serde(rename = "Humidity (%)")]
    humidity: Option<f64>,
}

/// Van entry as stored by the fleet trackers.
#[derive(Debug, Deserialize)]
struct VanEntry {
    #[serde(rename = "Van ID")]
    van_id: Option<Identifier>,
    #[serde(rename = "Latitude")]
    latitude: Option<f64>,
    #[serde(rename = "Longitude")]
    longitude: Option<f64>,
    #[serde(rename = "Capacity", default)]
    capacity: Option<usize>,
}

/// Ids are written as numbers by older firmware and as strings by newer.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Identifier {
    Text(String),
    Number(Number),
}

impl Identifier {
    fn into_string(self) -> String {
        match self {
            Identifier::Text(text) => text,
            Identifier::Number(number) => number.to_string(),
        }
    }
}

/// Tilt is a boolean switch on most sensors and a 0..1 level on some.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
#[expect(
    variant_size_differences,
    reason = "lives only while one reading is decoded"
)]
enum TiltReading {
    Flag(bool),
    Level(f64),
}

impl TiltReading {
    fn level(self) -> f64 {
        match self {
            TiltReading::Flag(true) => 1.0,
            TiltReading::Flag(false) => 0.0,
            TiltReading::Level(level) => level,
        }
    }
}

/// Connection settings for the database.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    /// Base URL, e.g. `https://example-default-rtdb.firebaseio.com`.
    pub database_url: String,
    /// Database secret or ID token passed as `auth`.
    pub auth_token: Option<String>,
}

/// Telemetry port backed by the Firebase REST API.
pub struct FirebaseTelemetry {
    client: Client,
    database_url: String,
    auth_token: Option<String>,
}

impl FirebaseTelemetry {
    /// Create a telemetry port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, config: FirebaseConfig) -> Self {
        Self {
            client,
            database_url: config.database_url.trim_end_matches('/').to_owned(),
            auth_token: config.auth_token,
        }
    }

    async fn fetch_node(&self, node: &str) -> Result<Value, PortError> {
        let url = format!("{}/{node}.json", self.database_url);
        debug!(%url, "fetching telemetry node");

        let mut req = self.client.get(&url);
        if let Some(token) = &self.auth_token {
            req = req.query(&[("auth", token)]);
        }

        let response = req
            .send()
            .await
            .map_err(|err| PortError::TelemetryUnavailable(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PortError::TelemetryUnavailable(format!(
                "{node} returned {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|err| PortError::TelemetryUnavailable(err.to_string()))?;
        serde_json::from_str(&body).map_err(|err| PortError::MalformedPayload(err.to_string()))
    }
}

#[async_trait]
impl TelemetryPort for FirebaseTelemetry {
    fn source(&self) -> &str {
        &self.database_url
    }

    async fn bins(&self) -> Result<TelemetryBatch<Bin>, PortError> {
        parse_bins(self.fetch_node(BINS_NODE).await?)
    }

    async fn vans(&self) -> Result<TelemetryBatch<Van>, PortError> {
        parse_vans(self.fetch_node(VANS_NODE).await?)
    }
}

/// Decode the `/Data/bins` node.
///
/// # Errors
///
/// Returns [`PortError::MalformedPayload`] when the node is neither null, an object,
/// nor an array. Broken entries end up in the batch's rejected list.
pub fn parse_bins(node: Value) -> Result<TelemetryBatch<Bin>, PortError> {
    let (entries, mut unreadable) = decode_entries::<BinEntry>(node, RecordKind::Bin)?;
    let records = entries.into_iter().map(|(key, entry)| BinRecord {
        key,
        id: entry.bin_id.map(Identifier::into_string),
        latitude: entry.latitude,
        longitude: entry.longitude,
        fill_level: entry.fill_level,
        tilt: entry.tilt.map(TiltReading::level),
        temperature: entry.temperature,
        humidity: entry.humidity,
    });

    let mut batch = collect_bins(records);
    batch.rejected.append(&mut unreadable);
    Ok(batch)
}

/// Decode the `/Data/vans` node.
///
/// # Errors
///
/// Same as [`parse_bins`].
pub fn parse_vans(node: Value) -> Result<TelemetryBatch<Van>, PortError> {
    let (entries, mut unreadable) = decode_entries::<VanEntry>(node, RecordKind::Van)?;
    let records = entries.into_iter().map(|(key, entry)| VanRecord {
        key,
        id: entry.van_id.map(Identifier::into_string),
        latitude: entry.latitude,
        longitude: entry.longitude,
        capacity: entry.capacity,
    });

    let mut batch = collect_vans(records);
    batch.rejected.append(&mut unreadable);
    Ok(batch)
}

type Decoded<T> = (Vec<(String, T)>, Vec<RecordIssue>);

fn decode_entries<T: DeserializeOwned>(node: Value, kind: RecordKind) -> Result<Decoded<T>, PortError> {
    let raw: Vec<(String, Value)> = match node {
        Value::Null => Vec::new(),
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, item)| !item.is_null())
            .map(|(index, item)| (index.to_string(), item))
            .collect(),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            return Err(PortError::MalformedPayload(format!(
                "{kind} node is a scalar, expected an object or array"
            )));
        }
    };

    let mut decoded = Vec::with_capacity(raw.len());
    let mut unreadable = Vec::new();
    for (key, value) in raw {
        match serde_json::from_value::<T>(value) {
            Ok(entry) => decoded.push((key, entry)),
            Err(err) => unreadable.push(RecordIssue {
                kind,
                key,
                defect: RecordDefect::Unreadable(err.to_string()),
            }),
        }
    }

    Ok((decoded, unreadable))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn object_node_is_read_in_key_order() {
        let node = json!({
            "-Nb2": {
                "Bin ID": 2, "Latitude": 28.71, "Longitude": 77.21,
                "Fill Level (%)": 40.5, "Tilt": 0, "Temperature (°C)": 29.0, "Humidity (%)": 55.0
            },
            "-Na1": {
                "Bin ID": "B-1", "Latitude": 28.70, "Longitude": 77.20,
                "Fill Level (%)": 91.0, "Tilt": true, "Temperature (°C)": 33.4, "Humidity (%)": 61.0
            }
        });

        let batch = parse_bins(node).expect("object node");
        let ids: Vec<&str> = batch.records.iter().map(|bin| bin.id.0.as_str()).collect();
        assert_eq!(ids, ["B-1", "2"]);
        assert!(batch.rejected.is_empty());
        assert!(
            batch
                .records
                .first()
                .is_some_and(|bin| (bin.telemetry.tilt - 1.0).abs() < f64::EPSILON),
            "boolean tilt maps to 1"
        );
    }

    #[test]
    fn array_node_skips_null_holes() {
        let node = json!([
            null,
            {"Van ID": "V1", "Latitude": 28.701, "Longitude": 77.201},
            {"Van ID": "V2", "Latitude": 30.0, "Longitude": 80.0, "Capacity": 12}
        ]);

        let batch = parse_vans(node).expect("array node");
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records.get(1).and_then(|van| van.capacity), Some(12));
    }

    #[test]
    fn null_node_is_an_empty_snapshot() {
        let batch = parse_bins(Value::Null).expect("null node");
        assert!(batch.records.is_empty() && batch.rejected.is_empty());
    }

    #[test]
    fn scalar_node_is_malformed() {
        let err = parse_vans(json!("offline")).expect_err("scalar node");
        assert!(matches!(err, PortError::MalformedPayload(_)));
    }

    #[test]
    fn missing_humidity_is_rejected_with_its_key() {
        let node = json!({
            "-Nc3": {
                "Bin ID": 3, "Latitude": 28.72, "Longitude": 77.22,
                "Fill Level (%)": 70.0, "Tilt": 0, "Temperature (°C)": 30.0
            }
        });

        let batch = parse_bins(node).expect("object node");
        assert!(batch.records.is_empty());
        let issue = batch.rejected.first().expect("one rejection");
        assert_eq!(issue.key, "3");
        assert_eq!(issue.defect, RecordDefect::MissingField("humidity"));
    }

    #[test]
    fn wrongly_typed_entry_is_unreadable() {
        let node = json!({
            "-Nd4": {
                "Bin ID": 4, "Latitude": "north", "Longitude": 77.22,
                "Fill Level (%)": 70.0, "Tilt": 0, "Temperature (°C)": 30.0, "Humidity (%)": 20.0
            }
        });

        let batch = parse_bins(node).expect("object node");
        let issue = batch.rejected.first().expect("one rejection");
        assert_eq!(issue.key, "-Nd4");
        assert!(matches!(issue.defect, RecordDefect::Unreadable(_)));
    }
}
