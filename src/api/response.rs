use serde::Deserialize;
use serde_json::{Map, Value};

/// Uniform response envelope shared by every endpoint.
///
/// Success is `status == "0" && message == "success"`; anything else is an
/// upstream rejection. `data.list` carries paginated collections, `data`
/// alone carries single-entity payloads.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.status == "0" && self.message == "success"
    }

    /// The `data` member as an object; empty map for anything else.
    pub fn into_object(self) -> Map<String, Value> {
        match self.data {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

/* Upstream ids show up both as JSON numbers and as strings. */
fn id_string<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Value::deserialize(d)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "identifier is neither string nor number: {}",
            other
        ))),
    }
}

pub mod auth {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct Login {
        pub token: String,
    }
}

pub mod station_page {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct Record {
        #[serde(deserialize_with = "super::id_string")]
        pub id: String,
        #[serde(default)]
        pub name: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Page {
        #[serde(default)]
        pub list: Vec<Record>,
    }
}

pub mod device_page {
    use serde::Deserialize;
    use serde_json::Value;

    #[derive(Debug, Deserialize)]
    pub struct DtuRecord {
        #[serde(deserialize_with = "super::id_string")]
        pub id: String,
        /// Model number doubles as the DTU display name.
        #[serde(default)]
        pub model_no: Option<String>,
        /// Opaque warning/connection status blob, carried verbatim.
        #[serde(default)]
        pub warn_data: Value,
    }

    #[derive(Debug, Deserialize)]
    pub struct DtuPage {
        #[serde(default)]
        pub list: Vec<DtuRecord>,
    }

    #[derive(Debug, Deserialize)]
    pub struct MicroRecord {
        #[serde(deserialize_with = "super::id_string")]
        pub id: String,
        /// Initial hardware number doubles as the microinverter display name.
        #[serde(default)]
        pub init_hard_no: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct MicroPage {
        #[serde(default)]
        pub list: Vec<MicroRecord>,
    }
}
