//! Request and response bodies of the ArcGIS REST endpoints we call.

use serde::{Deserialize, Serialize};

use crate::normalize::HEADER;

/// Error envelope ArcGIS returns with HTTP 200.
#[derive(Debug, Deserialize)]
pub struct ArcGisError {
    pub code: Option<i64>,
    pub message: Option<String>,
    #[serde(default)]
    pub details: Vec<String>,
}

impl std::fmt::Display for ArcGisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "code {}: {}",
            self.code.map(|c| c.to_string()).unwrap_or_else(|| "?".into()),
            self.message.as_deref().unwrap_or("no message")
        )?;
        if !self.details.is_empty() {
            write!(f, " ({})", self.details.join("; "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub expires_in: Option<u64>,
    pub error: Option<ArcGisError>,
}

#[derive(Debug, Deserialize)]
pub struct UploadItem {
    #[serde(rename = "itemID")]
    pub item_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    pub item: Option<UploadItem>,
    pub error: Option<ArcGisError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendResponse {
    pub status_url: Option<String>,
    pub error: Option<ArcGisError>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FieldMapping {
    pub source: &'static str,
    pub name: &'static str,
}

/// Identity mapping of every staged column onto the layer field of the same name.
pub fn field_mappings() -> Vec<FieldMapping> {
    HEADER
        .into_iter()
        .map(|column| FieldMapping {
            source: column,
            name: column,
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialReference {
    pub wkid: u32,
    pub latest_wkid: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendSourceInfo {
    #[serde(rename = "type")]
    pub source_type: &'static str,
    pub use_bulk_inserts: bool,
    pub source_url: &'static str,
    pub location_type: &'static str,
    pub longitude_field_name: &'static str,
    pub latitude_field_name: &'static str,
    pub column_delimiter: &'static str,
    pub qualifier: &'static str,
    #[serde(rename = "sourceSR")]
    pub source_sr: SpatialReference,
}

impl AppendSourceInfo {
    /// CSV with point geometry built from the WGS84 longitude/latitude columns.
    pub fn csv_wgs84() -> Self {
        Self {
            source_type: "csv",
            use_bulk_inserts: true,
            source_url: "",
            location_type: "coordinates",
            longitude_field_name: "longitude",
            latitude_field_name: "latitude",
            column_delimiter: ",",
            qualifier: "\"",
            source_sr: SpatialReference {
                wkid: 4326,
                latest_wkid: 4326,
            },
        }
    }
}
