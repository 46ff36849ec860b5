//! The closed set of transit modes with a vehicle-position feed.

use std::fmt;

use tracing::warn;

/// Transit mode served by its own GTFS-RT vehicle-position endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitMode {
    Buses,
    Ferries,
    LightRail,
    NswTrains,
    SydneyTrains,
}

impl TransitMode {
    pub const ALL: [TransitMode; 5] = [
        TransitMode::Buses,
        TransitMode::Ferries,
        TransitMode::LightRail,
        TransitMode::NswTrains,
        TransitMode::SydneyTrains,
    ];

    /// Mode used when a key is not recognised.
    pub const DEFAULT: TransitMode = TransitMode::SydneyTrains;

    /// Resolves a mode key, or `None` if it is not one of the known keys.
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == key)
    }

    /// Resolves a mode key, falling back to [`TransitMode::DEFAULT`].
    /// Unknown keys are logged, never rejected.
    pub fn from_key(key: &str) -> Self {
        Self::parse(key).unwrap_or_else(|| {
            warn!(key, fallback = %Self::DEFAULT, "Unknown mode key, using default");
            Self::DEFAULT
        })
    }

    /// The key used in feed URLs, staging names and the `TransitType` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitMode::Buses => "buses",
            TransitMode::Ferries => "ferries",
            TransitMode::LightRail => "lightrail",
            TransitMode::NswTrains => "nswtrains",
            TransitMode::SydneyTrains => "sydneytrains",
        }
    }

    /// Feed endpoint for this mode under `base_url`.
    pub fn feed_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.as_str())
    }
}

impl fmt::Display for TransitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_keys_round_trip() {
        for mode in TransitMode::ALL {
            assert_eq!(TransitMode::parse(mode.as_str()), Some(mode));
        }
    }

    #[test]
    fn test_unknown_key_falls_back_to_default() {
        assert_eq!(TransitMode::parse("trams"), None);
        assert_eq!(TransitMode::from_key("trams"), TransitMode::SydneyTrains);
        assert_eq!(TransitMode::from_key(""), TransitMode::SydneyTrains);
    }

    #[test]
    fn test_from_key_resolves_known_keys() {
        assert_eq!(TransitMode::from_key("ferries"), TransitMode::Ferries);
        assert_eq!(TransitMode::from_key("buses"), TransitMode::Buses);
    }

    #[test]
    fn test_feed_url_joins_base() {
        assert_eq!(
            TransitMode::Ferries.feed_url("https://api.example.test/v1/gtfs/vehiclepos/"),
            "https://api.example.test/v1/gtfs/vehiclepos/ferries"
        );
    }
}
