//! Connect race configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Hold applied to IPv4 candidates when the list mixes families.
pub const DEFAULT_BIAS_DELAY: Duration = Duration::from_millis(200);

/// Which address families a race may connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilyPreference {
    #[default]
    Any,
    V4Only,
    V6Only,
}

impl FamilyPreference {
    /// Returns true if `endpoint` may be attempted.
    pub fn allows(&self, endpoint: &SocketAddr) -> bool {
        match self {
            FamilyPreference::Any => true,
            FamilyPreference::V4Only => endpoint.is_ipv4(),
            FamilyPreference::V6Only => endpoint.is_ipv6(),
        }
    }
}

/// Connect race configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Delay before IPv4 candidates start in a mixed-family race
    #[serde(rename = "bias_delay_ms", with = "millis")]
    pub bias_delay: Duration,
    /// Race all candidates concurrently; when off, try them one by one
    pub happy_eyeballs: bool,
    /// Address families to consider
    pub family: FamilyPreference,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            bias_delay: DEFAULT_BIAS_DELAY,
            happy_eyeballs: true,
            family: FamilyPreference::Any,
        }
    }
}

impl RaceConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Set the IPv4 bias delay.
    pub fn bias_delay(mut self, delay: Duration) -> Self {
        self.bias_delay = delay;
        self
    }

    /// Enable or disable concurrent racing.
    pub fn happy_eyeballs(mut self, enable: bool) -> Self {
        self.happy_eyeballs = enable;
        self
    }

    /// Restrict the address families.
    pub fn family(mut self, family: FamilyPreference) -> Self {
        self.family = family;
        self
    }

    /// Keeps the candidates this config allows, paired with their original
    /// positions.
    pub(crate) fn filter(&self, candidates: &[SocketAddr]) -> Vec<(usize, SocketAddr)> {
        candidates
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, endpoint)| self.family.allows(endpoint))
            .collect()
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RaceConfig::default();
        assert_eq!(config.bias_delay, Duration::from_millis(200));
        assert!(config.happy_eyeballs);
        assert_eq!(config.family, FamilyPreference::Any);
    }

    #[test]
    fn test_builder_pattern() {
        let config = RaceConfig::new()
            .bias_delay(Duration::from_millis(50))
            .happy_eyeballs(false)
            .family(FamilyPreference::V6Only);

        assert_eq!(config.bias_delay, Duration::from_millis(50));
        assert!(!config.happy_eyeballs);
        assert_eq!(config.family, FamilyPreference::V6Only);
    }

    #[test]
    fn test_from_json_partial() {
        let config = RaceConfig::from_json(r#"{"bias_delay_ms": 300, "family": "v4_only"}"#)
            .unwrap();
        assert_eq!(config.bias_delay, Duration::from_millis(300));
        assert_eq!(config.family, FamilyPreference::V4Only);
        assert!(config.happy_eyeballs);

        assert_eq!(RaceConfig::from_json("{}").unwrap(), RaceConfig::default());
        assert!(RaceConfig::from_json(r#"{"family": "ipx"}"#).is_err());
    }

    #[test]
    fn test_json_serialization() {
        let json = serde_json::to_value(RaceConfig::default()).unwrap();
        assert_eq!(json["bias_delay_ms"], 200);
        assert_eq!(json["family"], "any");
    }

    #[test]
    fn test_family_filter_keeps_positions() {
        let candidates: Vec<SocketAddr> = vec![
            "[2001:db8::1]:443".parse().unwrap(),
            "192.0.2.1:443".parse().unwrap(),
            "[2001:db8::2]:443".parse().unwrap(),
        ];

        let v4 = RaceConfig::new().family(FamilyPreference::V4Only).filter(&candidates);
        assert_eq!(v4, vec![(1, candidates[1])]);

        let v6 = RaceConfig::new().family(FamilyPreference::V6Only).filter(&candidates);
        assert_eq!(v6.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 2]);

        assert_eq!(RaceConfig::default().filter(&candidates).len(), 3);
    }
}
