use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};

/// Raw key/value payload received from the gateway (return URL query or webhook body).
///
/// Keys keep the casing the gateway sent them with; lookups are case-insensitive
/// because the gateway mixes `orderID`, `PAYID` and `Alias_OrderId` styles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayParams(BTreeMap<String, String>);

impl GatewayParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Case-insensitive lookup, returning the raw value even when empty.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).or_else(|| {
            self.0
                .iter()
                .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
                .map(|(_, value)| value.as_str())
        })
    }

    /// Case-insensitive lookup that treats empty values as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.raw(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let existing = self
            .0
            .keys()
            .find(|candidate| candidate.eq_ignore_ascii_case(key))
            .cloned()?;
        self.0.remove(&existing)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for GatewayParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, String>> for GatewayParams {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

/// Outcome the customer is sent back with from the hosted pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ReturnState {
    Accept,
    Decline,
    Cancel,
    Back,
    Exception,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_case_insensitive_lookup() {
        let params = GatewayParams::new()
            .with("orderID", "100001")
            .with("PAYID", "3000")
            .with("NCERROR", "");

        assert_eq!(params.get("ORDERID"), Some("100001"));
        assert_eq!(params.get("payid"), Some("3000"));
        assert_eq!(params.get("NCERROR"), None);
        assert_eq!(params.raw("NCERROR"), Some(""));
    }

    #[test]
    fn test_remove_ignores_case() {
        let mut params = GatewayParams::new().with("ShaSign", "ABC");
        assert_eq!(params.remove("SHASIGN"), Some("ABC".to_string()));
        assert!(!params.has("SHASIGN"));
    }

    #[test]
    fn test_return_state_parsing() {
        assert_eq!(ReturnState::from_str("accept").unwrap(), ReturnState::Accept);
        assert_eq!(ReturnState::Exception.to_string(), "EXCEPTION");
        assert!(ReturnState::from_str("LOST").is_err());
    }
}
