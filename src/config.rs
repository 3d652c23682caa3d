use serde::{Deserialize, Serialize};
use std::path::Path;
use strum::{Display, EnumString};

use crate::domain::signature::{HashAlgorithm, ShaComposer};
use crate::error::Result;

pub const ALLOWED_LOCALES: [&str; 18] = [
    "en_US", "cs_CZ", "de_DE", "dk_DK", "el_GR", "es_ES", "fr_FR", "it_IT", "ja_JP", "nl_BE",
    "nl_NL", "no_NO", "pl_PL", "pt_PT", "ru_RU", "se_SE", "sk_SK", "tr_TR",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    #[default]
    Test,
    Live,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum PaymentMode {
    #[default]
    Redirect,
    Inline,
    Alias,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderSettings {
    pub enabled: bool,
    pub days: i64,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            days: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub ecommerce_test: String,
    pub ecommerce_live: String,
    pub flexcheckout_test: String,
    pub flexcheckout_live: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            ecommerce_test: "https://ogone.test.v-psp.com/ncol/test/orderstandard_utf8.asp".into(),
            ecommerce_live: "https://secure.ogone.com/ncol/prod/orderstandard_utf8.asp".into(),
            flexcheckout_test: "https://ogone.test.v-psp.com/Tokenization/HostedPage".into(),
            flexcheckout_live: "https://secure.ogone.com/Tokenization/HostedPage".into(),
        }
    }
}

/// Merchant settings read by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub mode: Mode,
    pub pspid: String,
    pub sha_in: String,
    pub sha_out: String,
    pub hash_algorithm: HashAlgorithm,
    pub payment_page_type: PaymentMode,
    pub one_click: bool,
    pub skip_security_check: bool,
    /// Capture immediately (SAL) instead of authorising only (RES).
    pub direct_sales: bool,
    pub direct_sale_email: bool,
    pub selected_payment_methods: Vec<String>,
    pub generic_country: Option<String>,
    pub template_name: Option<String>,
    pub reminder: ReminderSettings,
    pub endpoints: Endpoints,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            mode: Mode::Test,
            pspid: String::new(),
            sha_in: String::new(),
            sha_out: String::new(),
            hash_algorithm: HashAlgorithm::Sha256,
            payment_page_type: PaymentMode::Redirect,
            one_click: false,
            skip_security_check: false,
            direct_sales: false,
            direct_sale_email: false,
            selected_payment_methods: vec!["visa".into(), "mastercard".into()],
            generic_country: None,
            template_name: None,
            reminder: ReminderSettings::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl Configuration {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn is_test_mode(&self) -> bool {
        self.mode == Mode::Test
    }

    pub fn ecommerce_url(&self) -> &str {
        match self.mode {
            Mode::Test => &self.endpoints.ecommerce_test,
            Mode::Live => &self.endpoints.ecommerce_live,
        }
    }

    pub fn flexcheckout_url(&self) -> &str {
        match self.mode {
            Mode::Test => &self.endpoints.flexcheckout_test,
            Mode::Live => &self.endpoints.flexcheckout_live,
        }
    }

    pub fn sha_in_composer(&self) -> ShaComposer {
        ShaComposer::new(self.hash_algorithm, self.sha_in.clone())
    }

    pub fn sha_out_composer(&self) -> ShaComposer {
        ShaComposer::for_responses(self.hash_algorithm, self.sha_out.clone())
    }

    /// Country used for the open-invoice PM/brand overrides.
    pub fn generic_country(&self) -> &str {
        self.generic_country.as_deref().unwrap_or("DE")
    }

    pub fn locale(&self, requested: &str) -> &'static str {
        ALLOWED_LOCALES
            .iter()
            .find(|locale| **locale == requested)
            .copied()
            .unwrap_or("en_US")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Configuration::default();
        assert!(config.is_test_mode());
        assert_eq!(config.payment_page_type, PaymentMode::Redirect);
        assert!(config.ecommerce_url().contains("ogone.test.v-psp.com"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Configuration::from_json_str(
            r#"{"mode": "live", "payment_page_type": "INLINE", "one_click": true,
                "reminder": {"enabled": true}}"#,
        )
        .unwrap();

        assert_eq!(config.mode, Mode::Live);
        assert_eq!(config.payment_page_type, PaymentMode::Inline);
        assert!(config.one_click);
        assert!(config.reminder.enabled);
        assert_eq!(config.reminder.days, 2);
        assert_eq!(
            config.flexcheckout_url(),
            "https://secure.ogone.com/Tokenization/HostedPage"
        );
    }

    #[test]
    fn test_locale_fallback() {
        let config = Configuration::default();
        assert_eq!(config.locale("fr_FR"), "fr_FR");
        assert_eq!(config.locale("xx_XX"), "en_US");
    }
}
