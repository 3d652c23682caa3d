use serde::{Deserialize, Serialize};
use strum::Display;

use crate::domain::catalog::{self, PaymentMethod};
use crate::domain::request::GatewayParams;

/// Brands whose tokens are never reusable, so saving them is a successful no-op.
pub const NON_STORABLE_BRANDS: [&str; 10] = [
    "PostFinance Card",
    "Direct Debits NL",
    "Direct Debits DE",
    "Direct Debit AT",
    "Dankor",
    "UATP",
    "AIRPLUS",
    "Split Payment",
    "Open Invoice DE",
    "Open Invoice NL",
];

/// Usage text shown on the hosted page when the customer's card is kept for later.
pub const ALIAS_USAGE: &str = "Your card details will be stored for your next purchases";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
pub enum AliasOperation {
    #[serde(rename = "BYMERCHANT")]
    #[strum(serialize = "BYMERCHANT")]
    ByMerchant,
    #[default]
    #[serde(rename = "BYPSP")]
    #[strum(serialize = "BYPSP")]
    ByPsp,
}

/// A stored or in-flight payment token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    pub id: Option<String>,
    pub customer_id: Option<String>,
    /// The token itself, as sent in the `ALIAS` field.
    pub alias: Option<String>,
    pub ed: Option<String>,
    pub brand: Option<String>,
    pub card_no: Option<String>,
    pub cn: Option<String>,
    pub bin: Option<String>,
    pub pm: Option<String>,
    /// Catalog id of the payment method the alias was created for.
    pub payment_id: Option<String>,
    pub operation: AliasOperation,
    pub usage: Option<String>,
    pub store_permanently: bool,
    pub prevent_storing: bool,
    pub force_security: bool,
    pub pay_id: Option<String>,
}

impl Alias {
    pub fn create(fields: &AliasFields) -> Self {
        Self {
            alias: fields.alias.clone(),
            brand: fields.brand.clone(),
            card_no: fields.card_no.clone(),
            cn: fields.cn.clone(),
            bin: fields.bin.clone(),
            pm: fields.pm.clone(),
            ed: fields.ed.clone(),
            ..Self::default()
        }
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            alias: Some(id.clone()),
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn mark_for_permanent_storage(&mut self) {
        self.store_permanently = true;
        self.prevent_storing = false;
    }

    pub fn mark_prevent_storing(&mut self) {
        self.prevent_storing = true;
        self.store_permanently = false;
    }

    /// Resolves the catalog entry by payment id, then by brand, else the empty entry.
    pub fn resolve_payment_method(&self) -> &'static PaymentMethod {
        self.payment_id
            .as_deref()
            .and_then(catalog::lookup_by_id)
            .or_else(|| {
                self.brand
                    .as_deref()
                    .and_then(|brand| catalog::lookup_by_brand(brand, None))
            })
            .unwrap_or(&PaymentMethod::EMPTY)
    }

    /// Human readable label, e.g. `VISA ends with 1111, expires on 12/30`.
    pub fn display_name(&self) -> String {
        let brand = match self.brand.as_deref().unwrap_or_default() {
            "CB" => "Carte Bancaire",
            brand => brand,
        };
        let card_no = self.card_no.as_deref().unwrap_or_default();
        let last4: String = {
            let chars: Vec<char> = card_no.chars().collect();
            chars[chars.len().saturating_sub(4)..].iter().collect()
        };
        let ed = self.ed.as_deref().unwrap_or_default();
        let (month, year) = match (ed.get(0..2), ed.get(2..4)) {
            (Some(month), Some(year)) => (month, year),
            _ => ("", ""),
        };
        format!("{brand} ends with {last4}, expires on {month}/{year}")
    }
}

/// Fields persisted for a stored alias.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasFields {
    #[serde(rename = "ALIAS")]
    pub alias: Option<String>,
    #[serde(rename = "BRAND")]
    pub brand: Option<String>,
    #[serde(rename = "CARDNO")]
    pub card_no: Option<String>,
    #[serde(rename = "CN")]
    pub cn: Option<String>,
    #[serde(rename = "BIN")]
    pub bin: Option<String>,
    #[serde(rename = "PM")]
    pub pm: Option<String>,
    #[serde(rename = "ED")]
    pub ed: Option<String>,
}

impl AliasFields {
    pub fn from_params(params: &GatewayParams) -> Self {
        Self {
            alias: params.get_string("ALIAS"),
            brand: params.get_string("BRAND"),
            card_no: params.get_string("CARDNO"),
            cn: params.get_string("CN"),
            bin: params.get_string("BIN"),
            pm: params.get_string("PM"),
            ed: params.get_string("ED"),
        }
    }

    /// Fields posted back by FlexCheckout (`Alias_*` / `Card_*`).
    pub fn from_inline_params(params: &GatewayParams) -> Self {
        Self {
            alias: params.get_string("Alias_AliasId"),
            brand: params.get_string("Card_Brand"),
            card_no: params.get_string("Card_CardNumber"),
            cn: params.get_string("Card_CardHolderName"),
            bin: params.get_string("Card_Bin"),
            pm: Some("CreditCard".to_string()),
            ed: params.get_string("Card_ExpiryDate"),
        }
    }

    pub fn is_storable(&self) -> bool {
        self.brand
            .as_deref()
            .is_none_or(|brand| !NON_STORABLE_BRANDS.contains(&brand))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        let alias = Alias {
            brand: Some("VISA".into()),
            card_no: Some("XXXXXXXXXXXX1111".into()),
            ed: Some("1230".into()),
            ..Alias::default()
        };
        assert_eq!(alias.display_name(), "VISA ends with 1111, expires on 12/30");

        let cb = Alias {
            brand: Some("CB".into()),
            ..alias
        };
        assert!(cb.display_name().starts_with("Carte Bancaire ends with 1111"));
    }

    #[test]
    fn test_storage_flags_are_exclusive() {
        let mut alias = Alias::with_id("A1");
        alias.mark_prevent_storing();
        assert!(alias.prevent_storing && !alias.store_permanently);
        alias.mark_for_permanent_storage();
        assert!(alias.store_permanently && !alias.prevent_storing);
    }

    #[test]
    fn test_resolve_payment_method() {
        let by_id = Alias {
            payment_id: Some("ideal".into()),
            brand: Some("VISA".into()),
            ..Alias::default()
        };
        assert_eq!(by_id.resolve_payment_method().id, "ideal");

        let by_brand = Alias {
            brand: Some("Bancontact/Mister Cash".into()),
            ..Alias::default()
        };
        assert_eq!(by_brand.resolve_payment_method().id, "bancontact");

        assert!(Alias::default().resolve_payment_method().is_empty());
    }

    #[test]
    fn test_non_storable_brands() {
        for brand in NON_STORABLE_BRANDS {
            let fields = AliasFields {
                brand: Some(brand.to_string()),
                ..AliasFields::default()
            };
            assert!(!fields.is_storable(), "{brand} must not be stored");
        }
        let visa = AliasFields {
            brand: Some("VISA".into()),
            ..AliasFields::default()
        };
        assert!(visa.is_storable());
    }

    #[test]
    fn test_operation_wire_form() {
        assert_eq!(AliasOperation::ByMerchant.to_string(), "BYMERCHANT");
        assert_eq!(
            serde_json::to_string(&AliasOperation::ByPsp).unwrap(),
            "\"BYPSP\""
        );
    }
}
