//! Static registry of the payment methods the gateway family supports.
//!
//! Entries are registered at compile time; lookups never touch the filesystem.

use serde::Serialize;
use strum::{Display, EnumString};

/// Gateway brand string Bancontact sends instead of its catalog brand.
pub const BANCONTACT_RAW_BRAND: &str = "Bancontact/Mister Cash";
pub const BANCONTACT_BRAND: &str = "BCMC";

const OPEN_INVOICE_BRANDS: [&str; 2] = ["Open Invoice DE", "Open Invoice NL"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    Card,
    RealTimeBanking,
    EWallet,
    PrepaidVouchers,
    OpenInvoice,
    Klarna,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Card,
        Category::RealTimeBanking,
        Category::EWallet,
        Category::PrepaidVouchers,
        Category::OpenInvoice,
        Category::Klarna,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Card => "Cards",
            Category::RealTimeBanking => "Real-time Banking",
            Category::EWallet => "e-Wallet",
            Category::PrepaidVouchers => "Prepaid Vouchers",
            Category::OpenInvoice => "Open Invoice",
            Category::Klarna => "Klarna",
        }
    }
}

/// Order fields a payment method may require before the gateway accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderField {
    BillingFirstName,
    BillingLastName,
    BillingAddress1,
    BillingStreetNumber,
    BillingCity,
    BillingPostcode,
    BillingCountryCode,
    BillingPhone,
    BillingEmail,
    CustomerDob,
    CustomerGender,
}

const OPEN_INVOICE_FIELDS: &[OrderField] = &[
    OrderField::BillingFirstName,
    OrderField::BillingLastName,
    OrderField::BillingAddress1,
    OrderField::BillingStreetNumber,
    OrderField::BillingCity,
    OrderField::BillingPostcode,
    OrderField::BillingCountryCode,
    OrderField::BillingEmail,
    OrderField::CustomerDob,
    OrderField::CustomerGender,
];

const KLARNA_FIELDS: &[OrderField] = &[
    OrderField::BillingFirstName,
    OrderField::BillingLastName,
    OrderField::BillingAddress1,
    OrderField::BillingCity,
    OrderField::BillingPostcode,
    OrderField::BillingCountryCode,
    OrderField::BillingEmail,
    OrderField::BillingPhone,
];

const ONEY_FIELDS: &[OrderField] = &[
    OrderField::BillingFirstName,
    OrderField::BillingLastName,
    OrderField::BillingAddress1,
    OrderField::BillingCity,
    OrderField::BillingPostcode,
    OrderField::BillingCountryCode,
    OrderField::BillingPhone,
    OrderField::BillingEmail,
    OrderField::CustomerDob,
];

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentMethod {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
    pub pm: &'static str,
    pub brand: &'static str,
    /// ISO country code and popularity (0-100).
    pub countries: &'static [(&'static str, u8)],
    pub pm_per_country: &'static [(&'static str, &'static str)],
    pub brand_per_country: &'static [(&'static str, &'static str)],
    pub is_redirect_only: bool,
    pub is_security_mandatory: bool,
    pub two_phase_flow: bool,
    pub three_phase_flow: bool,
    pub additional_data_required: bool,
    pub order_line_items_required: bool,
    pub is_hidden: bool,
    pub direct_sales_success_code: &'static [u16],
    pub auth_mode_success_code: &'static [u16],
    pub expected_fields: &'static [OrderField],
}

impl PaymentMethod {
    /// Placeholder returned when nothing in the catalog matches.
    pub const EMPTY: PaymentMethod = PaymentMethod {
        id: "",
        name: "",
        category: Category::Card,
        pm: "",
        brand: "",
        countries: &[],
        pm_per_country: &[],
        brand_per_country: &[],
        is_redirect_only: false,
        is_security_mandatory: false,
        two_phase_flow: true,
        three_phase_flow: false,
        additional_data_required: false,
        order_line_items_required: false,
        is_hidden: false,
        direct_sales_success_code: &[9],
        auth_mode_success_code: &[5],
        expected_fields: &[],
    };

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }

    pub fn pm_by_country(&self, country: &str) -> Option<&'static str> {
        self.pm_per_country
            .iter()
            .find(|(code, _)| *code == country)
            .map(|(_, pm)| *pm)
    }

    pub fn brand_by_country(&self, country: &str) -> Option<&'static str> {
        self.brand_per_country
            .iter()
            .find(|(code, _)| *code == country)
            .map(|(_, brand)| *brand)
    }

    pub fn supports_country(&self, country: &str) -> bool {
        self.countries.iter().any(|(code, _)| *code == country)
    }
}

/// Replaces the Bancontact brand string the gateway sends with the catalog brand.
pub fn normalize_brand(brand: &str) -> &str {
    if brand == BANCONTACT_RAW_BRAND {
        BANCONTACT_BRAND
    } else {
        brand
    }
}

pub fn lookup_by_id(id: &str) -> Option<&'static PaymentMethod> {
    METHODS.iter().find(|method| method.id.eq_ignore_ascii_case(id))
}

/// Case-insensitive brand lookup, first match wins.
///
/// The open-invoice brands are shared by Klarna and Afterpay. With a
/// selection context the merchant's selected methods decide (Klarna first);
/// without one Klarna is assumed.
pub fn lookup_by_brand(brand: &str, selected: Option<&[String]>) -> Option<&'static PaymentMethod> {
    let brand = normalize_brand(brand);
    if OPEN_INVOICE_BRANDS.contains(&brand) {
        return match selected {
            Some(selected) if selected.iter().any(|id| id == "klarna") => lookup_by_id("klarna"),
            Some(selected) if selected.iter().any(|id| id == "afterpay") => {
                lookup_by_id("afterpay")
            }
            Some(_) => None,
            None => lookup_by_id("klarna"),
        };
    }

    METHODS
        .iter()
        .find(|method| method.brand.eq_ignore_ascii_case(brand))
}

pub fn list_by_category(category: Category) -> Vec<&'static PaymentMethod> {
    METHODS
        .iter()
        .filter(|method| method.category == category && !method.is_hidden)
        .collect()
}

pub fn all() -> &'static [PaymentMethod] {
    METHODS
}

pub fn visible() -> impl Iterator<Item = &'static PaymentMethod> {
    METHODS.iter().filter(|method| !method.is_hidden)
}

/// Resolves the merchant's selected method ids, keeping catalog order.
pub fn selected(ids: &[String]) -> Vec<&'static PaymentMethod> {
    visible()
        .filter(|method| ids.iter().any(|id| id.eq_ignore_ascii_case(method.id)))
        .collect()
}

/// Ids of the methods available in any of `countries`, merged into `current`.
pub fn merge_by_countries(current: &[String], countries: &[&str]) -> Vec<String> {
    let mut merged: Vec<String> = current.to_vec();
    for method in visible() {
        if countries.iter().any(|country| method.supports_country(country))
            && !merged.iter().any(|id| id == method.id)
        {
            merged.push(method.id.to_string());
        }
    }
    merged
}

pub fn categories() -> Vec<(Category, &'static str)> {
    Category::ALL
        .iter()
        .map(|category| (*category, category.label()))
        .collect()
}

/// Every country any catalog entry supports, as `{iso_code: name}`.
pub fn all_countries() -> std::collections::BTreeMap<&'static str, &'static str> {
    METHODS
        .iter()
        .flat_map(|method| method.countries.iter())
        .map(|(code, _)| (*code, country_name(code)))
        .collect()
}

pub fn country_name(iso_code: &str) -> &'static str {
    match iso_code {
        "AT" => "Austria",
        "BE" => "Belgium",
        "CH" => "Switzerland",
        "DE" => "Germany",
        "ES" => "Spain",
        "FI" => "Finland",
        "FR" => "France",
        "GB" => "United Kingdom",
        "IT" => "Italy",
        "LU" => "Luxembourg",
        "NL" => "Netherlands",
        "NO" => "Norway",
        "PT" => "Portugal",
        "SE" => "Sweden",
        _ => "Unknown",
    }
}

const CARD_COUNTRIES_WIDE: &[(&str, u8)] = &[
    ("AT", 20),
    ("BE", 20),
    ("FR", 20),
    ("DE", 20),
    ("IT", 20),
    ("LU", 20),
    ("PT", 20),
    ("ES", 20),
    ("CH", 20),
    ("GB", 20),
];

macro_rules! method {
    ($($field:ident: $value:expr),* $(,)?) => {
        PaymentMethod {
            $($field: $value,)*
            ..PaymentMethod::EMPTY
        }
    };
}

static METHODS: &[PaymentMethod] = &[
    method! {
        id: "visa", name: "Visa", category: Category::Card, pm: "CreditCard", brand: "VISA",
        countries: &[("AT", 100), ("BE", 80), ("FR", 100), ("DE", 100), ("IT", 100), ("LU", 100),
            ("NL", 40), ("PT", 100), ("ES", 100), ("CH", 100), ("GB", 100)],
    },
    method! {
        id: "mastercard", name: "Mastercard", category: Category::Card, pm: "CreditCard",
        brand: "MasterCard",
        countries: &[("AT", 100), ("BE", 80), ("FR", 100), ("DE", 100), ("IT", 100), ("LU", 100),
            ("NL", 60), ("PT", 100), ("ES", 100), ("CH", 100), ("GB", 60)],
    },
    method! {
        id: "amex", name: "American Express", category: Category::Card, pm: "CreditCard",
        brand: "American Express",
        countries: &[("AT", 40), ("BE", 40), ("FR", 40), ("DE", 40), ("IT", 40), ("LU", 20),
            ("NL", 40), ("PT", 40), ("ES", 40), ("CH", 40), ("GB", 40)],
    },
    method! {
        id: "maestro", name: "Maestro", category: Category::Card, pm: "CreditCard",
        brand: "Maestro",
        countries: &[("AT", 20), ("BE", 40), ("FR", 20), ("DE", 20), ("IT", 20), ("LU", 20),
            ("PT", 20), ("ES", 20), ("GB", 20)],
    },
    method! {
        id: "discover", name: "Discover", category: Category::Card, pm: "CreditCard",
        brand: "DISCOVER", countries: CARD_COUNTRIES_WIDE,
    },
    method! {
        id: "jcb", name: "JCB", category: Category::Card, pm: "CreditCard", brand: "JCB",
        countries: CARD_COUNTRIES_WIDE,
    },
    method! {
        id: "bancontact", name: "Bancontact", category: Category::Card, pm: "CreditCard",
        brand: BANCONTACT_BRAND, countries: &[("BE", 100)], is_security_mandatory: true,
        two_phase_flow: false,
    },
    method! {
        id: "cb", name: "Carte Bancaire", category: Category::Card, pm: "CreditCard", brand: "CB",
        countries: &[("FR", 20)], is_security_mandatory: true,
    },
    method! {
        id: "aurore", name: "Aurore", category: Category::Card, pm: "CreditCard", brand: "Aurore",
        countries: &[("FR", 100)], is_security_mandatory: true, is_redirect_only: true,
        two_phase_flow: false,
    },
    method! {
        id: "ideal", name: "iDEAL", category: Category::RealTimeBanking, pm: "iDEAL",
        brand: "iDEAL", countries: &[("NL", 100)], is_redirect_only: true,
    },
    method! {
        id: "bank_transfer", name: "Bank Transfer", category: Category::RealTimeBanking,
        pm: "Bank transfer", brand: "Bank transfer",
        countries: &[("AT", 40), ("BE", 40), ("DE", 40), ("FR", 40), ("NL", 40)],
        is_redirect_only: true, direct_sales_success_code: &[], auth_mode_success_code: &[],
    },
    method! {
        id: "cbc", name: "CBC", category: Category::RealTimeBanking, pm: "CBC Online",
        brand: "CBC Online", countries: &[("BE", 20)], is_redirect_only: true,
    },
    method! {
        id: "kbc", name: "KBC", category: Category::RealTimeBanking, pm: "KBC Online",
        brand: "KBC Online", countries: &[("BE", 40)], is_redirect_only: true,
    },
    method! {
        id: "ing", name: "ING Home'Pay", category: Category::RealTimeBanking, pm: "ING HomePay",
        brand: "ING HomePay", countries: &[("BE", 40)], is_redirect_only: true,
    },
    method! {
        id: "giropay", name: "Giropay", category: Category::RealTimeBanking, pm: "giropay",
        brand: "giropay", countries: &[("DE", 20)], is_redirect_only: true,
    },
    method! {
        id: "sofort_uberweisung", name: "Sofort Überweisung", category: Category::RealTimeBanking,
        pm: "DirectEbanking", brand: "Sofort Uberweisung", countries: &[("DE", 20)],
        is_redirect_only: true,
    },
    method! {
        id: "direct_ebankingat", name: "Sofort Überweisung (AT)",
        category: Category::RealTimeBanking, pm: "DirectEbankingAT", brand: "DirectEbankingAT",
        countries: &[("AT", 20)], is_redirect_only: true,
    },
    method! {
        id: "direct_ebankingch", name: "Sofort Überweisung (CH)",
        category: Category::RealTimeBanking, pm: "DirectEbankingCH", brand: "DirectEbankingCH",
        countries: &[("CH", 20)], is_redirect_only: true,
    },
    method! {
        id: "direct_ebankingde", name: "Sofort Überweisung (DE)",
        category: Category::RealTimeBanking, pm: "DirectEbankingDE", brand: "DirectEbankingDE",
        countries: &[("DE", 20)], is_redirect_only: true,
    },
    method! {
        id: "twint", name: "Twint", category: Category::RealTimeBanking, pm: "TWINT",
        brand: "TWINT",
        countries: &[("BE", 80), ("FR", 100), ("DE", 100), ("IT", 100), ("LU", 100), ("NL", 40),
            ("PT", 100), ("ES", 100), ("CH", 100), ("GB", 100)],
        is_redirect_only: true, two_phase_flow: false,
    },
    method! {
        id: "facilypay3x", name: "FacilyPay 3x", category: Category::RealTimeBanking,
        pm: "FACILYPAY3X", brand: "FACILYPAY3X", countries: &[("FR", 20)],
        three_phase_flow: true, is_redirect_only: true, additional_data_required: true,
        order_line_items_required: true, expected_fields: ONEY_FIELDS,
    },
    method! {
        id: "facilypay4xnf", name: "FacilyPay 4x sans frais", category: Category::RealTimeBanking,
        pm: "FACILYPAY4XNF", brand: "FACILYPAY4XNF", countries: &[("FR", 20)],
        three_phase_flow: true, is_redirect_only: true, additional_data_required: true,
        order_line_items_required: true, expected_fields: ONEY_FIELDS,
    },
    method! {
        id: "pay_pal", name: "PayPal", category: Category::EWallet, pm: "PAYPAL", brand: "PAYPAL",
        countries: &[("AT", 40), ("BE", 40), ("FR", 40), ("DE", 80), ("IT", 60), ("LU", 40),
            ("NL", 40), ("PT", 60), ("ES", 40), ("CH", 40), ("GB", 40)],
        is_redirect_only: true,
    },
    method! {
        id: "paysafecard", name: "Paysafecard", category: Category::PrepaidVouchers,
        pm: "paysafecard", brand: "paysafecard", countries: CARD_COUNTRIES_WIDE,
        is_redirect_only: true, auth_mode_success_code: &[],
    },
    method! {
        id: "intersolve", name: "InterSolve", category: Category::PrepaidVouchers,
        pm: "Intersolve", brand: "Intersolve", countries: &[("NL", 20)], is_redirect_only: true,
    },
    method! {
        id: "klarna", name: "Klarna", category: Category::OpenInvoice, pm: "Open Invoice DE",
        brand: "Open Invoice DE", countries: &[("DE", 40), ("NL", 40)],
        pm_per_country: &[("DE", "Open Invoice DE"), ("NL", "Open Invoice NL")],
        brand_per_country: &[("DE", "Open Invoice DE"), ("NL", "Open Invoice NL")],
        is_redirect_only: true, additional_data_required: true, order_line_items_required: true,
        expected_fields: OPEN_INVOICE_FIELDS,
    },
    method! {
        id: "afterpay", name: "Afterpay", category: Category::OpenInvoice, pm: "Open Invoice NL",
        brand: "Open Invoice NL", countries: &[("DE", 40), ("NL", 40)],
        pm_per_country: &[("DE", "Open Invoice DE"), ("NL", "Open Invoice NL")],
        brand_per_country: &[("DE", "Open Invoice DE"), ("NL", "Open Invoice NL")],
        is_redirect_only: true, additional_data_required: true, order_line_items_required: true,
        expected_fields: OPEN_INVOICE_FIELDS,
    },
    method! {
        id: "klarna_paynow", name: "Klarna Pay Now", category: Category::Klarna,
        pm: "KLARNA_PAYNOW", brand: "KLARNA_PAYNOW",
        countries: &[("AT", 100), ("BE", 100), ("CH", 100), ("DE", 100), ("FI", 80), ("NL", 100),
            ("SE", 100)],
        is_redirect_only: true, order_line_items_required: true, additional_data_required: true,
        expected_fields: KLARNA_FIELDS,
    },
    method! {
        id: "klarna_financing", name: "Klarna Financing", category: Category::Klarna,
        pm: "KLARNA_FINANCING", brand: "KLARNA_FINANCING",
        countries: &[("AT", 100), ("DE", 100), ("FI", 100), ("NO", 100), ("SE", 100), ("GB", 100)],
        is_redirect_only: true, order_line_items_required: true, additional_data_required: true,
        expected_fields: KLARNA_FIELDS,
    },
    method! {
        id: "klarna_banktransfer", name: "Klarna Bank Transfer", category: Category::Klarna,
        pm: "KLARNA_BANK_TRANSFER", brand: "KLARNA_BANK_TRANSFER",
        countries: &[("AT", 100), ("BE", 100), ("CH", 100), ("DE", 100), ("FI", 80), ("NL", 100),
            ("SE", 100)],
        is_redirect_only: true, order_line_items_required: true, additional_data_required: true,
        is_hidden: true, expected_fields: KLARNA_FIELDS,
    },
    method! {
        id: "klarna_directdebit", name: "Klarna Direct Debit", category: Category::Klarna,
        pm: "KLARNA_DIRECT_DEBIT", brand: "KLARNA_DIRECT_DEBIT",
        countries: &[("AT", 100), ("DE", 100), ("NL", 100), ("SE", 100)],
        is_redirect_only: true, order_line_items_required: true, additional_data_required: true,
        is_hidden: true, expected_fields: KLARNA_FIELDS,
    },
];
