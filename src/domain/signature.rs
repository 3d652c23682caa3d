//! SHA-IN / SHA-OUT signing of gateway parameters.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::collections::BTreeMap;
use subtle::ConstantTimeEq;

use crate::domain::request::GatewayParams;

pub const SIGNATURE_FIELD: &str = "SHASIGN";

/// Fields the gateway covers when it signs a response (SHA-OUT).
///
/// Anything else on a return URL or webhook body, such as the platform's own
/// query parameters, is left out of the digest.
pub const SHA_OUT_PARAMETERS: [&str; 82] = [
    "AAVADDRESS", "AAVCHECK", "AAVMAIL", "AAVNAME", "AAVPHONE", "AAVZIP", "ACCEPTANCE",
    "ALIAS", "ALIAS.ALIASID", "ALIAS.NCERROR", "ALIAS.NCERRORCARDNO", "ALIAS.NCERRORCN",
    "ALIAS.NCERRORCVC", "ALIAS.NCERRORED", "ALIAS.ORDERID", "ALIAS.STATUS",
    "ALIAS.STOREPERMANENTLY", "AMOUNT", "BIC", "BIN", "BRAND", "CARD.BIN", "CARD.BRAND",
    "CARD.CARDHOLDERNAME", "CARD.CARDNUMBER", "CARD.CVC", "CARD.EXPIRYDATE", "CARDNO", "CCCTY",
    "CN", "COLLECTOR_BIC", "COLLECTOR_IBAN", "COMPLUS", "CREATION_STATUS", "CREDITDEBIT",
    "CURRENCY", "CVCCHECK", "DCC_COMMPERCENTAGE", "DCC_CONVAMOUNT", "DCC_CONVCCY",
    "DCC_EXCHRATE", "DCC_EXCHRATESOURCE", "DCC_EXCHRATETS", "DCC_INDICATOR",
    "DCC_MARGINPERCENTAGE", "DCC_VALIDHOURS", "DEVICEID", "DIGESTCARDNO", "ECI", "ED",
    "EMAIL", "ENCCARDNO", "FXAMOUNT", "FXCURRENCY", "IP", "IPCTY", "MANDATEID", "MOBILEMODE",
    "NBREMAILUSAGE", "NBRIPUSAGE", "NBRIPUSAGE_ALLTX", "NBRUSAGE", "NCERROR", "NCERRORCARDNO",
    "NCERRORCN", "NCERRORCVC", "NCERRORED", "ORDERID", "PAYID", "PAYIDSUB", "PAYMENT_REFERENCE",
    "PM", "SCO_CATEGORY", "SCORING", "SEQUENCETYPE", "SIGNDATE", "STATUS", "SUBBRAND",
    "SUBSCRIPTION_ID", "TICKET", "TRXDATE", "VC",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

/// Composes and checks the signature the gateway expects on every parameter set.
#[derive(Debug, Clone)]
pub struct ShaComposer {
    algorithm: HashAlgorithm,
    passphrase: String,
    allowed: Option<&'static [&'static str]>,
}

impl ShaComposer {
    pub fn new(algorithm: HashAlgorithm, passphrase: impl Into<String>) -> Self {
        Self {
            algorithm,
            passphrase: passphrase.into(),
            allowed: None,
        }
    }

    /// Composer for gateway responses: only [`SHA_OUT_PARAMETERS`] are signed.
    pub fn for_responses(algorithm: HashAlgorithm, passphrase: impl Into<String>) -> Self {
        Self {
            allowed: Some(&SHA_OUT_PARAMETERS),
            ..Self::new(algorithm, passphrase)
        }
    }

    /// Computes the uppercase hex digest over `KEY=value{passphrase}` pairs.
    ///
    /// Keys are uppercased and sorted; empty values and the signature field are skipped.
    pub fn compose<'a, I>(&self, params: I) -> String
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let sorted: BTreeMap<String, &str> = params
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(key, value)| (key.to_uppercase(), value.as_str()))
            .filter(|(key, _)| key != SIGNATURE_FIELD)
            .filter(|(key, _)| self.allowed.is_none_or(|allowed| allowed.contains(&key.as_str())))
            .collect();

        let mut plain = String::new();
        for (key, value) in &sorted {
            plain.push_str(key);
            plain.push('=');
            plain.push_str(value);
            plain.push_str(&self.passphrase);
        }

        let digest = match self.algorithm {
            HashAlgorithm::Sha256 => hex::encode(Sha256::digest(plain.as_bytes())),
            HashAlgorithm::Sha512 => hex::encode(Sha512::digest(plain.as_bytes())),
        };
        digest.to_uppercase()
    }

    pub fn sign(&self, params: &GatewayParams) -> String {
        self.compose(params.iter())
    }

    /// Returns true when the `SHASIGN` carried by `params` matches the recomputed one.
    pub fn is_valid(&self, params: &GatewayParams) -> bool {
        let Some(received) = params.get(SIGNATURE_FIELD) else {
            return false;
        };
        let expected = self.sign(params);
        let received = received.to_uppercase();
        expected.as_bytes().ct_eq(received.as_bytes()).into()
    }
}
