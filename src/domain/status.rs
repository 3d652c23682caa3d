use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Normalised order payment state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CanonicalStatus {
    #[default]
    Pending,
    Authorized,
    Captured,
    CaptureProcessing,
    Cancelled,
    RefundProcessing,
    RefundRefused,
    Refunded,
    Error,
    Unknown,
}

/// Gateway status code 1, used for the customer cancelling on the payment page.
pub const STATUS_CANCELLED_BY_CUSTOMER: u16 = 1;

/// Maps a raw gateway status code to a canonical status, independent of brand.
pub fn status_by_code(code: u16) -> CanonicalStatus {
    match code {
        // cancelled by customer, authorised and cancelled, deletion waiting/uncertain
        1 | 6 | 61 | 62 => CanonicalStatus::Cancelled,
        // authorised, waiting external result, waiting, not known, to be requested manually
        5 | 50 | 51 | 52 | 59 => CanonicalStatus::Authorized,
        // payment deleted, refund, refund handled by merchant
        7 | 8 | 84 | 85 => CanonicalStatus::Refunded,
        81 => CanonicalStatus::RefundProcessing,
        83 => CanonicalStatus::RefundRefused,
        // payment requested, payment handled by merchant (direct debit)
        9 | 95 => CanonicalStatus::Captured,
        91 => CanonicalStatus::CaptureProcessing,
        // waiting for identification
        41 | 46 => CanonicalStatus::Pending,
        // 0 invalid or incomplete, 82 refund uncertain, 92 payment uncertain
        _ => CanonicalStatus::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case(0, CanonicalStatus::Error)]
    #[case(1, CanonicalStatus::Cancelled)]
    #[case(5, CanonicalStatus::Authorized)]
    #[case(7, CanonicalStatus::Refunded)]
    #[case(9, CanonicalStatus::Captured)]
    #[case(41, CanonicalStatus::Pending)]
    #[case(46, CanonicalStatus::Pending)]
    #[case(51, CanonicalStatus::Authorized)]
    #[case(61, CanonicalStatus::Cancelled)]
    #[case(81, CanonicalStatus::RefundProcessing)]
    #[case(82, CanonicalStatus::Error)]
    #[case(83, CanonicalStatus::RefundRefused)]
    #[case(85, CanonicalStatus::Refunded)]
    #[case(91, CanonicalStatus::CaptureProcessing)]
    #[case(92, CanonicalStatus::Error)]
    #[case(95, CanonicalStatus::Captured)]
    #[case(999, CanonicalStatus::Error)]
    fn test_base_mapping(#[case] code: u16, #[case] expected: CanonicalStatus) {
        assert_eq!(status_by_code(code), expected);
    }

    #[test]
    fn test_status_string_form() {
        assert_eq!(CanonicalStatus::CaptureProcessing.to_string(), "capture_processing");
        assert_eq!(
            CanonicalStatus::from_str("refund_refused").unwrap(),
            CanonicalStatus::RefundRefused
        );
    }
}
