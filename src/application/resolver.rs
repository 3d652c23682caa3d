use crate::domain::catalog;
use crate::domain::status::{CanonicalStatus, status_by_code};

/// Resolves the canonical status for a brand and raw gateway status code.
///
/// A catalog entry for the brand may force AUTHORIZED (auth-mode success code)
/// or CAPTURED (direct-sales success code) before the base table applies.
/// TWINT has no two-phase flow, so it never resolves to AUTHORIZED.
pub fn resolve_status(brand: &str, code: u16, selected: Option<&[String]>) -> CanonicalStatus {
    let brand = catalog::normalize_brand(brand);
    let status = match catalog::lookup_by_brand(brand, selected) {
        Some(method) if method.auth_mode_success_code.contains(&code) => {
            CanonicalStatus::Authorized
        }
        Some(method) if method.direct_sales_success_code.contains(&code) => {
            CanonicalStatus::Captured
        }
        _ => status_by_code(code),
    };

    if brand.eq_ignore_ascii_case("TWINT") && status == CanonicalStatus::Authorized {
        return CanonicalStatus::Captured;
    }
    status
}
