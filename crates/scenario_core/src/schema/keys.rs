//! Risk-factor key grammar of the scenario dump.
//!
//! Keys take the form `<Type>/<Name>/<position>`, where `position` is the
//! 0-based index into the matching [`RiskFactorSchema`](super::RiskFactorSchema)
//! list.

/// `DiscountCurve/<CCY>/<i>`
pub fn discount_curve(currency: &str, tenor_position: usize) -> String {
    format!("DiscountCurve/{}/{}", currency, tenor_position)
}

/// `IndexCurve/<INDEX>/<i>`
pub fn index_curve(index: &str, tenor_position: usize) -> String {
    format!("IndexCurve/{}/{}", index, tenor_position)
}

/// `FXSpot/<CCY><BASE>/0`
pub fn fx_spot(currency: &str, base: &str) -> String {
    format!("FXSpot/{}{}/0", currency, base)
}

/// `FXVolatility/<CCY><BASE>/<i>`
pub fn fx_volatility(currency: &str, base: &str, expiry_position: usize) -> String {
    format!("FXVolatility/{}{}/{}", currency, base, expiry_position)
}

/// `SwaptionVolatility/<CCY>/<expiry·terms + term>`
pub fn swaption_volatility(currency: &str, flat_position: usize) -> String {
    format!("SwaptionVolatility/{}/{}", currency, flat_position)
}
