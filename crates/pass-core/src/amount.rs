//! # Amounts
//!
//! Monetary amounts as sent to the payment provider.
//! Requests carry major units (dollars); the provider wants minor units (cents).

use crate::error::{PaymentError, PaymentResult};
use serde::{Deserialize, Serialize};

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    JPY,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
            Currency::CAD => "cad",
            Currency::AUD => "aud",
            Currency::JPY => "jpy",
        }
    }

    /// Number of decimal places (JPY has none)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// A strictly positive amount in the smallest currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Amount {
    minor_units: i64,
    currency: Currency,
}

impl Amount {
    /// Convert a major-unit value (e.g. `12.34` dollars) to minor units.
    ///
    /// Rounds half away from zero. Rejects NaN, infinities and anything
    /// that does not come out strictly positive.
    pub fn from_major_units(value: f64, currency: Currency) -> PaymentResult<Self> {
        let multiplier = 10_f64.powi(currency.decimal_places() as i32);
        let scaled = (value * multiplier).round();

        if !scaled.is_finite() || scaled <= 0.0 {
            return Err(PaymentError::InvalidAmount {
                message: format!("{} is not a positive finite amount", value),
            });
        }
        if scaled > i64::MAX as f64 {
            return Err(PaymentError::InvalidAmount {
                message: format!("{} is too large", value),
            });
        }

        Ok(Self {
            minor_units: scaled as i64,
            currency,
        })
    }

    /// Create from minor units directly
    pub fn from_minor_units(minor_units: i64, currency: Currency) -> PaymentResult<Self> {
        if minor_units <= 0 {
            return Err(PaymentError::InvalidAmount {
                message: format!("{} minor units is not positive", minor_units),
            });
        }
        Ok(Self {
            minor_units,
            currency,
        })
    }

    pub fn minor_units(&self) -> i64 {
        self.minor_units
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }
}
