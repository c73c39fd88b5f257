use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{CoreError, GeoPoint};

/// Lower bound of the relaxed budget window, as a fraction of the requested minimum.
const RELAXED_MIN_FACTOR: Decimal = Decimal::from_parts(8, 0, 0, false, 1);
/// Upper bound of the relaxed budget window, as a fraction of the requested maximum.
const RELAXED_MAX_FACTOR: Decimal = Decimal::from_parts(12, 0, 0, false, 1);

/// A vendor's advertised price band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
}

/// A requested budget; either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BudgetRange {
    min: Option<Decimal>,
    max: Option<Decimal>,
}

impl BudgetRange {
    /// An open budget that admits every price.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Build a validated budget.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidBudget`] for negative bounds or `min > max`.
    pub fn new(min: Option<Decimal>, max: Option<Decimal>) -> Result<Self, CoreError> {
        if min.is_some_and(|m| m.is_sign_negative()) || max.is_some_and(|m| m.is_sign_negative())
        {
            return Err(CoreError::InvalidBudget(
                "budget bounds must be non-negative".to_string(),
            ));
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(CoreError::InvalidBudget(format!(
                    "min {lo} is greater than max {hi}"
                )));
            }
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub fn min(&self) -> Option<Decimal> {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> Option<Decimal> {
        self.max
    }

    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// The ±20% window used by the lower-priority tiers: `[min × 0.8, max × 1.2]`.
    #[must_use]
    pub fn relaxed(&self) -> Self {
        Self {
            min: self.min.map(|m| m * RELAXED_MIN_FACTOR),
            max: self.max.map(|m| m * RELAXED_MAX_FACTOR),
        }
    }

    /// True when `price` overlaps this budget. Open bounds always pass.
    #[must_use]
    pub fn admits(&self, price: &PriceRange) -> bool {
        self.max.is_none_or(|max| price.min <= max) && self.min.is_none_or(|min| price.max >= min)
    }
}

/// Read projection of an active, approved vendor.
///
/// `attributes` holds category-specific fields validated at write time by
/// the vendor service; search passes them through untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorRecord {
    pub id: i64,
    pub name: String,
    pub business_name: Option<String>,
    /// Service-level taxonomy id.
    pub service_type: String,
    pub city: String,
    pub area: Option<String>,
    pub location: GeoPoint,
    pub pricing: PriceRange,
    pub rating: f64,
    pub review_count: i32,
    pub verified: bool,
    pub is_active: bool,
    pub attributes: Map<String, Value>,
}

impl VendorRecord {
    /// Case-insensitive substring match against the vendor and business names.
    #[must_use]
    pub fn name_contains(&self, text: &str) -> bool {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        self.name.to_lowercase().contains(&needle)
            || self
                .business_name
                .as_deref()
                .is_some_and(|b| b.to_lowercase().contains(&needle))
    }
}
