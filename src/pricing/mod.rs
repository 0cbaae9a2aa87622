use serde::Serialize;

use crate::error::AppError;

/// Inclusive upper bounds (km) and the flat price charged up to each bound.
const STANDARD_TIERS: [PriceTier; 3] = [
    PriceTier { max_km: 5.9, price: 100 },
    PriceTier { max_km: 10.9, price: 200 },
    PriceTier { max_km: 17.0, price: 300 },
];

pub const DEFAULT_TOP_TIER: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceTier {
    pub max_km: f64,
    pub price: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    tiers: Vec<PriceTier>,
    top_tier: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub distance_km: f64,
    pub price: u32,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self {
            tiers: STANDARD_TIERS.to_vec(),
            top_tier: DEFAULT_TOP_TIER,
        }
    }
}

impl PriceTable {
    /// Tiers must have strictly increasing bounds and non-decreasing prices,
    /// and the top tier may not undercut the last bounded tier.
    pub fn new(tiers: Vec<PriceTier>, top_tier: u32) -> Result<Self, AppError> {
        let ordered = tiers.windows(2).all(|pair| {
            pair[0].max_km < pair[1].max_km && pair[0].price <= pair[1].price
        });
        if !ordered {
            return Err(AppError::Internal(
                "price tiers must be sorted by distance and price".to_string(),
            ));
        }

        if tiers
            .iter()
            .any(|tier| !tier.max_km.is_finite() || tier.max_km < 0.0)
        {
            return Err(AppError::Internal(
                "price tier bounds must be finite and non-negative".to_string(),
            ));
        }

        if let Some(last) = tiers.last() {
            if top_tier < last.price {
                return Err(AppError::Internal(format!(
                    "top tier price {top_tier} is below the last tier price {}",
                    last.price
                )));
            }
        }

        Ok(Self { tiers, top_tier })
    }

    pub fn with_top_tier(top_tier: u32) -> Result<Self, AppError> {
        Self::new(STANDARD_TIERS.to_vec(), top_tier)
    }

    pub fn tiers(&self) -> &[PriceTier] {
        &self.tiers
    }

    pub fn top_tier(&self) -> u32 {
        self.top_tier
    }

    pub fn resolve_price(&self, distance_km: f64) -> Result<u32, AppError> {
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(AppError::InvalidDistance(distance_km));
        }

        let price = self
            .tiers
            .iter()
            .find(|tier| distance_km <= tier.max_km)
            .map_or(self.top_tier, |tier| tier.price);

        Ok(price)
    }

    /// Quote for a routed distance in metres. The price comes from the exact
    /// distance; only the reported kilometres are rounded to one decimal.
    pub fn quote_for_meters(&self, distance_m: f64) -> Result<Quote, AppError> {
        let distance_km = distance_m / 1000.0;
        let price = self.resolve_price(distance_km)?;

        Ok(Quote {
            distance_km: (distance_km * 10.0).round() / 10.0,
            price,
        })
    }
}

pub fn resolve_price(distance_km: f64) -> Result<u32, AppError> {
    PriceTable::default().resolve_price(distance_km)
}
