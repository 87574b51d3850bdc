use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A resolved order, as recorded in the fill ledger.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    /// Name of the algorithm that placed the order.
    pub algo: String,
    /// Traded symbol.
    pub symbol: String,
    /// Timestamp of the tick the order filled on.
    pub at: DateTime<Utc>,
    /// Signed quantity: positive buys, negative sells.
    pub quantity: i64,
    /// Execution price.
    pub price: f64,
}

impl Fill {
    /// Returns the signed cash value (`quantity × price`).
    pub fn value(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}
