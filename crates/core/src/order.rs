use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::id::OrderId;

/// Order fields as supplied by a caller (everything except the identifier).
///
/// Used as the create payload and as the full replacement on update. Cost
/// fields are exact decimals; the extended ("total") costs are stored as given
/// and never recomputed from the unit cost and quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    #[serde(rename = "dateOfOrder")]
    pub date_of_order: DateTime<Utc>,

    #[serde(rename = "trackingNumber", default)]
    pub tracking_number: Option<String>,

    #[serde(rename = "shortDescriptOfItem", default)]
    pub description: Option<String>,

    #[serde(rename = "orderQuantity", default)]
    pub quantity: i32,

    #[serde(rename = "costPerItemCNY", default)]
    pub cost_per_item_cny: Decimal,

    #[serde(rename = "totalPerItemCNY", default)]
    pub total_per_item_cny: Decimal,

    #[serde(rename = "costPerItemUSD", default)]
    pub cost_per_item_usd: Decimal,

    #[serde(rename = "totalPerItemUSD", default)]
    pub total_per_item_usd: Decimal,
}

impl OrderDraft {
    /// Attach a store-assigned identifier.
    pub fn with_id(self, id: OrderId) -> Order {
        Order { id, details: self }
    }
}

/// A persisted purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "orderId")]
    pub id: OrderId,

    #[serde(flatten)]
    pub details: OrderDraft,
}
