//! Product models returned by visual search.

use std::cmp::Ordering;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Category used for matches against the whole uploaded image.
pub const INITIAL_CATEGORY: &str = "Initial";

/// Text shown wherever a product carries no usable price.
pub const PRICE_NOT_AVAILABLE: &str = "Price not available";

/// Price attached to a visual match.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Price {
    /// Display string as provided upstream (e.g. "$24.99*")
    #[serde(rename = "value", default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,

    /// Parsed numeric amount
    #[serde(rename = "extracted_value", default, skip_serializing_if = "Option::is_none")]
    pub numeric_value: Option<f64>,

    /// Currency symbol or code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// A purchasable product found by visual search.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Product {
    #[serde(default)]
    pub title: String,

    /// Product page URL
    #[serde(default)]
    pub link: String,

    /// Thumbnail image URL
    #[serde(default)]
    pub thumbnail: String,

    /// Retailer or site name
    #[serde(default)]
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
}

impl Product {
    /// Display price, or [`PRICE_NOT_AVAILABLE`] when there is none.
    pub fn price_display(&self) -> &str {
        self.price
            .as_ref()
            .and_then(|p| p.display_value.as_deref())
            .filter(|v| !v.is_empty())
            .unwrap_or(PRICE_NOT_AVAILABLE)
    }

    /// Numeric price, if present and a real number.
    pub fn numeric_price(&self) -> Option<f64> {
        self.price
            .as_ref()
            .and_then(|p| p.numeric_value)
            .filter(|v| !v.is_nan())
    }

    /// Attach the origin of this match.
    pub fn tagged(self, category: impl Into<String>, cropped_image_url: impl Into<String>) -> TaggedProduct {
        TaggedProduct {
            product: self,
            category: category.into(),
            cropped_image_url: cropped_image_url.into(),
        }
    }
}

/// A product together with the detection it was found for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaggedProduct {
    #[serde(flatten)]
    pub product: Product,

    /// Detected object label, or [`INITIAL_CATEGORY`] for whole-image matches
    pub category: String,

    /// Image the search was run against
    pub cropped_image_url: String,
}

/// Price ordering requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PriceSort {
    PriceAsc,
    PriceDesc,
}

/// Stable sort by numeric price. Products without a price always go last.
pub fn sort_by_price(products: &mut [TaggedProduct], order: PriceSort) {
    products.sort_by(|a, b| match (a.product.numeric_price(), b.product.numeric_price()) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            match order {
                PriceSort::PriceAsc => ord,
                PriceSort::PriceDesc => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
