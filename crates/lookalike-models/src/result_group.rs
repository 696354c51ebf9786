//! Grouping of tagged products by the image they were searched with.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::product::TaggedProduct;

/// Products found for one detected object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultGroup {
    /// Detected object label
    pub name: String,
    /// URL of the crop the products were searched with
    pub cropped_image_url: String,
    pub products: Vec<TaggedProduct>,
}

impl ResultGroup {
    pub fn new(name: impl Into<String>, cropped_image_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cropped_image_url: cropped_image_url.into(),
            products: Vec::new(),
        }
    }

    /// Concatenate the products of several groups, keeping group order.
    pub fn flatten(groups: Vec<ResultGroup>) -> Vec<TaggedProduct> {
        groups.into_iter().flat_map(|g| g.products).collect()
    }
}

/// Ordered map from cropped image URL to its group.
///
/// Membership is decided by URL equality only: two detections whose crops
/// resolve to the same URL share one group. Groups keep first-seen order.
#[derive(Debug, Default)]
pub struct ResultGroups {
    index: HashMap<String, usize>,
    groups: Vec<ResultGroup>,
}

impl ResultGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build groups from a flat product list in one pass.
    pub fn from_products(products: impl IntoIterator<Item = TaggedProduct>) -> Self {
        let mut groups = Self::new();
        for product in products {
            groups.push_product(product);
        }
        groups
    }

    /// Append a product to the group for its URL, creating the group if needed.
    pub fn push_product(&mut self, product: TaggedProduct) {
        let idx = self.slot(&product.category, &product.cropped_image_url);
        self.groups[idx].products.push(product);
    }

    /// Merge a whole group, appending to an existing group with the same URL.
    pub fn insert_group(&mut self, group: ResultGroup) {
        let idx = self.slot(&group.name, &group.cropped_image_url);
        self.groups[idx].products.extend(group.products);
    }

    fn slot(&mut self, name: &str, cropped_image_url: &str) -> usize {
        if let Some(&idx) = self.index.get(cropped_image_url) {
            return idx;
        }
        let idx = self.groups.len();
        self.groups.push(ResultGroup::new(name, cropped_image_url));
        self.index.insert(cropped_image_url.to_string(), idx);
        idx
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn into_vec(self) -> Vec<ResultGroup> {
        self.groups
    }
}
