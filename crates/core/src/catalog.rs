//! Static product -> category lookup.
//!
//! Categories are assigned from a fixed table, never learned from data. The
//! table can be extended or overridden from configuration.

use std::collections::BTreeMap;

use crate::domain::product::Category;

#[derive(Debug, Clone, Copy)]
struct CategorySeed {
    product: &'static str,
    category: Category,
}

const CATEGORY_SEEDS: &[CategorySeed] = &[
    CategorySeed { product: "Pasta (500g pack)", category: Category::GroceriesPantry },
    CategorySeed { product: "Tomato Sauce (jar)", category: Category::GroceriesPantry },
    CategorySeed { product: "Parmesan Cheese (grated)", category: Category::GroceriesPantry },
    CategorySeed { product: "Rice (1kg bag)", category: Category::GroceriesPantry },
    CategorySeed { product: "Olive Oil (1L bottle)", category: Category::GroceriesPantry },
    CategorySeed { product: "Cereal (cornflakes box)", category: Category::GroceriesPantry },
    CategorySeed { product: "Red Wine (bottle)", category: Category::Beverages },
    CategorySeed { product: "Mineral Water (6-pack)", category: Category::Beverages },
    CategorySeed { product: "Orange Juice (1L carton)", category: Category::Beverages },
    CategorySeed { product: "Coffee (ground, 250g pack)", category: Category::Beverages },
    CategorySeed { product: "Green Tea (box of tea bags)", category: Category::Beverages },
    CategorySeed { product: "Bananas (1kg)", category: Category::FreshProduce },
    CategorySeed { product: "Apples (1kg)", category: Category::FreshProduce },
    CategorySeed { product: "Tomatoes (1kg)", category: Category::FreshProduce },
    CategorySeed { product: "Lettuce (1 head)", category: Category::FreshProduce },
    CategorySeed { product: "Chicken Breast (500g)", category: Category::MeatDairy },
    CategorySeed { product: "Yogurt (4-pack)", category: Category::MeatDairy },
    CategorySeed { product: "Milk (1L bottle)", category: Category::MeatDairy },
    CategorySeed { product: "Toilet Paper (12-roll pack)", category: Category::Household },
    CategorySeed { product: "Laundry Detergent (2L bottle)", category: Category::Household },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCatalog {
    categories: BTreeMap<String, Category>,
}

impl CategoryCatalog {
    /// An empty table; every lookup resolves to `Category::Unknown`.
    pub fn empty() -> Self {
        Self { categories: BTreeMap::new() }
    }

    /// Later entries win over the seeded table.
    pub fn with_overrides<I, S>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (S, Category)>,
        S: Into<String>,
    {
        for (product, category) in overrides {
            self.categories.insert(product.into(), category);
        }
        self
    }

    pub fn category_of(&self, product: &str) -> Category {
        self.categories.get(product).copied().unwrap_or(Category::Unknown)
    }

    pub fn products_in(&self, category: Category) -> Vec<&str> {
        self.categories
            .iter()
            .filter(|(_, assigned)| **assigned == category)
            .map(|(product, _)| product.as_str())
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, Category)> {
        self.categories.iter().map(|(product, category)| (product.as_str(), *category))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self::empty()
            .with_overrides(CATEGORY_SEEDS.iter().map(|seed| (seed.product, seed.category)))
    }
}
