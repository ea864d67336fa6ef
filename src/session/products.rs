// =============================================================================
// Product Catalog — static classification of futures products
// =============================================================================
//
// Maps a product class (the instrument id without its contract-month suffix)
// to its exchange and contract multiplier.  Turnover on these exchanges is
// quoted as price * volume * multiplier, so the multiplier is what turns an
// interval's turnover/volume ratio back into a price.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Exchanges covered by the built-in table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    Shfe,
    Ine,
    Dce,
    Czce,
    Cffex,
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shfe => write!(f, "SHFE"),
            Self::Ine => write!(f, "INE"),
            Self::Dce => write!(f, "DCE"),
            Self::Czce => write!(f, "CZCE"),
            Self::Cffex => write!(f, "CFFEX"),
        }
    }
}

/// Static metadata for one product class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSpec {
    pub short_name: String,
    pub exchange: Exchange,
    pub multiplier: f64,
}

/// Source of per-product metadata.
pub trait ProductMetadata: Send + Sync {
    fn lookup(&self, product_class: &str) -> Option<ProductSpec>;
}

const BUILTIN_PRODUCTS: &[(&str, Exchange, f64)] = &[
    // SHFE
    ("cu", Exchange::Shfe, 5.0),
    ("al", Exchange::Shfe, 5.0),
    ("zn", Exchange::Shfe, 5.0),
    ("pb", Exchange::Shfe, 5.0),
    ("ni", Exchange::Shfe, 1.0),
    ("sn", Exchange::Shfe, 1.0),
    ("au", Exchange::Shfe, 1000.0),
    ("ag", Exchange::Shfe, 15.0),
    ("rb", Exchange::Shfe, 10.0),
    ("wr", Exchange::Shfe, 10.0),
    ("hc", Exchange::Shfe, 10.0),
    ("ss", Exchange::Shfe, 5.0),
    ("fu", Exchange::Shfe, 10.0),
    ("bu", Exchange::Shfe, 10.0),
    ("ru", Exchange::Shfe, 10.0),
    ("sp", Exchange::Shfe, 10.0),
    // INE
    ("sc", Exchange::Ine, 1000.0),
    ("nr", Exchange::Ine, 10.0),
    // DCE
    ("a", Exchange::Dce, 10.0),
    ("b", Exchange::Dce, 10.0),
    ("m", Exchange::Dce, 10.0),
    ("y", Exchange::Dce, 10.0),
    ("p", Exchange::Dce, 10.0),
    ("c", Exchange::Dce, 10.0),
    ("cs", Exchange::Dce, 10.0),
    ("jd", Exchange::Dce, 10.0),
    ("rr", Exchange::Dce, 10.0),
    ("l", Exchange::Dce, 5.0),
    ("v", Exchange::Dce, 5.0),
    ("pp", Exchange::Dce, 5.0),
    ("eg", Exchange::Dce, 10.0),
    ("eb", Exchange::Dce, 5.0),
    ("j", Exchange::Dce, 100.0),
    ("jm", Exchange::Dce, 60.0),
    ("i", Exchange::Dce, 100.0),
    ("fb", Exchange::Dce, 10.0),
    ("bb", Exchange::Dce, 500.0),
    // CZCE
    ("SR", Exchange::Czce, 10.0),
    ("CF", Exchange::Czce, 5.0),
    ("CY", Exchange::Czce, 5.0),
    ("TA", Exchange::Czce, 5.0),
    ("MA", Exchange::Czce, 10.0),
    ("FG", Exchange::Czce, 20.0),
    ("RM", Exchange::Czce, 10.0),
    ("OI", Exchange::Czce, 10.0),
    ("RS", Exchange::Czce, 10.0),
    ("ZC", Exchange::Czce, 100.0),
    ("AP", Exchange::Czce, 10.0),
    ("CJ", Exchange::Czce, 5.0),
    ("SF", Exchange::Czce, 5.0),
    ("SM", Exchange::Czce, 5.0),
    ("UR", Exchange::Czce, 20.0),
    ("SA", Exchange::Czce, 20.0),
    ("WH", Exchange::Czce, 20.0),
    ("PM", Exchange::Czce, 50.0),
    ("RI", Exchange::Czce, 20.0),
    ("LR", Exchange::Czce, 20.0),
    ("JR", Exchange::Czce, 20.0),
    // CFFEX
    ("IF", Exchange::Cffex, 300.0),
    ("IH", Exchange::Cffex, 300.0),
    ("IC", Exchange::Cffex, 200.0),
    ("T", Exchange::Cffex, 10000.0),
    ("TF", Exchange::Cffex, 10000.0),
    ("TS", Exchange::Cffex, 20000.0),
];

/// In-memory product table, seeded from the built-in list.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    products: HashMap<String, ProductSpec>,
}

impl ProductCatalog {
    /// Catalog of the SHFE / INE / DCE / CZCE / CFFEX products.
    pub fn builtin() -> Self {
        let products = BUILTIN_PRODUCTS
            .iter()
            .map(|&(name, exchange, multiplier)| {
                (
                    name.to_string(),
                    ProductSpec {
                        short_name: name.to_string(),
                        exchange,
                        multiplier,
                    },
                )
            })
            .collect();
        Self { products }
    }

    /// Replace the multiplier of known products.  Unknown names are ignored.
    pub fn with_multiplier_overrides(mut self, overrides: &HashMap<String, f64>) -> Self {
        for (name, multiplier) in overrides {
            if let Some(spec) = self.products.get_mut(name) {
                spec.multiplier = *multiplier;
            }
        }
        self
    }

    /// Product classes listed on `exchange`, sorted by name.
    pub fn products_on(&self, exchange: Exchange) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .products
            .values()
            .filter(|p| p.exchange == exchange)
            .map(|p| p.short_name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl ProductMetadata for ProductCatalog {
    fn lookup(&self, product_class: &str) -> Option<ProductSpec> {
        self.products.get(product_class).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_every_exchange() {
        let catalog = ProductCatalog::builtin();
        assert_eq!(catalog.len(), BUILTIN_PRODUCTS.len());
        assert!(catalog.products_on(Exchange::Shfe).contains(&"ni"));
        assert!(catalog.products_on(Exchange::Czce).contains(&"SR"));
        assert_eq!(catalog.products_on(Exchange::Cffex).len(), 6);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let catalog = ProductCatalog::builtin();
        assert_eq!(catalog.lookup("ni").unwrap().exchange, Exchange::Shfe);
        assert!(catalog.lookup("NI").is_none());
    }

    #[test]
    fn overrides_only_touch_known_products() {
        let mut overrides = HashMap::new();
        overrides.insert("ni".to_string(), 2.0);
        overrides.insert("zz".to_string(), 9.0);
        let catalog = ProductCatalog::builtin().with_multiplier_overrides(&overrides);
        assert!((catalog.lookup("ni").unwrap().multiplier - 2.0).abs() < f64::EPSILON);
        assert!(catalog.lookup("zz").is_none());
    }
}
