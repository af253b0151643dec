//! Client-side product search.

use super::Product;

/// Products whose name or description contains `query`, ignoring case.
///
/// A blank query matches nothing.
#[must_use]
pub fn search<'a>(products: &'a [Product], query: &str) -> Vec<&'a Product> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    products
        .iter()
        .filter(|product| {
            product.name.to_lowercase().contains(&needle)
                || product.description.to_lowercase().contains(&needle)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::RawProduct;
    use crate::catalog::normalize;

    fn product(id: &str, name: &str, description: &str) -> Product {
        normalize(RawProduct {
            id: Some(id.into()),
            name: Some(name.to_string()),
            description: Some(description.to_string()),
            ..RawProduct::default()
        })
        .unwrap()
    }

    #[test]
    fn test_search_matches_name_and_description() {
        let products = vec![
            product("1", "Leather Bag", "Brown"),
            product("2", "Cap", "Fits every bag"),
            product("3", "Shoes", "Running"),
        ];

        let ids: Vec<&str> = search(&products, "BAG").iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_blank_query_matches_nothing() {
        let products = vec![product("1", "Cap", "Blue")];
        assert!(search(&products, "  ").is_empty());
    }
}
