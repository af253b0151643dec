//! Catalog browsing commands.

use clap::Subcommand;
use orebi_core::{CategoryId, ProductId, TagId};
use orebi_storefront::catalog::ListingKind;
use rust_decimal::Decimal;

use super::Shop;
use crate::{CliResult, output};

#[derive(Subcommand)]
pub enum ProductsAction {
    /// Products added in the last week
    NewArrivals,
    /// Discounted products
    SpecialOffers,
    /// Best-selling products
    BestSellers,
    /// Every product
    All,
    /// Products matching categories, tags and price ranges
    Filter {
        /// Category id (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Tag id (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Price range as LOW-HIGH, e.g. 50-150 (repeatable)
        #[arg(long = "price", value_parser = parse_price_range)]
        prices: Vec<(Decimal, Decimal)>,
    },
    /// One product in detail
    Show {
        /// Product id
        id: String,
    },
    /// Search product names and descriptions
    Search {
        /// Text to look for
        query: String,
    },
}

/// Parse `LOW-HIGH` into a pair of amounts.
fn parse_price_range(s: &str) -> Result<(Decimal, Decimal), String> {
    let (low, high) = s
        .split_once('-')
        .ok_or_else(|| format!("expected LOW-HIGH, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<Decimal>()
            .map_err(|e| format!("invalid amount '{v}': {e}"))
    };
    Ok((parse(low)?, parse(high)?))
}

pub async fn products(shop: &Shop, action: ProductsAction) -> CliResult {
    let catalog = shop.catalog();
    match action {
        ProductsAction::NewArrivals => {
            output::products(&catalog.load_listing(ListingKind::NewArrivals).await?);
        }
        ProductsAction::SpecialOffers => {
            output::products(&catalog.load_listing(ListingKind::SpecialOffers).await?);
        }
        ProductsAction::BestSellers => {
            output::products(&catalog.load_listing(ListingKind::BestSellers).await?);
        }
        ProductsAction::All => {
            output::products(&catalog.load_listing(ListingKind::All).await?);
        }
        ProductsAction::Filter {
            categories,
            tags,
            prices,
        } => {
            let selection = {
                let mut filters = shop.filters();
                for id in categories {
                    filters.toggle_category(CategoryId::new(id));
                }
                for id in tags {
                    filters.toggle_tag(TagId::new(id));
                }
                for (low, high) in prices {
                    let range = filters.add_price_range(low, high)?;
                    filters.toggle_price_range_selection(range.id);
                }
                filters.clone()
            };
            output::products(&catalog.load_filtered(&selection).await?);
        }
        ProductsAction::Show { id } => {
            output::product_detail(&catalog.load_product(&ProductId::new(id)).await?);
        }
        ProductsAction::Search { query } => {
            catalog.load_listing(ListingKind::All).await?;
            output::products(&catalog.search(&query));
        }
    }
    Ok(())
}

pub async fn categories(shop: &Shop) -> CliResult {
    for category in shop.catalog().load_categories().await? {
        output::line(&format!("{}\t{}", category.id, category.name));
    }
    Ok(())
}

pub async fn tags(shop: &Shop) -> CliResult {
    for tag in shop.catalog().load_tags().await? {
        output::line(&format!("{}\t{}", tag.id, tag.name));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_range() {
        assert_eq!(
            parse_price_range("50-150").unwrap(),
            (Decimal::from(50), Decimal::from(150))
        );
        assert_eq!(
            parse_price_range(" 9.99 - 20 ").unwrap(),
            (Decimal::new(999, 2), Decimal::from(20))
        );
        assert!(parse_price_range("50").is_err());
        assert!(parse_price_range("a-b").is_err());
    }
}
