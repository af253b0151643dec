//! Cart commands.

use clap::Subcommand;
use orebi_core::ProductId;

use super::Shop;
use crate::{CliResult, output};

#[derive(Subcommand)]
pub enum CartAction {
    /// Show cart contents and totals
    Show,
    /// Add a product
    Add {
        /// Product id
        product_id: String,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a line
    Update {
        /// Cart item id or product id
        item_id: String,

        /// New quantity
        quantity: u32,
    },
    /// Remove a line
    Remove {
        /// Cart item id or product id
        item_id: String,
    },
    /// Empty the cart
    Clear,
    /// Apply a coupon code
    Coupon {
        /// Coupon code
        code: String,
    },
}

pub async fn run(shop: &Shop, action: CartAction) -> CliResult {
    let session = shop.require_session()?;
    let (user, token) = (session.user_id(), &session.token);
    let cart = shop.cart();

    let snapshot = cart.fetch_cart(user, token).await?;
    let result = match action {
        CartAction::Show => Ok(snapshot),
        CartAction::Add {
            product_id,
            quantity,
        } => {
            let product_id = ProductId::new(product_id);
            let product = shop.catalog().client().fetch_product(&product_id).await.ok();
            cart.add_item(user, token, &product_id, quantity, product)
                .await
        }
        CartAction::Update { item_id, quantity } => {
            cart.update_quantity(user, token, &item_id, quantity).await
        }
        CartAction::Remove { item_id } => cart.remove_item(user, token, &item_id).await,
        CartAction::Clear => cart.clear_cart(user, token).await,
        CartAction::Coupon { code } => cart.apply_coupon(user, token, &code).await,
    };

    // The local cart reflects whatever succeeded, so persist before reporting
    shop.persist()?;
    output::cart(&result?);
    Ok(())
}
