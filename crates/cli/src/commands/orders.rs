//! Order history and payment status.

use clap::Subcommand;
use orebi_core::OrderId;

use super::Shop;
use crate::{CliResult, output};

#[derive(Subcommand)]
pub enum OrdersAction {
    /// List past orders
    List,
    /// Show one order
    Show {
        /// Order id
        order_id: String,
    },
}

pub async fn run(shop: &Shop, action: OrdersAction) -> CliResult {
    let session = shop.require_session()?;
    let orders = shop.orders();
    match action {
        OrdersAction::List => {
            let history = orders
                .fetch_user_orders(session.user_id(), &session.token)
                .await?;
            if history.is_empty() {
                output::line("No orders yet");
            }
            for order in &history {
                output::order_summary(order);
            }
        }
        OrdersAction::Show { order_id } => {
            let order = orders
                .fetch_order_by_id(&OrderId::new(order_id), session.user_id(), &session.token)
                .await?;
            output::order_detail(&order);
        }
    }
    Ok(())
}

pub async fn payment_status(shop: &Shop, order_id: &str) -> CliResult {
    let session = shop.require_session()?;
    let order_id = OrderId::new(order_id);
    let status = shop
        .payments()
        .fetch_payment_status(&order_id, session.user_id(), &session.token)
        .await?;
    let order_id = status.order_id.as_ref().unwrap_or(&order_id);
    output::line(&format!("Order {order_id}: {}", status.status));
    if let Some(message) = &status.message {
        output::line(message);
    }
    Ok(())
}
