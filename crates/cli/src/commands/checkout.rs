//! Interactive checkout.
//!
//! Places the order, starts payment and prints the widget parameters. The
//! widget's outcome is then read from stdin as one of:
//!
//! ```text
//! completed <order-id>
//! dismissed
//! error <message>
//! ```

use clap::Args;
use orebi_core::OrderId;
use orebi_storefront::checkout::{
    Checkout, CustomerForm, Navigation, PaymentWidget, SubmitError, WidgetError, WidgetOutcome,
    WidgetRequest,
};
use orebi_storefront::error::ValidationError;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::Shop;
use crate::{CliResult, output};

#[derive(Args)]
pub struct CheckoutArgs {
    #[arg(long)]
    first_name: String,

    #[arg(long)]
    last_name: String,

    #[arg(long)]
    email: String,

    /// Phone number including the country code, e.g. +94771234567
    #[arg(long)]
    phone: String,

    #[arg(long)]
    address: String,

    #[arg(long)]
    city: String,

    /// Defaults to `OREBI_DEFAULT_COUNTRY`
    #[arg(long)]
    country: Option<String>,
}

impl CheckoutArgs {
    fn into_form(self, default_country: &str) -> CustomerForm {
        CustomerForm {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            city: self.city,
            country: self
                .country
                .unwrap_or_else(|| default_country.to_string()),
        }
    }
}

/// Widget that hands its parameters to the terminal user.
struct TerminalWidget;

impl PaymentWidget for TerminalWidget {
    fn start_payment(&self, request: &WidgetRequest) -> Result<(), WidgetError> {
        let json =
            serde_json::to_string_pretty(request).map_err(|e| WidgetError(e.to_string()))?;
        output::line("Payment widget parameters:");
        output::line(&json);
        Ok(())
    }
}

/// Parse one line of widget outcome.
fn parse_outcome(line: &str) -> Result<WidgetOutcome, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    match word.to_ascii_lowercase().as_str() {
        "completed" if !rest.is_empty() => Ok(WidgetOutcome::Completed(OrderId::new(rest))),
        "completed" => Err("completed needs an order id".to_string()),
        "dismissed" => Ok(WidgetOutcome::Dismissed),
        "error" if !rest.is_empty() => Ok(WidgetOutcome::Error(rest.to_string())),
        "error" => Ok(WidgetOutcome::Error("Payment failed".to_string())),
        _ => Err(format!(
            "expected 'completed <order-id>', 'dismissed' or 'error <message>', got '{line}'"
        )),
    }
}

/// Read outcomes from stdin until one parses; end of input means the widget
/// was dismissed.
async fn read_outcome() -> std::io::Result<WidgetOutcome> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    output::line("Enter the payment outcome (completed <order-id> | dismissed | error <message>):");
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse_outcome(&line) {
            Ok(outcome) => return Ok(outcome),
            Err(message) => output::line(&message),
        }
    }
    Ok(WidgetOutcome::Dismissed)
}

fn navigate(navigation: &Navigation) {
    match navigation {
        Navigation::Cart { message } | Navigation::Error { message } => output::line(message),
        Navigation::SignIn { .. } => output::line("Please sign in to check out"),
        Navigation::Success { order_id } => {
            output::line(&format!("Payment completed for order {order_id}"));
        }
        Navigation::Cancel { .. } => output::line("Payment cancelled"),
    }
    output::line(&format!("-> {}", navigation.path()));
}

pub async fn run(shop: &Shop, args: CheckoutArgs) -> CliResult {
    let form = args.into_form(&shop.config().default_country);

    if let Some(session) = shop.session() {
        shop.cart()
            .fetch_cart(session.user_id(), &session.token)
            .await?;
    }

    let mut checkout = Checkout::new(shop);
    let order = match checkout.enter().await {
        Ok(order) => order,
        Err(navigation) => {
            navigate(&navigation);
            return Ok(());
        }
    };
    output::order_summary(&order);

    match checkout.submit(&form, &TerminalWidget).await {
        Ok(_) => {}
        Err(SubmitError::Invalid(errors)) => {
            return Err(ValidationError::CustomerForm(errors).into());
        }
        Err(SubmitError::Navigate(navigation)) => {
            navigate(&navigation);
            return Ok(());
        }
        Err(SubmitError::OutOfOrder(e)) => return Err(e.into()),
    }

    let outcome = read_outcome().await?;
    let navigation = checkout.resolve(outcome).await?;
    shop.persist()?;
    navigate(&navigation);
    Ok(())
}
