//! Terminal rendering.

#![allow(clippy::print_stdout)]

use orebi_core::format_amount;
use orebi_storefront::cart::CartSnapshot;
use orebi_storefront::catalog::Product;
use orebi_storefront::orders::Order;
use rust_decimal::Decimal;

pub fn line(text: &str) {
    println!("{text}");
}

pub fn products(products: &[Product]) {
    if products.is_empty() {
        println!("No products found");
        return;
    }
    for product in products {
        let discount = if product.discount > Decimal::ZERO {
            format!(" (-{}%)", product.discount.normalize())
        } else {
            String::new()
        };
        println!(
            "{}\t{}\t{}{discount}",
            product.id,
            product.name,
            format_amount(product.price)
        );
    }
}

pub fn product_detail(product: &Product) {
    println!("{} ({})", product.name, product.id);
    println!("  Price:       {}", format_amount(product.price));
    if product.discount > Decimal::ZERO {
        println!("  Discount:    {}%", product.discount.normalize());
    }
    println!("  Color:       {}", product.color);
    if let Some(available) = product.available_quantity {
        println!("  In stock:    {available}");
    }
    if let Some(sku) = &product.sku {
        println!("  SKU:         {sku}");
    }
    println!("  {}", product.description);
}

pub fn cart(snapshot: &CartSnapshot) {
    if snapshot.is_empty() {
        println!("Your cart is empty");
        return;
    }
    for cart_line in &snapshot.lines {
        println!(
            "{}\t{} x {}\t{}\t{}",
            cart_line.item_key(),
            cart_line.quantity,
            cart_line.name,
            format_amount(cart_line.effective_price()),
            cart_line
                .line_total()
                .map_or_else(|| "-".to_string(), format_amount)
        );
        if let Some(error) = &cart_line.error {
            println!("\t(details unavailable: {error})");
        }
    }
    println!("Subtotal:  {}", format_amount(snapshot.subtotal));
    println!("Shipping:  {}", format_amount(snapshot.shipping_charge));
    if let Some(coupon) = &snapshot.applied_coupon {
        println!(
            "Coupon:    {coupon} (-{})",
            format_amount(snapshot.discount_amount)
        );
    }
    println!("Total:     {}", format_amount(snapshot.grand_total()));
}

pub fn order_summary(order: &Order) {
    let created = order
        .created_at_utc()
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    println!(
        "Order {}\t{}\t{}\t{}",
        order.id,
        created,
        format_amount(order.total_amount + order.shipping_charge),
        order.payment_status
    );
}

pub fn order_detail(order: &Order) {
    order_summary(order);
    for item in &order.items {
        let name = item
            .product_name
            .as_deref()
            .unwrap_or_else(|| item.product_id.as_str());
        println!(
            "  {} x {}\t{}",
            item.quantity,
            name,
            format_amount(item.price)
        );
    }
    if let Some(coupon) = order.applied_coupon.as_deref().filter(|c| !c.is_empty()) {
        println!("  Coupon:   {coupon} (-{})", format_amount(order.discount));
    }
    println!("  Shipping: {}", format_amount(order.shipping_charge));
}
