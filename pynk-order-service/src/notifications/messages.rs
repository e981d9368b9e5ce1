//! Message texts. Pure functions of their inputs.

use crate::models::OrderItem;
use crate::money::format_euros;

pub const CONFIRMATION_LINES: usize = 5;
pub const WELCOME: &str = "Welcome! I will notify you about your order updates here.";

pub fn order_created_admin(
    code: &str,
    items: &[OrderItem],
    total_cents: i32,
    customer_name: Option<&str>,
) -> String {
    let Some(first) = items.first() else {
        return "New order received.".to_string();
    };
    let mut text = format!("New order #{code}: {} x{}", first.item_name, first.quantity);
    if items.len() > 1 {
        text.push_str(&format!(" +{} more", items.len() - 1));
    }
    text.push_str(&format!(" | Total {}", format_euros(total_cents)));
    if let Some(name) = customer_name.filter(|n| !n.trim().is_empty()) {
        text.push_str(&format!(" | {name}"));
    }
    text
}

pub fn order_confirmation(code: &str, items: &[OrderItem], total_cents: i32) -> String {
    let mut lines = vec![format!("Thank you! Your order #{code} has been received.")];
    lines.extend(items.iter().take(CONFIRMATION_LINES).map(|item| {
        format!(
            "• {} x{} ({})",
            item.item_name,
            item.quantity,
            format_euros(item.line_total_cents)
        )
    }));
    if items.len() > CONFIRMATION_LINES {
        lines.push(format!("… and {} more", items.len() - CONFIRMATION_LINES));
    }
    lines.push(format!("Total: {}", format_euros(total_cents)));
    lines.push("We will message you here when your order status changes.".to_string());
    lines.join("\n")
}

pub fn status_update(code: &str, status: &str) -> String {
    match status {
        "preparing" => format!("Your order #{code} is being prepared."),
        "ready" => format!("Your order #{code} is ready!"),
        "fulfilled" => format!("Your order #{code} has been completed. Enjoy your meal!"),
        "cancelled" => format!("Your order #{code} has been cancelled."),
        other => format!("Your order #{code} status updated: {other}"),
    }
}

pub fn review_request(code: &str) -> String {
    format!("How was your order #{code}? Please rate it from 1 to 5 and leave a comment in the app.")
}

pub fn review_received_admin(code: &str, rating: Option<i32>, comment: Option<&str>) -> String {
    let rating = rating.map_or_else(|| "n/a".to_string(), |r| r.to_string());
    format!(
        "Review for #{code}: rating={rating} comment={}",
        comment.unwrap_or_default()
    )
}

pub fn review_thanks(code: &str) -> String {
    format!("Thank you for reviewing order #{code}!")
}

pub fn login_code(code: &str) -> String {
    format!("Chef login code: {code} (valid 5 min)")
}
