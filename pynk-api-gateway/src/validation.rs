//! Checks storefront and kitchen payloads before anything reaches the order
//! service, collecting every offending field rather than stopping at the first.

use std::sync::LazyLock;

use pynk_proto::order_service::{
    CreateOrderPayload, CustomerContact, DeliveryMethod, MenuItemIdAndQuantity, TelegramIdentity,
};
use regex::Regex;

use crate::error::{ApiError, FieldError};
use crate::models::{CreateOrderRequest, CustomerRequest, OfflineOrderRequest};

pub const MAX_QUANTITY: f64 = 99.0;
pub const MAX_NOTES_CHARS: usize = 1000;
pub const LANGUAGES: [&str; 2] = ["en", "de"];

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// Trimmed value, or `None` when absent or blank.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_delivery_method(method: &str) -> Option<DeliveryMethod> {
    match method {
        "pickup" => Some(DeliveryMethod::Pickup),
        "delivery" => Some(DeliveryMethod::Delivery),
        _ => None,
    }
}

fn check_notes(notes: Option<&str>, errors: &mut Vec<FieldError>) {
    if notes.is_some_and(|n| n.chars().count() > MAX_NOTES_CHARS) {
        errors.push(FieldError::new(
            "notes",
            format!("must be at most {MAX_NOTES_CHARS} characters"),
        ));
    }
}

fn check_email(field: &str, email: Option<&str>, errors: &mut Vec<FieldError>) -> Option<String> {
    let email = non_blank(email)?;
    if !is_valid_email(&email) {
        errors.push(FieldError::new(field, "must be a valid email address"));
    }
    Some(email)
}

fn contact(customer: &CustomerRequest, errors: &mut Vec<FieldError>) -> CustomerContact {
    let email = check_email("customer.email", customer.email.as_deref(), errors);
    let language = non_blank(customer.language.as_deref());
    if let Some(language) = &language {
        if !LANGUAGES.contains(&language.as_str()) {
            errors.push(FieldError::new("customer.language", "must be en or de"));
        }
    }
    CustomerContact {
        name: non_blank(customer.name.as_deref()),
        phone: non_blank(customer.phone.as_deref()),
        email,
        language,
    }
}

fn client_total_cents(total: f64) -> Option<i32> {
    let cents = (total * 100.0).round();
    (cents >= 0.0 && cents <= f64::from(i32::MAX)).then_some(cents as i32)
}

/// Turns a storefront checkout into the order service payload.
pub fn order_payload(request: CreateOrderRequest) -> Result<CreateOrderPayload, ApiError> {
    let mut errors = Vec::new();

    if request.items.is_empty() {
        errors.push(FieldError::new("items", "must contain at least one item"));
    }
    let mut items = Vec::with_capacity(request.items.len());
    for (i, item) in request.items.iter().enumerate() {
        let menu_item_id = item.id.as_text().parse::<i32>().ok().filter(|id| *id > 0);
        if menu_item_id.is_none() {
            errors.push(FieldError::new(format!("items[{i}].id"), "must be a menu item id"));
        }
        if item.name.trim().is_empty() {
            errors.push(FieldError::new(format!("items[{i}].name"), "must not be empty"));
        }
        if !(item.price.is_finite() && item.price >= 0.0) {
            errors.push(FieldError::new(format!("items[{i}].price"), "must not be negative"));
        }
        let quantity = item.quantity;
        let whole = quantity.fract() == 0.0 && (1.0..=MAX_QUANTITY).contains(&quantity);
        if !whole {
            errors.push(FieldError::new(
                format!("items[{i}].quantity"),
                "must be a whole number between 1 and 99",
            ));
        }
        if let (Some(menu_item_id), true) = (menu_item_id, whole) {
            items.push(MenuItemIdAndQuantity {
                menu_item_id,
                quantity: quantity as i32,
            });
        }
    }

    let delivery_method = parse_delivery_method(&request.delivery.method);
    if delivery_method.is_none() {
        errors.push(FieldError::new("delivery.method", "must be pickup or delivery"));
    }
    let customer = contact(&request.customer.unwrap_or_default(), &mut errors);
    check_notes(request.notes.as_deref(), &mut errors);
    if !(request.total.is_finite() && request.total >= 0.0) {
        errors.push(FieldError::new("total", "must not be negative"));
    }

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let telegram = request
        .telegram_user_id
        .map(|id| id.as_text())
        .filter(|id| !id.is_empty())
        .map(|telegram_user_id| TelegramIdentity {
            telegram_user_id,
            username: non_blank(request.telegram_username.as_deref()),
            first_name: non_blank(request.telegram_first_name.as_deref()),
            last_name: non_blank(request.telegram_last_name.as_deref()),
        });

    Ok(CreateOrderPayload {
        items,
        delivery_method: delivery_method.unwrap_or(DeliveryMethod::Pickup) as i32,
        customer: Some(customer),
        notes: non_blank(request.notes.as_deref()),
        telegram,
        client_total_cents: client_total_cents(request.total),
    })
}

/// Turns an order the staff typed in into the order service payload.
/// Unknown delivery methods fall back to pickup.
pub fn offline_order_payload(request: OfflineOrderRequest) -> Result<CreateOrderPayload, ApiError> {
    let mut errors = Vec::new();

    let name = non_blank(request.customer_name.as_deref());
    if name.is_none() {
        errors.push(FieldError::new("customerName", "is required"));
    }
    if request.items.is_empty() {
        errors.push(FieldError::new("items", "must contain at least one item"));
    }
    for (i, item) in request.items.iter().enumerate() {
        if !(1..=MAX_QUANTITY as i32).contains(&item.quantity) {
            errors.push(FieldError::new(
                format!("items[{i}].quantity"),
                "must be a whole number between 1 and 99",
            ));
        }
    }
    let email = check_email("email", request.email.as_deref(), &mut errors);
    check_notes(request.notes.as_deref(), &mut errors);

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let delivery_method = match request.delivery_method.as_deref() {
        Some("delivery") => DeliveryMethod::Delivery,
        _ => DeliveryMethod::Pickup,
    };

    Ok(CreateOrderPayload {
        items: request
            .items
            .iter()
            .map(|item| MenuItemIdAndQuantity {
                menu_item_id: item.id,
                quantity: item.quantity,
            })
            .collect(),
        delivery_method: delivery_method as i32,
        customer: Some(CustomerContact {
            name,
            phone: non_blank(request.phone.as_deref()),
            email,
            language: None,
        }),
        notes: non_blank(request.notes.as_deref()),
        telegram: None,
        client_total_cents: None,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn checkout(value: serde_json::Value) -> CreateOrderRequest {
        serde_json::from_value(value).unwrap()
    }

    fn fields(err: ApiError) -> Vec<String> {
        match err {
            ApiError::Validation(fields) => fields.into_iter().map(|f| f.field).collect(),
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_checkout_maps_to_payload() {
        let payload = order_payload(checkout(json!({
            "items": [
                {"id": 1, "name": "Samosa Chaat", "price": 8.5, "quantity": 2},
                {"id": "3", "name": "Mango Lassi", "price": 4.5, "quantity": 1, "name_de": "Mango Lassi"}
            ],
            "delivery": {"method": "delivery", "address": {"city": "Berlin"}},
            "telegramUserId": 4242,
            "telegramUsername": "asha",
            "customer": {"name": " Asha ", "email": "asha@example.com", "language": "de"},
            "notes": "  ",
            "total": 21.5
        })))
        .unwrap();

        assert_eq!(payload.items.len(), 2);
        assert_eq!(payload.items[1].menu_item_id, 3);
        assert_eq!(payload.items[0].quantity, 2);
        assert_eq!(payload.delivery_method, DeliveryMethod::Delivery as i32);
        let customer = payload.customer.unwrap();
        assert_eq!(customer.name.as_deref(), Some("Asha"));
        assert_eq!(customer.language.as_deref(), Some("de"));
        assert_eq!(payload.notes, None);
        let telegram = payload.telegram.unwrap();
        assert_eq!(telegram.telegram_user_id, "4242");
        assert_eq!(telegram.username.as_deref(), Some("asha"));
        assert_eq!(payload.client_total_cents, Some(2150));
    }

    #[test]
    fn test_checkout_reports_every_bad_field() {
        let err = order_payload(checkout(json!({
            "items": [
                {"id": "abc", "name": "", "price": -1, "quantity": 0},
                {"id": 2, "name": "Naan", "price": 2, "quantity": 1.5}
            ],
            "delivery": {"method": "drone"},
            "customer": {"email": "not-an-email", "language": "fr"},
            "notes": "x".repeat(1001),
            "total": -3
        })))
        .unwrap_err();

        assert_eq!(
            fields(err),
            vec![
                "items[0].id",
                "items[0].name",
                "items[0].price",
                "items[0].quantity",
                "items[1].quantity",
                "delivery.method",
                "customer.email",
                "customer.language",
                "notes",
                "total",
            ]
        );
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let err = order_payload(checkout(json!({
            "items": [],
            "delivery": {"method": "pickup"},
            "total": 0
        })))
        .unwrap_err();
        assert_eq!(fields(err), vec!["items"]);
    }

    #[test]
    fn test_quantity_bounds() {
        for (quantity, ok) in [(1, true), (99, true), (100, false), (-1, false)] {
            let result = order_payload(checkout(json!({
                "items": [{"id": 1, "name": "Dal", "price": 7, "quantity": quantity}],
                "delivery": {"method": "pickup"},
                "total": 7
            })));
            assert_eq!(result.is_ok(), ok, "quantity {quantity}");
        }
    }

    #[test]
    fn test_offline_order_falls_back_to_pickup() {
        let request: OfflineOrderRequest = serde_json::from_value(json!({
            "customerName": "Walk-in",
            "deliveryMethod": "carrier pigeon",
            "items": [{"id": 5, "quantity": 2}]
        }))
        .unwrap();
        let payload = offline_order_payload(request).unwrap();
        assert_eq!(payload.delivery_method, DeliveryMethod::Pickup as i32);
        assert_eq!(payload.customer.unwrap().name.as_deref(), Some("Walk-in"));
        assert!(payload.telegram.is_none());
    }

    #[test]
    fn test_offline_order_needs_name_and_items() {
        let request: OfflineOrderRequest =
            serde_json::from_value(json!({"customerName": "  ", "deliveryMethod": "delivery"}))
                .unwrap();
        assert_eq!(
            fields(offline_order_payload(request).unwrap_err()),
            vec!["customerName", "items"]
        );
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@b.de"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
    }
}
