use super::errors::ValidationError;
use super::value_objects::Order;

/// Structural checks applied after decoding and before an event is built.
///
/// Identifiers must contain something other than whitespace. Quantities start
/// at 1 and prices must be finite and non-negative. An empty item list passes.
/// Checks run in field order so the first failure reported is stable.
pub fn validate(order: &Order) -> Result<(), ValidationError> {
    if order.order_id.trim().is_empty() {
        return Err(ValidationError::MissingField { field: "orderId" });
    }

    if order.customer_id.trim().is_empty() {
        return Err(ValidationError::MissingField { field: "customerId" });
    }

    for (index, item) in order.items.iter().enumerate() {
        if item.product_id.trim().is_empty() {
            return Err(ValidationError::MissingProductId { index });
        }

        if item.quantity < 1 {
            return Err(ValidationError::InvalidQuantity {
                index,
                quantity: item.quantity,
            });
        }

        if !item.price.is_finite() || item.price < 0.0 {
            return Err(ValidationError::InvalidPrice {
                index,
                price: item.price,
            });
        }
    }

    Ok(())
}
