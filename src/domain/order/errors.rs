// ============================================================================
// Order Validation Errors
// ============================================================================
//
// Every message here is safe to return to the client verbatim.
//

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("items[{index}].productId is required")]
    MissingProductId { index: usize },

    #[error("items[{index}].quantity must be at least 1, got {quantity}")]
    InvalidQuantity { index: usize, quantity: i64 },

    #[error("items[{index}].price must be a non-negative number, got {price}")]
    InvalidPrice { index: usize, price: f64 },
}

impl ValidationError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::MalformedBody(_) => "malformed_body",
            ValidationError::BodyTooLarge { .. } => "body_too_large",
            ValidationError::MissingField { .. } => "missing_field",
            ValidationError::MissingProductId { .. } => "missing_product_id",
            ValidationError::InvalidQuantity { .. } => "invalid_quantity",
            ValidationError::InvalidPrice { .. } => "invalid_price",
        }
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        ValidationError::MalformedBody(err.to_string())
    }
}
