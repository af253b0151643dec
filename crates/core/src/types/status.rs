//! Status enums shared by the storefront stores.

use serde::{Deserialize, Serialize};

/// Lifecycle of the most recent operation on a store.
///
/// Every network-facing store operation moves `Idle → Loading` and then to
/// `Succeeded` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

impl OperationStatus {
    /// Whether an operation is currently in flight.
    #[must_use]
    pub const fn is_loading(self) -> bool {
        matches!(self, Self::Loading)
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Payment status attached to an order.
///
/// The backend reports free-form strings; well-known values map to variants
/// and anything else is preserved in [`PaymentStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    /// No payment recorded yet (also the default when the backend omits it).
    #[default]
    Pending,
    Completed,
    Failed,
    Cancelled,
    Other(String),
}

impl From<String> for PaymentStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "completed" | "success" | "paid" => Self::Completed,
            "failed" | "error" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Other(s),
        }
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        status.to_string()
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_status_default_is_idle() {
        assert_eq!(OperationStatus::default(), OperationStatus::Idle);
        assert!(OperationStatus::Loading.is_loading());
        assert!(!OperationStatus::Failed.is_loading());
    }

    #[test]
    fn test_payment_status_from_backend_strings() {
        assert_eq!(PaymentStatus::from("PAID".to_string()), PaymentStatus::Completed);
        assert_eq!(PaymentStatus::from("pending".to_string()), PaymentStatus::Pending);
        assert_eq!(
            PaymentStatus::from("Refunded".to_string()),
            PaymentStatus::Other("Refunded".to_string())
        );
    }

    #[test]
    fn test_payment_status_serde() {
        let status: PaymentStatus = serde_json::from_str("\"canceled\"").unwrap();
        assert_eq!(status, PaymentStatus::Cancelled);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"Cancelled\"");
        assert_eq!(PaymentStatus::default().to_string(), "Pending");
    }
}
