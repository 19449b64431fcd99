use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Provider status string returned for a successful charge or refund.
pub const STATUS_SUCCEEDED: &str = "succeeded";

/// A charge instruction for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: i64,
    pub currency: String,
    pub payment_method_id: String,
}

/// Refund parameters; the intent id comes from the booking being refunded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefundRequest {
    pub amount: Option<i64>,
    pub reason: Option<String>,
}

/// Outcome of a charge attempt. `status` is the provider's status string,
/// passed through verbatim so callers can distinguish declines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeOutcome {
    pub intent_id: String,
    pub status: String,
}

impl ChargeOutcome {
    pub fn is_succeeded(&self) -> bool {
        self.status == STATUS_SUCCEEDED
    }
}

/// External payment gateway adapter.
///
/// Transport errors surface as `Err`; declines surface as `Ok` with a
/// non-succeeded status.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(
        &self,
        request: &PaymentRequest,
    ) -> Result<ChargeOutcome, Box<dyn std::error::Error + Send + Sync>>;

    /// Refund a captured payment. Returns the provider's status string.
    async fn refund(
        &self,
        intent_id: &str,
        request: &RefundRequest,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}
