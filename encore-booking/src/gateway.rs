use async_trait::async_trait;
use uuid::Uuid;

use encore_core::payment::{
    ChargeOutcome, PaymentGateway, PaymentRequest, RefundRequest, STATUS_SUCCEEDED,
};

/// Stand-in gateway for local runs and tests.
///
/// Magic payment-method ids drive the outcome: `pm_declined*` produces a
/// decline, `pm_outage` a transport error (useful for tripping the gateway
/// circuit breaker). Everything else succeeds.
pub struct MockPaymentGateway;

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn charge(
        &self,
        request: &PaymentRequest,
    ) -> Result<ChargeOutcome, Box<dyn std::error::Error + Send + Sync>> {
        if request.payment_method_id == "pm_outage" {
            return Err("simulated payment gateway outage".into());
        }
        if request.payment_method_id.starts_with("pm_declined") {
            return Ok(ChargeOutcome {
                intent_id: format!("mock_pi_{}", Uuid::new_v4().simple()),
                status: "card_declined".to_string(),
            });
        }
        Ok(ChargeOutcome {
            intent_id: format!("mock_pi_{}", Uuid::new_v4().simple()),
            status: STATUS_SUCCEEDED.to_string(),
        })
    }

    async fn refund(
        &self,
        _intent_id: &str,
        request: &RefundRequest,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        if request.reason.as_deref() == Some("simulate-failure") {
            return Ok("failed".to_string());
        }
        Ok(STATUS_SUCCEEDED.to_string())
    }
}
