//! Payment processor webhook payloads.
//!
//! The processor posts one JSON document per event, tagged by `event_type`. Only `payment_captured` and
//! `payment_failed` carry behaviour; every other event type is acknowledged and ignored so the processor does not
//! retry it. Party references are optional at the wire level and validated here, so a malformed event is logged and
//! dropped rather than failing the delivery.

use escrow_engine::db_types::{NewOrder, ProfileId};
use mes_common::MinorUnits;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Could not convert payment event into a new order. {0}.")]
pub struct EventConversionError(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event_type")]
pub enum PaymentEvent {
    PaymentCaptured(PaymentCapturedEvent),
    PaymentFailed(PaymentFailedEvent),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCapturedEvent {
    /// The processor's unique id for the captured payment. Idempotency key for order creation.
    pub payment_ref: Option<String>,
    pub client_id: Option<String>,
    pub seller_id: Option<String>,
    pub amount: MinorUnits,
    pub currency: String,
    #[serde(default)]
    pub platform_fee: MinorUnits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailedEvent {
    pub payment_ref: Option<String>,
    pub client_id: Option<String>,
    pub reason: Option<String>,
}

impl TryFrom<PaymentCapturedEvent> for NewOrder {
    type Error = EventConversionError;

    fn try_from(ev: PaymentCapturedEvent) -> Result<Self, Self::Error> {
        let external_payment_ref = non_empty(ev.payment_ref, "payment_ref")?;
        let client_id = non_empty(ev.client_id, "client_id")?;
        let seller_id = non_empty(ev.seller_id, "seller_id")?;
        if ev.currency.trim().is_empty() {
            return Err(EventConversionError("The currency field is empty".to_string()));
        }
        Ok(NewOrder {
            client_id: ProfileId::from(client_id),
            seller_id: ProfileId::from(seller_id),
            amount: ev.amount,
            currency: ev.currency,
            platform_fee: ev.platform_fee,
            external_payment_ref,
        })
    }
}

fn non_empty(value: Option<String>, field: &str) -> Result<String, EventConversionError> {
    value
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| EventConversionError(format!("The {field} field is missing or empty")))
}

#[cfg(test)]
mod test {
    use escrow_engine::db_types::NewOrder;
    use mes_common::MinorUnits;

    use super::PaymentEvent;

    #[test]
    fn captured_event_deserializes_and_converts() {
        let json = r#"{
            "event_type": "payment_captured",
            "payment_ref": "pay_123",
            "client_id": "client-1",
            "seller_id": "seller-1",
            "amount": 10000,
            "currency": "EUR",
            "platform_fee": 350
        }"#;
        let ev: PaymentEvent = serde_json::from_str(json).unwrap();
        let PaymentEvent::PaymentCaptured(ev) = ev else { panic!("wrong variant") };
        let order = NewOrder::try_from(ev).unwrap();
        assert_eq!(order.external_payment_ref, "pay_123");
        assert_eq!(order.amount, MinorUnits::from(10_000));
        assert_eq!(order.platform_fee, MinorUnits::from(350));
    }

    #[test]
    fn missing_party_refs_are_conversion_errors() {
        let json = r#"{
            "event_type": "payment_captured",
            "payment_ref": "pay_123",
            "client_id": "client-1",
            "amount": 10000,
            "currency": "EUR"
        }"#;
        let ev: PaymentEvent = serde_json::from_str(json).unwrap();
        let PaymentEvent::PaymentCaptured(ev) = ev else { panic!("wrong variant") };
        let err = NewOrder::try_from(ev).unwrap_err();
        assert!(err.to_string().contains("seller_id"));
    }

    #[test]
    fn unknown_event_types_fold_into_other() {
        let json = r#"{ "event_type": "payout_settled", "payout_ref": "po_99" }"#;
        let ev: PaymentEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(ev, PaymentEvent::Other));
    }
}
