use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::models::{PaymentError, RazorpayOrder};

type HmacSha256 = Hmac<Sha256>;

/// Checks a checkout signature: hex HMAC-SHA256 of `order_id|payment_id`
/// keyed with the API secret. The digest comparison is constant time.
pub fn verify_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        debug!("Signature is not valid hex");
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Converts a fee to the smallest currency unit (paise for INR).
pub fn to_minor_units(amount: f64) -> Option<i64> {
    let minor = (amount * 100.0).round();
    (minor.is_finite() && minor > 0.0).then_some(minor as i64)
}

/// Razorpay errors look like `{"error": {"code": "...", "description": "..."}}`.
fn gateway_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/description").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

pub struct RazorpayClient {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.razorpay_base_url.trim_end_matches('/').to_string(),
            key_id: config.razorpay_key_id.clone(),
            key_secret: config.razorpay_key_secret.clone(),
        }
    }

    pub async fn create_order(&self, amount: i64, currency: &str, receipt: &str) -> Result<RazorpayOrder, PaymentError> {
        let url = format!("{}/orders", self.base_url);
        debug!("Creating Razorpay order for receipt {}", receipt);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({
                "amount": amount,
                "currency": currency,
                "receipt": receipt,
                "notes": { "appointment_id": receipt }
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = gateway_message(&body);
            error!("Razorpay order creation failed ({}): {}", status, message);
            return Err(PaymentError::Gateway(message));
        }

        serde_json::from_str(&body).map_err(|e| PaymentError::Gateway(format!("Unexpected order payload: {}", e)))
    }

    pub fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_signature(&self.key_secret, order_id, payment_id, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, message: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_is_accepted() {
        let signature = sign("secret", "order_1|pay_1");
        assert!(verify_signature("secret", "order_1", "pay_1", &signature));
    }

    #[test]
    fn tampered_payment_is_rejected() {
        let signature = sign("secret", "order_1|pay_1");
        assert!(!verify_signature("secret", "order_1", "pay_2", &signature));
        assert!(!verify_signature("other", "order_1", "pay_1", &signature));
        assert!(!verify_signature("secret", "order_1", "pay_1", "not-hex"));
    }

    #[test]
    fn fees_convert_to_minor_units() {
        assert_eq!(to_minor_units(500.0), Some(50000));
        assert_eq!(to_minor_units(199.99), Some(19999));
        assert_eq!(to_minor_units(0.0), None);
        assert_eq!(to_minor_units(f64::NAN), None);
    }

    #[test]
    fn gateway_errors_are_unwrapped() {
        let body = r#"{"error":{"code":"BAD_REQUEST_ERROR","description":"Authentication failed"}}"#;
        assert_eq!(gateway_message(body), "Authentication failed");
        assert_eq!(gateway_message("oops"), "oops");
    }
}
