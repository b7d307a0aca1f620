//! QR / mobile-money payment gateway client
//!
//! Requests a payment QR from the gateway. When the gateway cannot be reached
//! or answers with something unusable, a locally served mock page stands in so
//! the checkout can continue.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::PaymentConfig;
use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the HMAC signature of a request or callback body
pub const SIGNATURE_HEADER: &str = "x-signature";

/// QR gateway client
#[derive(Clone)]
pub struct QrGatewayClient {
    client: Client,
    api_url: String,
    commerce_id: String,
    api_key: String,
    callback_url: String,
}

/// Where a QR payment page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QrSource {
    Gateway,
    Fallback,
}

/// QR issued for a checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrPayment {
    pub reference: String,
    pub source: QrSource,
    /// Base64 PNG of the QR, when the gateway returned one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_image: Option<String>,
    pub checkout_url: String,
}

/// Request body sent to the gateway
#[derive(Debug, Serialize)]
struct GatewayRequest<'a> {
    commerce_id: &'a str,
    amount: Decimal,
    currency: &'a str,
    reference: &'a str,
    callback_url: &'a str,
}

/// Gateway response
#[derive(Debug, Deserialize)]
struct GatewayResponse {
    qr: Option<String>,
    url: Option<String>,
}

impl QrGatewayClient {
    /// Create a client from the payment configuration
    pub fn new(config: &PaymentConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.qr_api_url.clone(),
            commerce_id: config.commerce_id.clone(),
            api_key: config.api_key.clone(),
            callback_url: config.callback_url.clone(),
        })
    }

    /// Request a QR for `amount`, falling back to the mock page on any failure
    pub async fn request_qr(&self, reference: &str, amount: Decimal, currency: &str) -> QrPayment {
        match self.call_gateway(reference, amount, currency).await {
            Ok(payment) => payment,
            Err(e) => {
                tracing::warn!(reference, error = %e, "QR gateway unavailable, using mock page");
                fallback_payment(reference)
            }
        }
    }

    async fn call_gateway(
        &self,
        reference: &str,
        amount: Decimal,
        currency: &str,
    ) -> AppResult<QrPayment> {
        if self.commerce_id.is_empty() || self.api_key.is_empty() {
            return Err(AppError::PaymentGateway("gateway credentials not configured".to_string()));
        }

        let body = GatewayRequest {
            commerce_id: &self.commerce_id,
            amount,
            currency,
            reference,
            callback_url: &self.callback_url,
        };

        let payload = serde_json::to_vec(&body)
            .map_err(|e| AppError::PaymentGateway(format!("unencodable request: {}", e)))?;
        let signature = sign(&self.api_key, &payload)?;

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header(SIGNATURE_HEADER, signature)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| AppError::PaymentGateway(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::PaymentGateway(format!("{} - {}", status, body)));
        }

        let data: GatewayResponse = response
            .json()
            .await
            .map_err(|e| AppError::PaymentGateway(format!("unparseable response: {}", e)))?;

        let checkout_url = data
            .url
            .ok_or_else(|| AppError::PaymentGateway("response without payment url".to_string()))?;

        tracing::info!(reference, "QR issued by gateway");

        Ok(QrPayment {
            reference: reference.to_string(),
            source: QrSource::Gateway,
            qr_image: data.qr,
            checkout_url,
        })
    }

    /// Callbacks can only be authenticated once an API key is configured
    pub fn signs_callbacks(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Verify the signature of a gateway callback body
    pub fn verify_callback(&self, body: &[u8], signature: &str) -> bool {
        verify_signature(&self.api_key, body, signature)
    }
}

/// Mock payment used when the gateway is unavailable
pub fn fallback_payment(reference: &str) -> QrPayment {
    QrPayment {
        reference: reference.to_string(),
        source: QrSource::Fallback,
        qr_image: None,
        checkout_url: format!("/api/v1/payments/qr/mock/{}", reference),
    }
}

/// Base64 HMAC-SHA256 of `body` keyed with the gateway API key, sent with every QR request
pub fn sign(api_key: &str, body: &[u8]) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(api_key.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid signing key: {}", e)))?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a callback signature
pub fn verify_signature(api_key: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(api_key.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// HTML page standing in for the gateway's QR page
pub fn mock_page(reference: &str) -> String {
    let reference: String = reference
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
  <meta charset="utf-8">
  <title>Pago QR {reference}</title>
</head>
<body>
  <h1>Pago QR (simulado)</h1>
  <p>Referencia: <strong>{reference}</strong></p>
  <p>La pasarela de pago no está disponible. Este código es una simulación.</p>
  <pre>[ QR {reference} ]</pre>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> PaymentConfig {
        PaymentConfig {
            qr_api_url: url.to_string(),
            commerce_id: "COMMERCE-1".to_string(),
            api_key: "key".to_string(),
            callback_url: "http://localhost/callback".to_string(),
            timeout_secs: 1,
            approval_rate: 95,
        }
    }

    #[test]
    fn test_unreachable_gateway_falls_back() {
        // nothing listens on port 9 of localhost
        let client = QrGatewayClient::new(&config("http://127.0.0.1:9/qr")).unwrap();
        let payment = tokio_test::block_on(client.request_qr(
            "QR-00000042",
            Decimal::new(12550, 2),
            "BOB",
        ));
        assert_eq!(payment.source, QrSource::Fallback);
        assert_eq!(payment.checkout_url, "/api/v1/payments/qr/mock/QR-00000042");
        assert!(payment.qr_image.is_none());
    }

    #[test]
    fn test_missing_credentials_fall_back() {
        let mut cfg = config("http://127.0.0.1:9/qr");
        cfg.api_key.clear();
        let client = QrGatewayClient::new(&cfg).unwrap();
        let payment = tokio_test::block_on(client.request_qr("QR-1", Decimal::ONE, "BOB"));
        assert_eq!(payment.source, QrSource::Fallback);
    }

    /// Read one HTTP request (head and body) from a stream
    fn read_request(stream: &mut std::net::TcpStream) -> (String, Vec<u8>) {
        use std::io::Read;

        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stream.read(&mut buf).unwrap();
            raw.extend_from_slice(&buf[..n]);
            if let Some(end) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&raw[..end]).to_string();
                let length = head
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if raw.len() >= end + 4 + length || n == 0 {
                    let body = raw[end + 4..].to_vec();
                    return (head, body);
                }
            }
            if n == 0 {
                return (String::from_utf8_lossy(&raw).to_string(), Vec::new());
            }
        }
    }

    #[test]
    fn test_gateway_request_is_signed() {
        use std::io::Write;

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/qr", listener.local_addr().unwrap());

        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            let reply = r#"{"qr":"iVBORw0KGgo","url":"https://pay.example/QR-00000003"}"#;
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                reply.len(),
                reply
            )
            .unwrap();
            request
        });

        let client = QrGatewayClient::new(&config(&url)).unwrap();
        let payment = tokio_test::block_on(client.request_qr(
            "QR-00000003",
            Decimal::new(4500, 2),
            "BOB",
        ));
        let (head, body) = server.join().unwrap();

        assert_eq!(payment.source, QrSource::Gateway);
        assert_eq!(payment.checkout_url, "https://pay.example/QR-00000003");

        let signature = head
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case(SIGNATURE_HEADER)
                    .then(|| value.trim().to_string())
            })
            .expect("signature header");
        assert!(verify_signature("key", &body, &signature));

        let sent: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(sent["reference"], "QR-00000003");
        assert_eq!(sent["commerce_id"], "COMMERCE-1");
    }

    #[test]
    fn test_signature_round_trip() {
        let body = br#"{"reference":"QR-00000001","status":"paid"}"#;
        let signature = sign("key", body).unwrap();
        assert!(verify_signature("key", body, &signature));
        assert!(!verify_signature("other", body, &signature));
        assert!(!verify_signature("key", b"tampered", &signature));
        assert!(!verify_signature("key", body, "not base64!"));
    }

    #[test]
    fn test_mock_page_strips_markup() {
        let page = mock_page("QR-1<script>");
        assert!(page.contains("QR-1script"));
        assert!(!page.contains("<script>"));
    }
}
