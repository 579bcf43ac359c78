//! Enquiry preview/send protocol.
//!
//! The handshake is stateless: `preview` stamps the enquiry with the
//! server clock and an HMAC over the canonical payload, the client echoes
//! both back, and `send` recomputes the HMAC to prove the payload was not
//! altered in between and is not stale. No server-side session exists.
//!
//! Canonical form is the JSON serialization of [`CanonicalEnquiry`] with
//! its declared field order; both sides of the handshake must produce
//! byte-identical JSON for the tags to agree.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::catalog::Product;
use crate::config::Config;
use crate::content::{ContentStore, EnquiryRecord};
use crate::errors::EnquiryError;
use crate::mail::{MailTransport, OutboundMail};

type HmacSha256 = Hmac<Sha256>;

/// Domain separator mixed into the HMAC key so the enquiry secret cannot
/// be replayed against any other signed surface.
const KEY_SCOPE: &str = "venue_gate_enquiry";

/// Tolerated forward clock skew between client and server, in seconds.
const MAX_FUTURE_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct EnquiryInput {
    pub product_id: u64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub enquiry: String,
    #[serde(default)]
    pub issued_at: Option<i64>,
    #[serde(default)]
    pub payload_hash: Option<String>,
}

/// Field order here is the wire contract; changing it invalidates every
/// outstanding preview.
#[derive(Serialize)]
struct CanonicalEnquiry<'a> {
    product_id: u64,
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    enquiry: &'a str,
    issued_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnquiryPreview {
    pub issued_at: i64,
    pub payload_hash: String,
    pub to: String,
    pub cc: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnquirySendResult {
    /// "success", or "partial_success" when the enquiry was recorded but
    /// mail delivery failed.
    pub status: &'static str,
    /// Audit record id.
    pub id: String,
    pub mail_sent: bool,
    pub to: String,
    pub cc: String,
    pub subject: String,
    pub payload_hash: String,
}

/// Validates the user-supplied fields common to preview and send.
fn validate(input: &EnquiryInput) -> Result<(), EnquiryError> {
    if input.product_id == 0 {
        return Err(EnquiryError::InvalidProductId);
    }
    if input.name.trim().is_empty() {
        return Err(EnquiryError::InvalidName);
    }
    if !is_plausible_email(&input.email) {
        return Err(EnquiryError::InvalidEmail);
    }
    if input.enquiry.trim().is_empty() {
        return Err(EnquiryError::InvalidEnquiry);
    }
    Ok(())
}

fn is_plausible_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Computes the payload tag: `"sha256:" + hex(HMAC-SHA256(json, key))`
/// where the key is the hex SHA-256 of the scoped secret.
pub fn payload_hash(secret: &str, input: &EnquiryInput, issued_at: i64) -> String {
    let canonical = serde_json::to_string(&CanonicalEnquiry {
        product_id: input.product_id,
        name: &input.name,
        email: &input.email,
        phone: &input.phone,
        enquiry: &input.enquiry,
        issued_at,
    })
    .expect("canonical enquiry serialization cannot fail");

    let key = hex::encode(Sha256::digest(format!("{secret}|{KEY_SCOPE}")));
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(canonical.as_bytes());
    format!("sha256:{}", hex::encode(mac.finalize().into_bytes()))
}

/// Stamps and signs an enquiry without sending it.
pub fn preview(
    config: &Config,
    product: &Product,
    input: &EnquiryInput,
    now: i64,
) -> Result<EnquiryPreview, EnquiryError> {
    validate(input)?;
    let issued_at = now;
    let hash = payload_hash(&config.enquiry.secret, input, issued_at);
    let (to, cc) = route(config, product);
    let subject = subject(config, product);
    let body = body(product, input, issued_at);
    Ok(EnquiryPreview {
        issued_at,
        payload_hash: hash,
        to,
        cc,
        subject,
        body,
    })
}

/// Checks the stamp and tag the client echoed back.
fn verify(config: &Config, input: &EnquiryInput, now: i64) -> Result<i64, EnquiryError> {
    let issued_at = input.issued_at.ok_or(EnquiryError::IssuedAtRequired)?;
    let given = input
        .payload_hash
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(EnquiryError::PayloadHashRequired)?;

    let ttl = config.enquiry.ttl_secs;
    if now - issued_at > ttl || issued_at > now + MAX_FUTURE_SKEW_SECS {
        return Err(EnquiryError::Expired {
            now,
            issued_at,
            ttl,
        });
    }

    let expected = payload_hash(&config.enquiry.secret, input, issued_at);
    if expected != given {
        return Err(EnquiryError::PayloadHashMismatch {
            expected,
            given: given.to_string(),
        });
    }
    Ok(issued_at)
}

/// Verifies, records, and delivers an enquiry.
///
/// The audit record is written before the delivery attempt; a mail
/// failure therefore degrades to `partial_success` instead of losing the
/// enquiry. An audit-store failure aborts the send before any delivery.
pub async fn send(
    config: &Config,
    product: &Product,
    content: &dyn ContentStore,
    mail: &dyn MailTransport,
    input: &EnquiryInput,
    now: i64,
) -> Result<EnquirySendResult, EnquiryError> {
    validate(input)?;
    let issued_at = verify(config, input, now)?;

    let (to, cc) = route(config, product);
    let subject = subject(config, product);
    let body = body(product, input, issued_at);

    let record_id = uuid::Uuid::new_v4().to_string();
    let record = EnquiryRecord {
        id: record_id.clone(),
        product_id: input.product_id,
        name: input.name.clone(),
        email: input.email.clone(),
        phone: input.phone.clone(),
        enquiry: input.enquiry.clone(),
        issued_at,
        to: to.clone(),
        cc: cc.clone(),
        recorded_at: now,
    };
    content
        .record_enquiry(record)
        .await
        .map_err(|err| EnquiryError::AuditStore(err.to_string()))?;

    let outbound = OutboundMail {
        to: to.clone(),
        cc: cc.clone(),
        subject: subject.clone(),
        body,
    };
    let mail_sent = match mail.send(&outbound).await {
        Ok(()) => true,
        Err(err) => {
            eprintln!("enquiry mail delivery failed: {err}");
            false
        }
    };

    Ok(EnquirySendResult {
        status: if mail_sent { "success" } else { "partial_success" },
        id: record_id,
        mail_sent,
        to,
        cc,
        subject,
        payload_hash: payload_hash(&config.enquiry.secret, input, issued_at),
    })
}

/// Recipient routing: a valid product-owner address wins, then the
/// configured override, then the site admin. Cc always goes to the admin.
fn route(config: &Config, product: &Product) -> (String, String) {
    let admin = config.site.admin_email.clone();
    let to = product
        .owner_email
        .as_deref()
        .filter(|e| is_plausible_email(e))
        .map(str::to_string)
        .or_else(|| {
            let override_to = config.enquiry.to_email.trim();
            is_plausible_email(override_to).then(|| override_to.to_string())
        })
        .unwrap_or_else(|| admin.clone());
    (to, admin)
}

fn subject(config: &Config, product: &Product) -> String {
    sanitize_header(
        &config
            .enquiry
            .subject_template
            .replace("{product}", &product.name),
    )
}

fn body(product: &Product, input: &EnquiryInput, issued_at: i64) -> String {
    let sent = chrono::DateTime::from_timestamp(issued_at, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_default();
    format!(
        "Product: {} (ID {})\nName: {}\nEmail: {}\nPhone: {}\nSent: {}\n\n{}\n",
        product.name,
        product.id,
        sanitize_header(&input.name),
        sanitize_header(&input.email),
        sanitize_header(&input.phone),
        sent,
        input.enquiry.trim(),
    )
}

/// Strips CR/LF from values that end up in mail headers.
fn sanitize_header(s: &str) -> String {
    s.replace(['\r', '\n'], " ").trim().to_string()
}
