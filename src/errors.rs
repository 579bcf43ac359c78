//! Error taxonomy for the booking engine.
//!
//! Three families, mirroring how callers must react:
//!
//! - [`UpstreamError`] — the external booking subsystem was unreachable or
//!   returned something unparseable. Fatal for the day-availability feed,
//!   tolerated per-year for the schedule feed.
//! - [`BookingError`] — business-rule failures during slot selection and
//!   cart construction. Client-facing, carry diagnostic detail so the
//!   caller can re-fetch or pick a different slot. Never retried here.
//! - [`EnquiryError`] — validation and handshake failures of the enquiry
//!   preview/send protocol.
//!
//! Each variant maps to a stable machine-readable code used in HTTP error
//! bodies.

use chrono::NaiveDate;
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::SlotStatus;
use crate::timegrid::TimePoint;

/// Failure talking to the external booking subsystem.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl UpstreamError {
    pub fn code(&self) -> &'static str {
        match self {
            UpstreamError::Request(_) => "upstream_request_failed",
            UpstreamError::InvalidResponse(_) => "upstream_invalid_response",
        }
    }
}

/// Business-rule failure during range selection or cart construction.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("slot not found: {date} {time}")]
    SlotMissing { date: NaiveDate, time: TimePoint },

    #[error("slot chain does not advance at {date} {time}")]
    SlotInvalid { date: NaiveDate, time: TimePoint },

    #[error("empty slot range")]
    InvalidRange,

    #[error("range not contiguous")]
    RangeNotContiguous,

    #[error("slot unavailable: {date} {time}")]
    SlotUnavailable {
        date: NaiveDate,
        time: TimePoint,
        status: SlotStatus,
        available: i64,
        reason: &'static str,
    },
}

impl BookingError {
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::SlotMissing { .. } => "slot_missing",
            BookingError::SlotInvalid { .. } => "slot_invalid",
            BookingError::InvalidRange => "invalid_range",
            BookingError::RangeNotContiguous => "range_not_contiguous",
            BookingError::SlotUnavailable { .. } => "slot_unavailable",
        }
    }

    /// Structured diagnostic detail for error bodies, where a variant
    /// carries any.
    pub fn detail(&self) -> Option<Value> {
        match self {
            BookingError::SlotUnavailable {
                date,
                time,
                status,
                available,
                reason,
            } => Some(json!({
                "date": date,
                "time": time,
                "status": status,
                "available": available,
                "reason": reason,
            })),
            BookingError::SlotMissing { date, time }
            | BookingError::SlotInvalid { date, time } => Some(json!({
                "date": date,
                "time": time,
            })),
            _ => None,
        }
    }
}

/// Validation or handshake failure of the enquiry protocol.
#[derive(Debug, Error)]
pub enum EnquiryError {
    #[error("product_id is invalid")]
    InvalidProductId,

    #[error("name is required")]
    InvalidName,

    #[error("email is invalid")]
    InvalidEmail,

    #[error("enquiry is required")]
    InvalidEnquiry,

    #[error("issued_at is required")]
    IssuedAtRequired,

    #[error("payload_hash is required")]
    PayloadHashRequired,

    #[error("request expired")]
    Expired { now: i64, issued_at: i64, ttl: i64 },

    #[error("payload_hash mismatch")]
    PayloadHashMismatch { expected: String, given: String },

    /// The enquiry could not be written to the audit store; nothing was
    /// delivered.
    #[error("enquiry could not be recorded: {0}")]
    AuditStore(String),
}

impl EnquiryError {
    pub fn code(&self) -> &'static str {
        match self {
            EnquiryError::InvalidProductId => "invalid_product_id",
            EnquiryError::InvalidName => "invalid_name",
            EnquiryError::InvalidEmail => "invalid_email",
            EnquiryError::InvalidEnquiry => "invalid_enquiry",
            EnquiryError::IssuedAtRequired => "issued_at_required",
            EnquiryError::PayloadHashRequired => "payload_hash_required",
            EnquiryError::Expired { .. } => "expired",
            EnquiryError::PayloadHashMismatch { .. } => "payload_hash_mismatch",
            EnquiryError::AuditStore(_) => "audit_store_failed",
        }
    }

    pub fn detail(&self) -> Option<Value> {
        match self {
            EnquiryError::Expired {
                now,
                issued_at,
                ttl,
            } => Some(json!({ "now": now, "issued_at": issued_at, "ttl": ttl })),
            EnquiryError::PayloadHashMismatch { expected, given } => {
                Some(json!({ "expected": expected, "given": given }))
            }
            _ => None,
        }
    }
}
