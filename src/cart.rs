//! Cart hand-off form construction.
//!
//! The marketplace cart lives on the legacy site, so a booking is handed
//! over as a browser form POST whose field names the legacy cart expects
//! verbatim. Before building the form we re-verify the requested range
//! against a fresh snapshot: the slots must still exist, chain
//! contiguously, and every one of them must be bookable right now.

use serde::{Deserialize, Serialize};

use chrono::NaiveDate;

use crate::errors::BookingError;
use crate::models::{AtomicSlot, SlotStatus};
use crate::selection;
use crate::timegrid::TimePoint;

const CART_ACTION: &str = "dopbsp_woocommerce_add_to_cart";

/// A booking hand-off request as received from the client. Field names
/// follow the legacy tester contract.
#[derive(Debug, Clone, Deserialize)]
pub struct CartCommand {
    pub calendar_id: u32,
    pub date: NaiveDate,
    pub start_hour: TimePoint,
    pub end_hour: TimePoint,
    /// Absent means "resolve the product from the calendar".
    #[serde(default)]
    pub product_id: Option<u64>,
    #[serde(default = "default_no_items")]
    pub no_items: u32,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_currency")]
    pub currency_code: String,
}

fn default_no_items() -> u32 {
    1
}

fn default_language() -> String {
    "ja".to_string()
}

fn default_currency() -> String {
    "JPY".to_string()
}

/// The complete form a browser must POST to the legacy cart.
#[derive(Debug, Clone, Serialize)]
pub struct CartForm {
    pub action_url: String,
    pub method: &'static str,
    /// Ordered name/value pairs; the legacy cart parses them as a nested
    /// PHP-style array, so names carry bracketed paths.
    pub fields: Vec<(String, String)>,
    pub price_total: u64,
    /// The verified selection the form was built from, for auditability.
    pub slots: Vec<AtomicSlot>,
}

/// Re-verifies the range against `slots` and builds the hand-off form.
///
/// `product_id` is the already-resolved catalog product; resolution from
/// the calendar happens at the HTTP layer.
pub fn build_cart_form(
    slots: &[AtomicSlot],
    cart_url: &str,
    command: &CartCommand,
    product_id: u64,
) -> Result<CartForm, BookingError> {
    let chain = selection::select_range(slots, command.date, command.start_hour, command.end_hour)?;

    for slot in &chain {
        if !slot.is_bookable() {
            let reason = if slot.status == SlotStatus::Booked || slot.available <= 0 {
                "booked"
            } else {
                "unavailable"
            };
            return Err(BookingError::SlotUnavailable {
                date: slot.date,
                time: slot.time_start,
                status: slot.status,
                available: slot.available,
                reason,
            });
        }
    }

    let price_total: u64 = chain.iter().map(|s| s.price).sum();

    let mut fields: Vec<(String, String)> = vec![
        ("action".into(), CART_ACTION.into()),
        ("dopbsp_frontend_ajax_request".into(), "true".into()),
        ("calendar_id".into(), command.calendar_id.to_string()),
        ("language".into(), command.language.clone()),
        ("currency_code".into(), command.currency_code.clone()),
        (item_field("check_in"), command.date.to_string()),
        (item_field("check_out"), String::new()),
        (item_field("start_hour"), command.start_hour.to_string()),
        (item_field("end_hour"), command.end_hour.to_string()),
        (item_field("no_items"), command.no_items.to_string()),
        (item_field("price"), price_total.to_string()),
        (item_field("price_total"), price_total.to_string()),
        (item_field("extras_price"), "0".into()),
        (item_field("discount_price"), "0".into()),
        (item_field("coupon_price"), "0".into()),
        (item_field("fees_price"), "0".into()),
        (item_field("deposit_price"), "0".into()),
    ];

    for slot in &chain {
        let hour = slot.time_start.to_string();
        fields.push((history_field(&hour, "available"), "1".into()));
        fields.push((history_field(&hour, "bind"), "0".into()));
        fields.push((history_field(&hour, "price"), slot.price.to_string()));
        fields.push((history_field(&hour, "promo"), "0".into()));
        fields.push((history_field(&hour, "status"), "available".into()));
    }

    fields.push(("product_id".into(), product_id.to_string()));

    Ok(CartForm {
        action_url: cart_url.to_string(),
        method: "POST",
        fields,
        price_total,
        slots: chain,
    })
}

fn item_field(name: &str) -> String {
    format!("cart_data[0][{name}]")
}

fn history_field(hour: &str, name: &str) -> String {
    format!("cart_data[0][days_hours_history][{hour}][{name}]")
}

/// Renders the form as a self-submitting HTML page for the webview
/// bridge. Values are attribute-escaped; names come from fixed templates.
pub fn render_bridge_html(form: &CartForm) -> String {
    let mut inputs = String::new();
    for (name, value) in &form.fields {
        inputs.push_str(&format!(
            "<input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
            escape_attr(name),
            escape_attr(value)
        ));
    }
    format!(
        "<!doctype html>\n<html><body onload=\"document.forms[0].submit()\">\n\
         <form method=\"POST\" action=\"{}\">\n{}</form>\n\
         <p>Redirecting to cart…</p>\n</body></html>\n",
        escape_attr(&form.action_url),
        inputs
    )
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
