//! # Venue Gate
//!
//! A REST facade for a legacy venue-booking marketplace.
//!
//! Venue Gate sits between mobile/webview clients and a legacy booking
//! site. It reads the site's raw availability and schedule feeds,
//! derives a clean per-slot availability view, hands verified bookings
//! over to the legacy cart, and runs a stateless signed handshake for
//! booking enquiries.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌─────────────┐
//! │ Booking site │──▶│ Snapshot       │──▶│  JSON API    │
//! │ (ajax feeds) │   │ derive + merge │   │  (axum)      │
//! └──────────────┘   └───────────────┘   └──────┬──────┘
//!                                               │
//!                         ┌─────────────────────┤
//!                         ▼                     ▼
//!                   ┌───────────┐         ┌───────────┐
//!                   │ Cart form │         │  Enquiry  │
//!                   │ hand-off  │         │ handshake │
//!                   └───────────┘         └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! vgate serve                          # start the API server
//! vgate snapshot 7                     # print a calendar snapshot
//! vgate snapshot 7 --start 2026-03-01 --end 2026-03-31
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`timegrid`] | `"HH:MM"` grid-point arithmetic |
//! | [`errors`] | Booking error taxonomy |
//! | [`upstream`] | Booking-subsystem feed adapter |
//! | [`rules`] | Calendar settings and booking-rule resolution |
//! | [`slots`] | Per-day slot derivation |
//! | [`days`] | Day-map reconciliation |
//! | [`snapshot`] | Full calendar snapshot construction |
//! | [`selection`] | Contiguous slot-range selection |
//! | [`cart`] | Legacy-cart hand-off forms |
//! | [`enquiry`] | Signed enquiry preview/send protocol |
//! | [`taxonomy`] | Filter-taxonomy reader |
//! | [`catalog`] | Product catalog lookup |
//! | [`content`] | News feed and enquiry audit trail |
//! | [`mail`] | Outbound mail transports |
//! | [`server`] | HTTP API server |

pub mod cart;
pub mod catalog;
pub mod config;
pub mod content;
pub mod days;
pub mod enquiry;
pub mod errors;
pub mod mail;
pub mod models;
pub mod rules;
pub mod selection;
pub mod server;
pub mod slots;
pub mod snapshot;
pub mod taxonomy;
pub mod timegrid;
pub mod upstream;
