//! # Reports Service
//!
//! Scheduled report generation for telephony telemetry sources: a
//! minute-boundary scheduler matches connector schedules, the dispatch
//! coordinator fetches and classifies each source's XML export, aggregates
//! the metrics, renders charts, asks an AI provider for commentary, composes
//! the HTML artifact and delivers it, recording every occurrence in an
//! idempotent history ledger with bounded retention.

pub mod aggregate;
pub mod charts;
pub mod compose;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod handlers;
pub mod mail;
pub mod models;
pub mod narrative;
pub mod parser;
pub mod repositories;
pub mod schedule;
pub mod scheduler;
pub mod server;
pub mod telemetry;
