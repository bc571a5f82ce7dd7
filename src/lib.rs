//! Factura — a locally-run invoice auditing service.
//!
//! Watches an inbox for invoice documents, drives each one through an
//! extract → standardize → validate → report state machine, cross-checks
//! line items against ERP reference records, and answers free-text
//! questions about processed invoices through a retrieval-augmented
//! knowledge engine.

pub mod config;
pub mod erp;
pub mod inbox;
pub mod pipeline;
pub mod rag;
