//! zonectl
//!
//! Management of zones and recordsets hosted by a remote authoritative DNS
//! service.
//!
//! # Features
//!
//! * Record level add/remove with set-union merge semantics
//! * Whole-zone recordset reconciliation with automatic SOA serial increments
//! * Safe deletion when several recordsets match a request
//! * Bulk zone creation split into size-bounded batches
//! * Aggregated status and results of bulk requests
//!
//! # Architecture
//!
//! * `dns` - Reconciliation and batching core, free of I/O except through an
//!   injected API handle
//! * `api` - The management API trait and its HTTP implementation
//! * `config` - File and environment configuration
//! * `output` - Rendering used by the command line tool

/// Management API abstraction and HTTP client
pub mod api;

/// Configuration loading
pub mod config;

/// Zone and recordset management core
pub mod dns;

/// Table, JSON and YAML output
pub mod output;
