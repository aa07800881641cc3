//! Shared infrastructure for the sleep-ledger services
//!
//! This crate provides the pieces every service needs: PostgreSQL
//! connection pooling and the error types used at the record-store
//! boundary.

pub mod database;
pub mod error;
