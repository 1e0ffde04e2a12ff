//! Shared database repository test infrastructure
//!
//! The same test logic runs against every backend implementation:
//!
//! - **Unit tests (SQLite)**: Fast, in-memory tests that run with every `cargo test`
//! - **Integration tests (PostgreSQL, MySQL)**: Slower tests using testcontainers,
//!   run with `cargo test -- --ignored`
//!
//! # Architecture
//!
//! `billing_tags.rs` holds shared test functions that take a [`billing_tags::BillingTagTestContext`]
//! wrapping a fully constructed `DbPool`, followed by one module per backend that
//! instantiates every shared test.
//!
//! # Running tests
//!
//! ```bash
//! cargo test                       # Run fast SQLite tests only
//! cargo test -- --ignored          # Run PostgreSQL/MySQL integration tests (requires Docker)
//! cargo test -- --include-ignored  # Run all tests
//! ```
