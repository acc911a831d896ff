// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Intake dialogue engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`. Every query goes
//! through the one background connection owned by [`Database`].

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
