// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for storage entities.

pub mod messages;
pub mod sessions;
