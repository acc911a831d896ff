// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-contact single-flight guard.

use std::sync::Arc;

use dashmap::DashSet;
use tokio::sync::Notify;

/// Set of contacts with a step currently in flight.
///
/// Cloning shares the underlying set.
#[derive(Debug, Clone, Default)]
pub struct InFlightGuard {
    held: Arc<DashSet<String>>,
    released: Arc<Notify>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `contact`, or return `None` if a step for it is already running.
    pub fn try_acquire(&self, contact: &str) -> Option<InFlightPermit> {
        if self.held.insert(contact.to_string()) {
            Some(InFlightPermit {
                contact: contact.to_string(),
                held: Arc::clone(&self.held),
                released: Arc::clone(&self.released),
            })
        } else {
            None
        }
    }

    /// Wait until `contact` is free, then claim it.
    pub async fn acquire(&self, contact: &str) -> InFlightPermit {
        loop {
            // Register interest before re-checking so a release in between is not missed.
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(permit) = self.try_acquire(contact) {
                return permit;
            }
            notified.await;
        }
    }

    pub fn is_held(&self, contact: &str) -> bool {
        self.held.contains(contact)
    }

    /// Number of contacts currently in flight.
    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

/// Claim on one contact. Releases on drop, including during unwinding.
#[derive(Debug)]
pub struct InFlightPermit {
    contact: String,
    held: Arc<DashSet<String>>,
    released: Arc<Notify>,
}

impl InFlightPermit {
    pub fn contact(&self) -> &str {
        &self.contact
    }
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.held.remove(&self.contact);
        self.released.notify_waiters();
    }
}
