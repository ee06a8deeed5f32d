//! Outbound notifications triggered by lifecycle transitions.
//!
//! Sinks are fire-and-forget: [`NotificationSink::notify`] must return
//! without waiting on I/O and cannot report failure to the caller. A
//! transition that has committed stays committed whatever happens to its
//! notification.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subscription::ProductLine;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
  DeliveryCompleted {
    customer_id:   Uuid,
    obligation_id: Uuid,
    products:      Vec<ProductLine>,
  },
  DeliveryFailed {
    customer_id:   Uuid,
    obligation_id: Uuid,
    reason:        String,
  },
}

impl Notification {
  pub fn obligation_id(&self) -> Uuid {
    match self {
      Self::DeliveryCompleted { obligation_id, .. }
      | Self::DeliveryFailed { obligation_id, .. } => *obligation_id,
    }
  }
}

pub trait NotificationSink: Send + Sync {
  /// Hand off a notification. Must not block.
  fn notify(&self, notification: Notification);

  fn notify_delivery_completed(
    &self,
    customer_id: Uuid,
    obligation_id: Uuid,
    products: Vec<ProductLine>,
  ) {
    self.notify(Notification::DeliveryCompleted {
      customer_id,
      obligation_id,
      products,
    });
  }

  fn notify_delivery_failed(&self, customer_id: Uuid, obligation_id: Uuid, reason: String) {
    self.notify(Notification::DeliveryFailed {
      customer_id,
      obligation_id,
      reason,
    });
  }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl NotificationSink for NoopNotifier {
  fn notify(&self, _notification: Notification) {}
}

impl<T: NotificationSink + ?Sized> NotificationSink for std::sync::Arc<T> {
  fn notify(&self, notification: Notification) { (**self).notify(notification) }
}
