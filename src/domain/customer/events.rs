use uuid::Uuid;

use super::value_objects::CustomerStatus;

// ============================================================================
// Customer Domain Events
// ============================================================================

pub const CHANGED_BY_SERVICE: &str = crate::config::SERVICE_NAME;

/// A committed status transition, raised by the direct-API update path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub customer_id: Uuid,
    pub previous_status: CustomerStatus,
    pub new_status: CustomerStatus,
    pub changed_by: String,
    pub reason: Option<String>,
}

impl StatusChange {
    pub fn by_service(customer_id: Uuid, previous: CustomerStatus, new: CustomerStatus) -> Self {
        Self {
            customer_id,
            previous_status: previous,
            new_status: new,
            changed_by: CHANGED_BY_SERVICE.to_string(),
            reason: None,
        }
    }
}

/// Hand-off point for outbound status notifications.
///
/// `notify` must return immediately and must never fail from the caller's
/// point of view; delivery happens elsewhere.
pub trait StatusChangeNotifier: Send + Sync {
    fn notify(&self, change: StatusChange);
}

/// Notifier that drops every change
#[cfg(test)]
pub struct NoopNotifier;

#[cfg(test)]
impl StatusChangeNotifier for NoopNotifier {
    fn notify(&self, change: StatusChange) {
        tracing::debug!(
            customer_id = %change.customer_id,
            "Status change notification dropped, no publisher configured"
        );
    }
}
