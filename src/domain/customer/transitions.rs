use super::value_objects::CustomerStatus;

// ============================================================================
// Status Transition Table
// ============================================================================
//
//   ACTIVE    -> INACTIVE, SUSPENDED, BLOCKED
//   INACTIVE  -> ACTIVE
//   SUSPENDED -> ACTIVE, BLOCKED
//   BLOCKED   -> (terminal)
//
// Self-transitions are not part of the graph. Callers treat "same status"
// as a no-op before consulting this table.
//
// ============================================================================

/// Statuses reachable in one step from `from`
pub const fn allowed_successors(from: CustomerStatus) -> &'static [CustomerStatus] {
    match from {
        CustomerStatus::Active => &[
            CustomerStatus::Inactive,
            CustomerStatus::Suspended,
            CustomerStatus::Blocked,
        ],
        CustomerStatus::Inactive => &[CustomerStatus::Active],
        CustomerStatus::Suspended => &[CustomerStatus::Active, CustomerStatus::Blocked],
        CustomerStatus::Blocked => &[],
    }
}

pub fn is_allowed(from: CustomerStatus, to: CustomerStatus) -> bool {
    allowed_successors(from).contains(&to)
}

impl CustomerStatus {
    pub fn can_transition_to(self, to: CustomerStatus) -> bool {
        is_allowed(self, to)
    }

    pub fn is_terminal(self) -> bool {
        allowed_successors(self).is_empty()
    }
}
