// ============================================================================
// Customer Domain - Lifecycle and Status Transitions
// ============================================================================
//
// This module contains ALL Customer-specific code:
// - Value objects (CustomerStatus, DocumentType)
// - Model (Customer record, insert and partial-update payloads)
// - Transitions (the legal status graph)
// - Commands (API and event inputs, listing query)
// - Errors (CustomerError, ConflictError)
// - Events (StatusChange and the notifier seam)
// - Service (CustomerService, the single mutation path)
//
// ============================================================================

pub mod value_objects;
pub mod model;
pub mod transitions;
pub mod events;
pub mod commands;
pub mod errors;
pub mod service;

// Re-export for convenience
pub use value_objects::*;
pub use model::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use service::CustomerService;
