// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// The customer aggregate lives in its own subdirectory. Nothing in here
// depends on a concrete store, bus, or HTTP type; adapters plug in through
// the `CustomerStore` and `StatusChangeNotifier` traits.
//
// ============================================================================

pub mod customer;
