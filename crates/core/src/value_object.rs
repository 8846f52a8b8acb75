//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**. An edit request and the derived amounts
//! it produces are values: two results with the same fields are the same result.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one (e.g. `InvoiceEditResult::as_next_input`).
///
/// - **Value Object**: `InvoiceEditInput { amount: 0, status: Pendiente, .. }`
/// - **Entity**: an invoice record keyed by `InvoiceId`
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
