//! Application layer orchestrating the mirror, the bulk synchronizer, the
//! account provisioner and the admin payout workflow.
//!
//! Services own no storage of their own: they are handed a payment gateway
//! and the mirrored tables at construction time.

pub mod mirror;
pub mod payouts;
pub mod provisioner;
pub mod sync;
