//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (ordered scan)
//!     → matcher.rs (prefix test)
//!     → Return: matched RouteBinding or None
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Validate (no duplicate or shadowed prefixes)
//!     → Compile bindings (parse targets, normalize timeouts)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (declaration order)

pub mod binding;
pub mod matcher;
pub mod router;

pub use binding::RouteBinding;
pub use router::RouteTable;
