//! Request-time access control.
//!
//! `classify` sorts a path into a `RouteClass`, `decision` turns that class plus the
//! caller's `Identity` into a `Decision`, `landing` knows each role's home area, and
//! `gate` wires all of it into an axum middleware.

pub mod classify;
pub mod decision;
pub mod gate;
pub mod identity;
pub mod landing;

pub use classify::{RouteClass, RouteTable};
pub use decision::{AccessPolicy, Decision};
pub use gate::{access_gate, resolve_identity};
pub use identity::Identity;
pub use landing::{LOGIN_PATH, LandingTable};
