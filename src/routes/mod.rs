//! Router Module Index
//!
//! Routers are grouped by the area they serve. None of them carries its own auth
//! layer: the access gate in `create_router` wraps all of them, and role checks
//! happen inside the handlers through `AuthUser::require`.

/// The landing page, open to everyone.
pub mod public;

/// Sign-in, sign-up and session endpoints (`/auth/*`, `/api/auth/*`).
pub mod auth;

/// Everything that needs a signed-in user: client and signatory areas, settings, uploads.
pub mod authenticated;

/// User management, restricted to ADMIN.
pub mod admin;
