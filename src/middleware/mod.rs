// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules.

pub mod admin_auth;

pub use admin_auth::{require_admin, ADMIN_TOKEN_HEADER};
