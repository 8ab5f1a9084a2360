// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The broker's own session identifier.
//!
//! `CcbSessionId` is the `ccb_session_id` field of a [`crate::descriptor::SessionDescriptor`] —
//! generated by the broker itself, distinct from any id the provider CLI assigns
//! to its own transcript (that one lives in the descriptor's `ProviderBinding`).

crate::define_id! {
    /// Unique identifier the broker assigns to a bound terminal session.
    pub struct CcbSessionId;
}
