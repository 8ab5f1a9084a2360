// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ccb-cli: the client-side half of the broker — a thin library shared by
//! the four per-provider binaries (`lask`, `cask`, `gask`, `oask`) and the
//! `ccb` management binary.
//!
//! Owns everything on the client side of the RPC socket: //! locating and, if allowed, autostarting the matching `ccbd` (`daemon_process`),
//! the client's own slice of the `CCB_<PFX>_*` environment surface (`env`),
//! and the request/response round trip itself (`client`).

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod client;
pub mod daemon_process;
pub mod env;
pub mod thin_client;

pub use client::{BrokerClient, ClientError};
