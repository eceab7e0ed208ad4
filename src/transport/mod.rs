// SPDX-License-Identifier: MIT

//! Network transport: the wire-protocol TCP listener, per-peer connection
//! handling, the broadcast hub, and the sibling control channel.

pub mod control;
pub mod hub;
pub mod peer;
pub mod server;
