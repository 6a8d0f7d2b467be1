// SPDX-License-Identifier: MIT
//! host-utils crate
//!
//! Host-side adapters around the vault core: node RPC, spell verification,
//! the on-disk vault registry, and the status pipeline that ties them together.

pub mod chain;
pub mod provider;
pub mod registry;
pub mod rpc;
pub mod spell;
pub mod status;
