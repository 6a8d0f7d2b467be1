// SPDX-License-Identifier: MIT
//! vault-types crate
//!
//! Data contracts shared by the vault logic, the host adapters and the CLI.
//! No I/O, no chain access.

pub mod constants;
pub mod types;
pub mod utxo;
