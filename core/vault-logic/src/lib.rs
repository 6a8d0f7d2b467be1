// SPDX-License-Identifier: MIT
//! vault-logic crate
//!
//! Pure vault protocol: state extraction from verified spells, deadline
//! evaluation and the contract's transition rules.

pub mod error;
pub mod evaluator;
pub mod extractor;
pub mod transition;
