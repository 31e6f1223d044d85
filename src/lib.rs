// SPDX-License-Identifier: MIT

//! Condition and trigger engine for game automation scripts.
//!
//! [`condition`] holds the composable condition tree, its manager and the
//! persisted document format; [`runtime`] holds the world view, game events,
//! configuration and error types the tree is driven by.

pub mod condition;
pub mod runtime;
