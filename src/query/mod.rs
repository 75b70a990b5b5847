// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query parsing and search execution.

pub mod parser;
pub mod search;
