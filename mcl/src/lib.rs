/*
 * SPDX-FileCopyrightText: 2026 The mcl-rs developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(clippy::empty_loop)]
#![deny(unreachable_code)]
#![deny(unreachable_patterns)]
#![deny(unused_macro_rules)]
#![deny(unused_doc_comments)]

pub mod device;
pub mod driver;
pub mod error;
pub mod matrix;
pub mod par;
pub mod random;
pub mod stages;
pub mod tolerance;

pub mod prelude {
    pub use crate::device::{Device, LaunchConfig};
    pub use crate::driver::{Engine, Mcl, Sequential, Status, preds};
    pub use crate::error::{MclError, Result};
    pub use crate::matrix::Matrix;
    pub use crate::stages::{Expansion, Params, ZeroColumns};
    pub use crate::tolerance::{Closeness, Tolerance, allclose};
}
