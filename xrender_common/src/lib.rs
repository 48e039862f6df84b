// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate includes the geometry representations used by the [`xrender`][xrender] mask
//! compositor: growable integer buffers, dirty-region bookkeeping and a Bresenham line
//! rasterizer that turns line segments into pixel-exact rectangles.
//!
//! # Usage
//!
//! This crate should not be used on its own, and you should instead use the [`xrender`][xrender]
//! crate which drives a drawing backend with the rectangles produced here.
//!
//! # Contents
//!
//! - [`growable`]: fixed-stride growable buffers of `i32` cells, used for rectangle lists and
//!   glyph layout records.
//! - [`dirty`]: bounding box accumulation for queued geometry.
//! - [`line`]: line rasterization into covering rectangles.
//! - [`rect`]: the integer rectangle cell and coordinate clamping helpers.
//!
//! [xrender]: https://crates.io/crates/xrender
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
#![forbid(unsafe_code)]

pub mod dirty;
pub mod growable;
pub mod line;
pub mod rect;

pub use bytemuck;
