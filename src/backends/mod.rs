// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for device access
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               Photo Pipeline                 │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────────┐  ┌──────────────────┐  │
//! │  │ Capture channel │  │ Hardware controls│  │
//! │  │  (V4L2 mmap)    │  │  (V4L2 ioctls)   │  │
//! │  └─────────────────┘  └──────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```

pub mod camera;
