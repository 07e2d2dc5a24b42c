// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines
//!
//! # Pipeline Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Camera Frame │ ──▶ │  Photo Pipeline   │ ──▶ │ PPM/JPEG/PNG │
//! │   (YUYV)     │     │  - YUYV→RGB       │     │ file/stdout  │
//! │              │     │  - Filters        │     │              │
//! │              │     │  - Text stamp     │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`photo`]: single-frame capture with filters, stamp and encoding

pub mod photo;
