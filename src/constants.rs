// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Capture defaults
pub mod capture {
    use super::Duration;

    /// Device opened when none is given
    pub const DEFAULT_DEVICE: &str = "/dev/video0";

    /// Requested frame width (the driver may adjust it)
    pub const DEFAULT_WIDTH: u32 = 640;

    /// Requested frame height (the driver may adjust it)
    pub const DEFAULT_HEIGHT: u32 = 480;

    /// Readiness wait before giving up on the frame
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

    /// Frames captured per run
    pub const FRAME_COUNT: u32 = 1;

    /// Kernel buffers requested for streaming I/O
    pub const BUFFER_COUNT: u32 = 1;
}

/// Filter chain limits and tuning
pub mod filters {
    /// Maximum number of filters in one chain
    pub const MAX_FILTERS: usize = 10;

    /// Despeckle light-check threshold. Higher values remove more lights but
    /// blur more; 30 suits indoor lighting.
    pub const DESPECKLE_THRESHOLD: i32 = 30;
}

/// Text stamp layout
pub mod stamp {
    /// Maximum rendered stamp length in characters
    pub const MAX_STAMP_LEN: usize = 56;

    /// Glyph cell width in pixels
    pub const GLYPH_WIDTH: usize = 6;

    /// Glyph cell height in pixels (also the band height)
    pub const GLYPH_HEIGHT: usize = 11;

    /// Default foreground color (white)
    pub const DEFAULT_FOREGROUND: u32 = 0xFF_FF_FF;
}

/// Output defaults
pub mod output {
    /// JPEG quality when none is given
    pub const DEFAULT_JPEG_QUALITY: u8 = 85;

    /// PNG compression level when none is given
    pub const DEFAULT_PNG_COMPRESSION: u8 = 6;

    /// Output file stem used when no path is given
    pub const DEFAULT_FILE_STEM: &str = "capture";

    /// Destination argument meaning standard output
    pub const STDOUT_SENTINEL: &str = "-";
}
