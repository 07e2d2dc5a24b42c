// SPDX-License-Identifier: GPL-3.0-only

//! Shared V4L2 ioctl plumbing
//!
//! Kernel structures mirrored from `linux/videodev2.h`, the ioctl request
//! numbers derived from their sizes, and an EINTR-retrying ioctl wrapper used
//! by the capture channel and the control interface.

use super::types::DeviceCapabilities;
use std::io;
use std::mem::size_of;
use std::os::unix::io::RawFd;

// ===== ioctl Number Encoding =====
// (dir << 30) | (size << 16) | ('V' << 8) | nr, dir: 1=WRITE, 2=READ, 3=both

const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

const fn vidioc(dir: u32, nr: u32, size: usize) -> libc::c_ulong {
    ((dir << 30) | ((size as u32) << 16) | ((b'V' as u32) << 8) | nr) as libc::c_ulong
}

pub const VIDIOC_QUERYCAP: libc::c_ulong = vidioc(IOC_READ, 0, size_of::<V4l2Capability>());
pub const VIDIOC_S_FMT: libc::c_ulong = vidioc(IOC_READ | IOC_WRITE, 5, size_of::<V4l2Format>());
pub const VIDIOC_REQBUFS: libc::c_ulong =
    vidioc(IOC_READ | IOC_WRITE, 8, size_of::<V4l2RequestBuffers>());
pub const VIDIOC_QUERYBUF: libc::c_ulong =
    vidioc(IOC_READ | IOC_WRITE, 9, size_of::<V4l2Buffer>());
pub const VIDIOC_QBUF: libc::c_ulong = vidioc(IOC_READ | IOC_WRITE, 15, size_of::<V4l2Buffer>());
pub const VIDIOC_DQBUF: libc::c_ulong = vidioc(IOC_READ | IOC_WRITE, 17, size_of::<V4l2Buffer>());
pub const VIDIOC_STREAMON: libc::c_ulong = vidioc(IOC_WRITE, 18, size_of::<libc::c_int>());
pub const VIDIOC_STREAMOFF: libc::c_ulong = vidioc(IOC_WRITE, 19, size_of::<libc::c_int>());
pub const VIDIOC_CROPCAP: libc::c_ulong =
    vidioc(IOC_READ | IOC_WRITE, 58, size_of::<V4l2Cropcap>());
pub const VIDIOC_S_CROP: libc::c_ulong = vidioc(IOC_WRITE, 60, size_of::<V4l2Crop>());

// ===== Constants =====

pub const V4L2_BUF_TYPE_VIDEO_CAPTURE: u32 = 1;
pub const V4L2_MEMORY_MMAP: u32 = 1;
pub const V4L2_FIELD_INTERLACED: u32 = 4;

pub const V4L2_CAP_VIDEO_CAPTURE: u32 = 0x0000_0001;
pub const V4L2_CAP_STREAMING: u32 = 0x0400_0000;
pub const V4L2_CAP_DEVICE_CAPS: u32 = 0x8000_0000;

/// Build a little-endian FourCC code
pub const fn fourcc(code: &[u8; 4]) -> u32 {
    (code[0] as u32) | (code[1] as u32) << 8 | (code[2] as u32) << 16 | (code[3] as u32) << 24
}

pub const V4L2_PIX_FMT_YUYV: u32 = fourcc(b"YUYV");

/// Render a FourCC code as text for diagnostics
pub fn fourcc_to_string(code: u32) -> String {
    code.to_le_bytes()
        .iter()
        .map(|&b| if b.is_ascii_graphic() { b as char } else { '?' })
        .collect()
}

// ===== V4L2 ioctl Structures =====

/// V4L2 capability structure for VIDIOC_QUERYCAP ioctl
#[repr(C)]
pub struct V4l2Capability {
    pub driver: [u8; 16],
    pub card: [u8; 32],
    pub bus_info: [u8; 32],
    pub version: u32,
    pub capabilities: u32,
    pub device_caps: u32,
    pub reserved: [u32; 3],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct V4l2Rect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct V4l2Fract {
    pub numerator: u32,
    pub denominator: u32,
}

#[repr(C)]
pub struct V4l2Cropcap {
    pub type_: u32,
    pub bounds: V4l2Rect,
    pub defrect: V4l2Rect,
    pub pixelaspect: V4l2Fract,
}

#[repr(C)]
pub struct V4l2Crop {
    pub type_: u32,
    pub c: V4l2Rect,
}

/// Single-planar pixel format
#[repr(C)]
#[derive(Clone, Copy)]
pub struct V4l2PixFormat {
    pub width: u32,
    pub height: u32,
    pub pixelformat: u32,
    pub field: u32,
    pub bytesperline: u32,
    pub sizeimage: u32,
    pub colorspace: u32,
    pub priv_: u32,
    pub flags: u32,
    pub ycbcr_enc: u32,
    pub quantization: u32,
    pub xfer_func: u32,
}

/// Format union; the kernel's contains pointers, hence the alignment member
#[repr(C)]
pub union V4l2FormatUnion {
    pub pix: V4l2PixFormat,
    pub raw_data: [u8; 200],
    _align: [usize; 200 / size_of::<usize>()],
}

#[repr(C)]
pub struct V4l2Format {
    pub type_: u32,
    pub fmt: V4l2FormatUnion,
}

#[repr(C)]
pub struct V4l2RequestBuffers {
    pub count: u32,
    pub type_: u32,
    pub memory: u32,
    pub capabilities: u32,
    pub flags: u8,
    pub reserved: [u8; 3],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct V4l2Timecode {
    pub type_: u32,
    pub flags: u32,
    pub frames: u8,
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub userbits: [u8; 4],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union V4l2BufferM {
    pub offset: u32,
    pub userptr: libc::c_ulong,
    pub planes: *mut libc::c_void,
    pub fd: i32,
}

#[repr(C)]
pub struct V4l2Buffer {
    pub index: u32,
    pub type_: u32,
    pub bytesused: u32,
    pub flags: u32,
    pub field: u32,
    pub timestamp: libc::timeval,
    pub timecode: V4l2Timecode,
    pub sequence: u32,
    pub memory: u32,
    pub m: V4l2BufferM,
    pub length: u32,
    pub reserved2: u32,
    pub request_fd: i32,
}

impl V4l2Buffer {
    /// Zeroed buffer descriptor for the memory-mapped capture queue
    pub fn mmap_capture(index: u32) -> Self {
        // SAFETY: all-zero is a valid bit pattern for this plain C struct
        let mut buf: Self = unsafe { std::mem::zeroed() };
        buf.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
        buf.memory = V4L2_MEMORY_MMAP;
        buf.index = index;
        buf
    }
}

// ===== Helper Functions =====

/// Issue an ioctl, retrying while it is interrupted by a signal
///
/// # Safety
///
/// `arg` must be the structure the kernel expects for `request`.
pub unsafe fn xioctl<T>(fd: RawFd, request: libc::c_ulong, arg: &mut T) -> io::Result<()> {
    let arg: *mut T = arg;
    loop {
        let result = unsafe { libc::ioctl(fd, request as _, arg) };
        if result != -1 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::EINTR) {
            return Err(err);
        }
    }
}

/// Extract a null-terminated string from a fixed-size byte array
pub fn extract_name(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&c| c == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).to_string()
}

/// Query V4L2 capabilities for an open file descriptor
pub fn query_capabilities(fd: RawFd) -> io::Result<DeviceCapabilities> {
    // SAFETY: all-zero is a valid bit pattern for this plain C struct
    let mut cap: V4l2Capability = unsafe { std::mem::zeroed() };
    // SAFETY: VIDIOC_QUERYCAP takes a v4l2_capability
    unsafe { xioctl(fd, VIDIOC_QUERYCAP, &mut cap)? };

    // Use device_caps if the driver fills it, otherwise capabilities
    let capabilities = if cap.capabilities & V4L2_CAP_DEVICE_CAPS != 0 {
        cap.device_caps
    } else {
        cap.capabilities
    };

    Ok(DeviceCapabilities {
        driver: extract_name(&cap.driver),
        card: extract_name(&cap.card),
        bus_info: extract_name(&cap.bus_info),
        capabilities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_ioctl_numbers_match_kernel_headers() {
        assert_eq!(VIDIOC_QUERYCAP, 0x80685600);
        assert_eq!(VIDIOC_S_FMT, 0xC0D05605);
        assert_eq!(VIDIOC_REQBUFS, 0xC0145608);
        assert_eq!(VIDIOC_QUERYBUF, 0xC0585609);
        assert_eq!(VIDIOC_QBUF, 0xC058560F);
        assert_eq!(VIDIOC_DQBUF, 0xC0585611);
        assert_eq!(VIDIOC_STREAMON, 0x40045612);
        assert_eq!(VIDIOC_STREAMOFF, 0x40045613);
        assert_eq!(VIDIOC_CROPCAP, 0xC02C563A);
        assert_eq!(VIDIOC_S_CROP, 0x4014563C);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_struct_sizes() {
        assert_eq!(size_of::<V4l2Capability>(), 104);
        assert_eq!(size_of::<V4l2Format>(), 208);
        assert_eq!(size_of::<V4l2Buffer>(), 88);
        assert_eq!(size_of::<V4l2Cropcap>(), 44);
    }

    #[test]
    fn test_fourcc() {
        assert_eq!(V4L2_PIX_FMT_YUYV, 0x5659_5559);
        assert_eq!(fourcc_to_string(V4L2_PIX_FMT_YUYV), "YUYV");
    }

    #[test]
    fn test_extract_name() {
        assert_eq!(extract_name(b"uvcvideo\0\0\0\0"), "uvcvideo");
        assert_eq!(extract_name(b"full"), "full");
    }
}
