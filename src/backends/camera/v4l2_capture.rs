// SPDX-License-Identifier: GPL-3.0-only

//! Single-buffer V4L2 capture channel
//!
//! Owns the device descriptor and one memory-mapped kernel buffer. The
//! lifecycle is strictly linear:
//!
//! ```text
//! open → negotiate → map_buffer → start → acquire_one → stop → unmap → close
//! ```
//!
//! [`CaptureChannel::acquire_one`] hands out a [`Frame`] that borrows the
//! channel, so the buffer cannot be unmapped while its bytes are being read.

use super::types::{CaptureFormat, DeviceCapabilities};
use super::v4l2_utils::{
    V4L2_BUF_TYPE_VIDEO_CAPTURE, V4L2_FIELD_INTERLACED, V4L2_MEMORY_MMAP, V4L2_PIX_FMT_YUYV,
    V4l2Buffer, V4l2Crop, V4l2Cropcap, V4l2Format, V4l2PixFormat, V4l2RequestBuffers,
    VIDIOC_CROPCAP, VIDIOC_DQBUF, VIDIOC_QBUF, VIDIOC_QUERYBUF, VIDIOC_REQBUFS, VIDIOC_S_CROP,
    VIDIOC_S_FMT, VIDIOC_STREAMOFF, VIDIOC_STREAMON, fourcc_to_string, query_capabilities,
    xioctl,
};
use crate::constants::capture::BUFFER_COUNT;
use crate::errors::CaptureError;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::os::unix::io::{AsRawFd, IntoRawFd, RawFd};
use std::ptr::NonNull;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Kernel buffer mapped into this process
///
/// Released exactly once: explicitly through [`MappedBuffer::unmap`], or by
/// `Drop` if an error path skips the explicit call.
pub struct MappedBuffer {
    ptr: NonNull<u8>,
    len: usize,
}

impl MappedBuffer {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr maps len readable bytes until munmap, which needs self by value
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Unmap the buffer, reporting failure
    pub fn unmap(self) -> io::Result<()> {
        let this = std::mem::ManuallyDrop::new(self);
        // SAFETY: the mapping is live and ManuallyDrop keeps Drop from unmapping again
        let result = unsafe { libc::munmap(this.ptr.as_ptr().cast(), this.len) };
        if result == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for MappedBuffer {
    fn drop(&mut self) {
        // SAFETY: the mapping is live; unmap() bypasses this with ManuallyDrop
        if unsafe { libc::munmap(self.ptr.as_ptr().cast(), self.len) } == -1 {
            warn!(error = %io::Error::last_os_error(), "munmap failed while dropping buffer");
        }
    }
}

impl std::fmt::Debug for MappedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MappedBuffer({} bytes)", self.len)
    }
}

/// Dequeued frame, readable while the channel is borrowed
#[derive(Debug)]
pub struct Frame<'a> {
    data: &'a [u8],
    sequence: u32,
    format: CaptureFormat,
}

impl Frame<'_> {
    /// Driver frame sequence number
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn format(&self) -> CaptureFormat {
        self.format
    }
}

impl std::ops::Deref for Frame<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.data
    }
}

/// V4L2 device opened for single-frame memory-mapped capture
#[derive(Debug)]
pub struct CaptureChannel {
    path: String,
    file: File,
    capabilities: DeviceCapabilities,
    format: Option<CaptureFormat>,
    buffer: Option<MappedBuffer>,
    queued: bool,
    streaming: bool,
}

fn ioctl_error(operation: &'static str) -> impl FnOnce(io::Error) -> CaptureError {
    move |source| CaptureError::Ioctl { operation, source }
}

impl CaptureChannel {
    /// Open a capture device and verify it can stream video
    pub fn open(path: &str) -> Result<Self, CaptureError> {
        let metadata = std::fs::metadata(path).map_err(|source| CaptureError::DeviceNotFound {
            path: path.to_string(),
            source,
        })?;
        if !metadata.file_type().is_char_device() {
            return Err(CaptureError::NotACharDevice(path.to_string()));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| CaptureError::Open {
                path: path.to_string(),
                source,
            })?;

        let capabilities = query_capabilities(file.as_raw_fd()).map_err(|e| {
            if e.raw_os_error() == Some(libc::EINVAL) || e.raw_os_error() == Some(libc::ENOTTY) {
                CaptureError::NotV4l2Device(path.to_string())
            } else {
                CaptureError::Ioctl {
                    operation: "VIDIOC_QUERYCAP",
                    source: e,
                }
            }
        })?;

        if !capabilities.can_capture() {
            return Err(CaptureError::NotCaptureDevice(path.to_string()));
        }
        if !capabilities.can_stream() {
            return Err(CaptureError::NoStreaming(path.to_string()));
        }

        info!(
            device_path = path,
            driver = %capabilities.driver,
            card = %capabilities.card,
            "Opened V4L2 capture device"
        );

        Ok(Self {
            path: path.to_string(),
            file,
            capabilities,
            format: None,
            buffer: None,
            queued: false,
            streaming: false,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    /// Format negotiated by [`Self::negotiate`]
    pub fn format(&self) -> Option<CaptureFormat> {
        self.format
    }

    fn fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    /// Reset cropping to the default rectangle; unsupported drivers are fine
    fn reset_crop(&self) {
        let fd = self.fd();
        // SAFETY: all-zero is a valid bit pattern for this plain C struct
        let mut cropcap: V4l2Cropcap = unsafe { std::mem::zeroed() };
        cropcap.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;

        // SAFETY: VIDIOC_CROPCAP takes a v4l2_cropcap
        if let Err(e) = unsafe { xioctl(fd, VIDIOC_CROPCAP, &mut cropcap) } {
            debug!(error = %e, "Cropping capabilities unavailable, skipping crop reset");
            return;
        }

        let mut crop = V4l2Crop {
            type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
            c: cropcap.defrect,
        };
        // SAFETY: VIDIOC_S_CROP takes a v4l2_crop
        if let Err(e) = unsafe { xioctl(fd, VIDIOC_S_CROP, &mut crop) } {
            debug!(error = %e, "Cropping not supported, ignoring");
        }
    }

    /// Request YUYV at `width` × `height` and adopt what the driver grants
    pub fn negotiate(&mut self, width: u32, height: u32) -> Result<CaptureFormat, CaptureError> {
        self.reset_crop();

        // SAFETY: all-zero is a valid bit pattern for this plain C struct
        let mut fmt: V4l2Format = unsafe { std::mem::zeroed() };
        fmt.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
        // SAFETY: all-zero is a valid bit pattern for this plain C struct
        let mut pix: V4l2PixFormat = unsafe { std::mem::zeroed() };
        pix.width = width;
        pix.height = height;
        pix.pixelformat = V4L2_PIX_FMT_YUYV;
        pix.field = V4L2_FIELD_INTERLACED;
        fmt.fmt.pix = pix;

        // SAFETY: VIDIOC_S_FMT takes a v4l2_format
        unsafe { xioctl(self.fd(), VIDIOC_S_FMT, &mut fmt) }
            .map_err(ioctl_error("VIDIOC_S_FMT"))?;

        // SAFETY: the driver filled the pix member for a capture buffer type
        let granted = unsafe { fmt.fmt.pix };

        if granted.pixelformat != V4L2_PIX_FMT_YUYV {
            return Err(CaptureError::UnsupportedPixelFormat {
                path: self.path.clone(),
                fourcc: fourcc_to_string(granted.pixelformat),
            });
        }

        if granted.width != width || granted.height != height {
            warn!(
                requested_width = width,
                requested_height = height,
                width = granted.width,
                height = granted.height,
                "Driver adjusted the frame size"
            );
        }

        let format = CaptureFormat::sanitized(
            granted.width,
            granted.height,
            granted.bytesperline,
            granted.sizeimage,
        );
        if format.bytes_per_line != granted.bytesperline || format.size_image != granted.sizeimage
        {
            debug!(
                reported_bytes_per_line = granted.bytesperline,
                reported_size_image = granted.sizeimage,
                bytes_per_line = format.bytes_per_line,
                size_image = format.size_image,
                "Corrected driver-reported buffer geometry"
            );
        }

        info!(format = %format, "Negotiated capture format");
        self.format = Some(format);
        Ok(format)
    }

    /// Request one memory-mapped kernel buffer and map it
    pub fn map_buffer(&mut self) -> Result<(), CaptureError> {
        if self.format.is_none() {
            return Err(CaptureError::InvalidState("map_buffer called before negotiate"));
        }
        if self.buffer.is_some() {
            return Err(CaptureError::InvalidState("buffer already mapped"));
        }

        // SAFETY: all-zero is a valid bit pattern for this plain C struct
        let mut req: V4l2RequestBuffers = unsafe { std::mem::zeroed() };
        req.count = BUFFER_COUNT;
        req.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
        req.memory = V4L2_MEMORY_MMAP;

        // SAFETY: VIDIOC_REQBUFS takes a v4l2_requestbuffers
        unsafe { xioctl(self.fd(), VIDIOC_REQBUFS, &mut req) }.map_err(|e| {
            if e.raw_os_error() == Some(libc::EINVAL) {
                CaptureError::NoMmap(self.path.clone())
            } else {
                CaptureError::Ioctl {
                    operation: "VIDIOC_REQBUFS",
                    source: e,
                }
            }
        })?;

        if req.count < 1 {
            return Err(CaptureError::InsufficientBuffers(self.path.clone()));
        }

        let mut buf = V4l2Buffer::mmap_capture(0);
        // SAFETY: VIDIOC_QUERYBUF takes a v4l2_buffer
        unsafe { xioctl(self.fd(), VIDIOC_QUERYBUF, &mut buf) }
            .map_err(ioctl_error("VIDIOC_QUERYBUF"))?;

        // SAFETY: QUERYBUF fills the offset member for MMAP buffers
        let offset = unsafe { buf.m.offset };
        let len = buf.length as usize;

        // SAFETY: mapping a driver-provided offset/length of our own descriptor
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                self.fd(),
                offset as libc::off_t,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(CaptureError::Ioctl {
                operation: "mmap",
                source: io::Error::last_os_error(),
            });
        }
        let ptr = NonNull::new(ptr.cast::<u8>()).ok_or(CaptureError::Ioctl {
            operation: "mmap",
            source: io::Error::from(io::ErrorKind::InvalidData),
        })?;

        debug!(length = len, offset, "Mapped capture buffer");
        self.buffer = Some(MappedBuffer { ptr, len });
        Ok(())
    }

    /// Queue the buffer and start streaming
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.buffer.is_none() {
            return Err(CaptureError::InvalidState("start called before map_buffer"));
        }

        let mut buf = V4l2Buffer::mmap_capture(0);
        // SAFETY: VIDIOC_QBUF takes a v4l2_buffer
        unsafe { xioctl(self.fd(), VIDIOC_QBUF, &mut buf) }.map_err(ioctl_error("VIDIOC_QBUF"))?;
        self.queued = true;

        let mut buf_type = V4L2_BUF_TYPE_VIDEO_CAPTURE as libc::c_int;
        // SAFETY: VIDIOC_STREAMON takes the buffer type as an int
        unsafe { xioctl(self.fd(), VIDIOC_STREAMON, &mut buf_type) }
            .map_err(ioctl_error("VIDIOC_STREAMON"))?;
        self.streaming = true;

        debug!(device_path = %self.path, "Streaming started");
        Ok(())
    }

    /// Wait up to `timeout` for the frame and dequeue it
    ///
    /// Signals interrupting the wait are retried with the full timeout; a
    /// spurious wakeup (`EAGAIN` on dequeue) waits again.
    pub fn acquire_one(&mut self, timeout: Duration) -> Result<Frame<'_>, CaptureError> {
        if !self.streaming || !self.queued {
            return Err(CaptureError::InvalidState("acquire_one called before start"));
        }

        let fd = self.fd();
        let timeout_ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

        let dequeued = loop {
            let mut pollfd = libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            };
            // SAFETY: one valid pollfd entry
            let ready = unsafe { libc::poll(&mut pollfd, 1, timeout_ms) };

            if ready == -1 {
                let err = io::Error::last_os_error();
                if err.raw_os_error() == Some(libc::EINTR) {
                    continue;
                }
                return Err(CaptureError::Ioctl {
                    operation: "poll",
                    source: err,
                });
            }
            if ready == 0 {
                return Err(CaptureError::Timeout {
                    seconds: timeout.as_secs(),
                });
            }

            let mut buf = V4l2Buffer::mmap_capture(0);
            // SAFETY: VIDIOC_DQBUF takes a v4l2_buffer
            match unsafe { xioctl(fd, VIDIOC_DQBUF, &mut buf) } {
                Ok(()) => break buf,
                Err(e) if e.raw_os_error() == Some(libc::EAGAIN) => {
                    debug!("Dequeue not ready yet, waiting again");
                    continue;
                }
                Err(e) => {
                    return Err(CaptureError::Ioctl {
                        operation: "VIDIOC_DQBUF",
                        source: e,
                    });
                }
            }
        };
        self.queued = false;

        let format = self
            .format
            .ok_or(CaptureError::InvalidState("acquire_one without a format"))?;
        let mapped = self
            .buffer
            .as_ref()
            .ok_or(CaptureError::InvalidState("acquire_one without a buffer"))?;

        // Some drivers leave bytesused at zero; the whole mapping is the frame then
        let used = match dequeued.bytesused as usize {
            0 => mapped.len(),
            n => n.min(mapped.len()),
        };

        debug!(
            sequence = dequeued.sequence,
            bytes_used = used,
            "Frame dequeued"
        );

        Ok(Frame {
            data: &mapped.as_slice()[..used],
            sequence: dequeued.sequence,
            format,
        })
    }

    /// Stop streaming
    pub fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.streaming {
            return Ok(());
        }

        let mut buf_type = V4L2_BUF_TYPE_VIDEO_CAPTURE as libc::c_int;
        // SAFETY: VIDIOC_STREAMOFF takes the buffer type as an int
        unsafe { xioctl(self.fd(), VIDIOC_STREAMOFF, &mut buf_type) }
            .map_err(ioctl_error("VIDIOC_STREAMOFF"))?;
        self.streaming = false;
        self.queued = false;
        Ok(())
    }

    /// Release the mapped buffer
    pub fn unmap(&mut self) -> Result<(), CaptureError> {
        if self.streaming {
            return Err(CaptureError::InvalidState("unmap called while streaming"));
        }
        match self.buffer.take() {
            Some(buffer) => buffer.unmap().map_err(ioctl_error("munmap")),
            None => Ok(()),
        }
    }

    /// Stop, unmap and close the device
    ///
    /// Every step runs even when an earlier one fails. Each failure is logged
    /// and the first one is returned.
    pub fn close(mut self) -> Result<(), CaptureError> {
        let stopped = self.stop();
        // Closing the fd tears down the queue anyway, so a failed STREAMOFF
        // must not keep the buffer mapped
        self.streaming = false;
        self.queued = false;
        let unmapped = self.unmap();

        let fd = self.file.into_raw_fd();
        // SAFETY: fd was just released from its File, so it is closed exactly once
        let closed = if unsafe { libc::close(fd) } == -1 {
            Err(CaptureError::Ioctl {
                operation: "close",
                source: io::Error::last_os_error(),
            })
        } else {
            Ok(())
        };

        let result = first_failure(
            &self.path,
            [("stop", stopped), ("unmap", unmapped), ("close", closed)],
        );
        if result.is_ok() {
            debug!(device_path = %self.path, "Device closed");
        }
        result
    }
}

/// Log every failed teardown step and keep the first error
fn first_failure<const N: usize>(
    device_path: &str,
    steps: [(&'static str, Result<(), CaptureError>); N],
) -> Result<(), CaptureError> {
    let mut first = None;
    for (step, result) in steps {
        if let Err(e) = result {
            warn!(device_path, step, error = %e, "Device teardown step failed");
            first.get_or_insert(e);
        }
    }
    first.map_or(Ok(()), Err)
}

impl AsRawFd for CaptureChannel {
    fn as_raw_fd(&self) -> RawFd {
        self.fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device() {
        let err = CaptureChannel::open("/nonexistent/video99").unwrap_err();
        assert!(matches!(err, CaptureError::DeviceNotFound { .. }));
        assert!(err.to_string().contains("/nonexistent/video99"));
    }

    #[test]
    fn test_open_regular_file_is_not_a_device() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        assert!(matches!(
            CaptureChannel::open(path),
            Err(CaptureError::NotACharDevice(_))
        ));
    }

    #[test]
    fn test_open_non_v4l2_char_device() {
        // /dev/null is a character device that rejects VIDIOC_QUERYCAP
        if !std::path::Path::new("/dev/null").exists() {
            return;
        }
        assert!(matches!(
            CaptureChannel::open("/dev/null"),
            Err(CaptureError::NotV4l2Device(_))
        ));
    }

    #[test]
    fn test_teardown_keeps_first_failure() {
        let result = first_failure(
            "/dev/video0",
            [
                ("stop", Err(CaptureError::InvalidState("streamoff failed"))),
                ("unmap", Ok(())),
                ("close", Err(CaptureError::InvalidState("close failed"))),
            ],
        );
        assert!(matches!(
            result,
            Err(CaptureError::InvalidState("streamoff failed"))
        ));
    }

    #[test]
    fn test_teardown_later_failure_still_reported() {
        let result = first_failure(
            "/dev/video0",
            [
                ("stop", Ok(())),
                ("unmap", Ok(())),
                ("close", Err(CaptureError::InvalidState("close failed"))),
            ],
        );
        assert!(matches!(result, Err(CaptureError::InvalidState("close failed"))));
        assert!(first_failure("/dev/video0", [("stop", Ok(())), ("close", Ok(()))]).is_ok());
    }
}
