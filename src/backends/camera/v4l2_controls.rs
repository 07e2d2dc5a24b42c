// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera control interface
//!
//! Resolves user-facing control names to V4L2 control IDs, queries ranges,
//! and sets, resets or lists controls on an open capture device.
//!
//! Inspired by [cameractrls](https://github.com/soyersoyer/cameractrls).

use super::v4l2_utils::{extract_name, xioctl};
use crate::errors::{CaptureError, ConfigError};
use std::fmt;
use std::io;
use std::os::unix::io::RawFd;
use std::str::FromStr;
use tracing::{debug, info, warn};

// ===== V4L2 Control Class Bases =====
const V4L2_CTRL_CLASS_USER: u32 = 0x00980000;
const V4L2_CTRL_CLASS_CAMERA: u32 = 0x009a0000;

const V4L2_CID_BASE: u32 = V4L2_CTRL_CLASS_USER | 0x900;
const V4L2_CID_CAMERA_CLASS_BASE: u32 = V4L2_CTRL_CLASS_CAMERA | 0x900;

// ===== V4L2 Control IDs (User Class) =====

/// Brightness control
pub const V4L2_CID_BRIGHTNESS: u32 = V4L2_CID_BASE;
/// Contrast control
pub const V4L2_CID_CONTRAST: u32 = V4L2_CID_BASE + 1;
/// Gain control
pub const V4L2_CID_GAIN: u32 = V4L2_CID_BASE + 19;
/// Backlight compensation - helps with backlit subjects
pub const V4L2_CID_BACKLIGHT_COMPENSATION: u32 = V4L2_CID_BASE + 28;

// ===== V4L2 Control IDs (Camera Class) =====

/// Exposure mode: Auto, Manual, Shutter Priority, Aperture Priority
pub const V4L2_CID_EXPOSURE_AUTO: u32 = V4L2_CID_CAMERA_CLASS_BASE + 1;
/// Absolute exposure time in 100µs units
pub const V4L2_CID_EXPOSURE_ABSOLUTE: u32 = V4L2_CID_CAMERA_CLASS_BASE + 2;
/// Auto focus enable
pub const V4L2_CID_FOCUS_AUTO: u32 = V4L2_CID_CAMERA_CLASS_BASE + 12;

/// User-facing control names and their IDs
///
/// The user class follows the `V4L2_CID_BASE` numbering, so gaps the kernel
/// no longer assigns (`unused`, the audio controls) are left out.
pub const CONTROL_NAMES: &[(&str, u32)] = &[
    ("brightness", V4L2_CID_BRIGHTNESS),
    ("contrast", V4L2_CID_CONTRAST),
    ("saturation", V4L2_CID_BASE + 2),
    ("hue", V4L2_CID_BASE + 3),
    ("black_level", V4L2_CID_BASE + 11),
    ("auto_white_balance", V4L2_CID_BASE + 12),
    ("do_white_balance", V4L2_CID_BASE + 13),
    ("red_balance", V4L2_CID_BASE + 14),
    ("blue_balance", V4L2_CID_BASE + 15),
    ("gamma", V4L2_CID_BASE + 16),
    ("exposure", V4L2_CID_BASE + 17),
    ("autogain", V4L2_CID_BASE + 18),
    ("gain", V4L2_CID_GAIN),
    ("hflip", V4L2_CID_BASE + 20),
    ("vflip", V4L2_CID_BASE + 21),
    ("hcenter", V4L2_CID_BASE + 22),
    ("vcenter", V4L2_CID_BASE + 23),
    ("power_line_frequency", V4L2_CID_BASE + 24),
    ("hue_auto", V4L2_CID_BASE + 25),
    ("white_balance_temperature", V4L2_CID_BASE + 26),
    ("sharpness", V4L2_CID_BASE + 27),
    ("backlight_compensation", V4L2_CID_BACKLIGHT_COMPENSATION),
    ("exposure_auto", V4L2_CID_EXPOSURE_AUTO),
    ("exposure_absolute", V4L2_CID_EXPOSURE_ABSOLUTE),
    ("exposure_auto_priority", V4L2_CID_CAMERA_CLASS_BASE + 3),
    ("pan_absolute", V4L2_CID_CAMERA_CLASS_BASE + 8),
    ("tilt_absolute", V4L2_CID_CAMERA_CLASS_BASE + 9),
    ("focus_absolute", V4L2_CID_CAMERA_CLASS_BASE + 10),
    ("focus_auto", V4L2_CID_FOCUS_AUTO),
    ("zoom_absolute", V4L2_CID_CAMERA_CLASS_BASE + 13),
];

// ===== V4L2 Control Types =====
const V4L2_CTRL_TYPE_INTEGER: u32 = 1;
const V4L2_CTRL_TYPE_BOOLEAN: u32 = 2;
const V4L2_CTRL_TYPE_MENU: u32 = 3;
const V4L2_CTRL_TYPE_BUTTON: u32 = 4;
const V4L2_CTRL_TYPE_CTRL_CLASS: u32 = 6;
const V4L2_CTRL_TYPE_INTEGER_MENU: u32 = 9;

// ===== V4L2 Control Flags =====
const V4L2_CTRL_FLAG_DISABLED: u32 = 0x0001;
const V4L2_CTRL_FLAG_READ_ONLY: u32 = 0x0004;
const V4L2_CTRL_FLAG_INACTIVE: u32 = 0x0010;
const V4L2_CTRL_FLAG_NEXT_CTRL: u32 = 0x8000_0000;

// ===== V4L2 ioctl Numbers =====
// Calculated as: (dir << 30) | (size << 16) | ('V' << 8) | nr
// where dir: 2=READ, 1=WRITE, 3=READ|WRITE

/// Get control value (v4l2_control: 8 bytes)
const VIDIOC_G_CTRL: libc::c_ulong = 0xC008561B;
/// Set control value (v4l2_control: 8 bytes)
const VIDIOC_S_CTRL: libc::c_ulong = 0xC008561C;
/// Query control info (v4l2_queryctrl: 68 bytes)
const VIDIOC_QUERYCTRL: libc::c_ulong = 0xC0445624;
/// Query menu item (v4l2_querymenu: 44 bytes)
const VIDIOC_QUERYMENU: libc::c_ulong = 0xC02C5625;

// ===== V4L2 ioctl Structures =====

/// V4L2 control get/set structure
#[repr(C)]
struct V4l2Control {
    id: u32,
    value: i32,
}

/// V4L2 query control structure
#[repr(C)]
struct V4l2Queryctrl {
    id: u32,
    ctrl_type: u32,
    name: [u8; 32],
    minimum: i32,
    maximum: i32,
    step: i32,
    default_value: i32,
    flags: u32,
    reserved: [u32; 2],
}

/// V4L2 query menu structure
#[repr(C, packed)]
struct V4l2Querymenu {
    id: u32,
    index: u32,
    name: [u8; 32],
    reserved: u32,
}

// ===== Public Types =====

/// Information about a V4L2 control
#[derive(Debug, Clone)]
pub struct ControlInfo {
    pub id: u32,
    pub name: String,
    pub ctrl_type: ControlType,
    pub minimum: i32,
    pub maximum: i32,
    pub step: i32,
    pub default_value: i32,
    pub flags: u32,
}

/// V4L2 control type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    Integer,
    Boolean,
    Menu,
    Button,
    ControlClass,
    IntegerMenu,
    Unknown(u32),
}

impl From<u32> for ControlType {
    fn from(value: u32) -> Self {
        match value {
            V4L2_CTRL_TYPE_INTEGER => ControlType::Integer,
            V4L2_CTRL_TYPE_BOOLEAN => ControlType::Boolean,
            V4L2_CTRL_TYPE_MENU => ControlType::Menu,
            V4L2_CTRL_TYPE_BUTTON => ControlType::Button,
            V4L2_CTRL_TYPE_CTRL_CLASS => ControlType::ControlClass,
            V4L2_CTRL_TYPE_INTEGER_MENU => ControlType::IntegerMenu,
            other => ControlType::Unknown(other),
        }
    }
}

impl ControlInfo {
    /// Check if control is disabled
    pub fn is_disabled(&self) -> bool {
        self.flags & V4L2_CTRL_FLAG_DISABLED != 0
    }

    /// Check if control is read-only
    pub fn is_read_only(&self) -> bool {
        self.flags & V4L2_CTRL_FLAG_READ_ONLY != 0
    }

    /// Check if control is inactive (value cannot be changed)
    pub fn is_inactive(&self) -> bool {
        self.flags & V4L2_CTRL_FLAG_INACTIVE != 0
    }

    /// Whether the control carries a value that can be set and reset
    pub fn is_settable(&self) -> bool {
        !self.is_disabled()
            && !self.is_read_only()
            && !matches!(
                self.ctrl_type,
                ControlType::Button | ControlType::ControlClass
            )
    }

    /// Clamp a requested value into the range the driver reported
    ///
    /// Booleans are coerced to 0/1 and menus clamp to their index range.
    pub fn clamp(&self, value: i32) -> i32 {
        match self.ctrl_type {
            ControlType::Boolean => i32::from(value != 0),
            _ if self.minimum <= self.maximum => value.clamp(self.minimum, self.maximum),
            _ => value,
        }
    }
}

/// Menu item for menu-type controls
#[derive(Debug, Clone)]
pub struct MenuItem {
    pub index: i32,
    pub name: String,
}

/// A control with its current value and, for menus, named options
#[derive(Debug, Clone)]
pub struct ControlState {
    pub info: ControlInfo,
    pub value: Option<i32>,
    pub menu: Vec<MenuItem>,
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = &self.info;
        let name = control_name(info.id).unwrap_or(info.name.as_str());
        match self.value {
            Some(value) => write!(f, "{:<28} = {:>6}", name, value)?,
            None => write!(f, "{:<28} = {:>6}", name, "-")?,
        }
        write!(
            f,
            "  [{}..{}, step {}, default {}]",
            info.minimum, info.maximum, info.step, info.default_value
        )?;
        if info.is_inactive() {
            f.write_str(" (inactive)")?;
        }
        for item in &self.menu {
            write!(f, "\n{:>32} {}: {}", "", item.index, item.name)?;
        }
        Ok(())
    }
}

/// A requested control change: `name=value`, or `name` to reset to default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRequest {
    pub id: u32,
    pub name: &'static str,
    pub value: Option<i32>,
}

impl FromStr for ControlRequest {
    type Err = ConfigError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let (name, value) = match spec.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim())),
            None => (spec.trim(), None),
        };

        let (name, id) = resolve_control(name)?;
        let value = value
            .map(|v| parse_control_value(v).ok_or_else(|| ConfigError::InvalidControlValue {
                control: name.to_string(),
                value: v.to_string(),
            }))
            .transpose()?;

        Ok(ControlRequest { id, name, value })
    }
}

fn parse_control_value(value: &str) -> Option<i32> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Some(1),
        "off" | "false" | "no" => Some(0),
        other => other.parse().ok(),
    }
}

// ===== Helper Functions =====

/// Look up a control ID by name (case-insensitive, `-` or `_` separated)
pub fn resolve_control(name: &str) -> Result<(&'static str, u32), ConfigError> {
    let wanted = name.to_ascii_lowercase().replace('-', "_");
    CONTROL_NAMES
        .iter()
        .find(|(known, _)| *known == wanted)
        .copied()
        .ok_or_else(|| ConfigError::UnknownControl(name.to_string()))
}

/// User-facing name for a control ID, if it has one
pub fn control_name(id: u32) -> Option<&'static str> {
    CONTROL_NAMES
        .iter()
        .find(|(_, known)| *known == id)
        .map(|(name, _)| *name)
}

fn query_raw(fd: RawFd, id: u32) -> io::Result<ControlInfo> {
    let mut qctrl = V4l2Queryctrl {
        id,
        ctrl_type: 0,
        name: [0; 32],
        minimum: 0,
        maximum: 0,
        step: 0,
        default_value: 0,
        flags: 0,
        reserved: [0; 2],
    };

    // SAFETY: VIDIOC_QUERYCTRL takes a v4l2_queryctrl
    unsafe { xioctl(fd, VIDIOC_QUERYCTRL, &mut qctrl)? };

    Ok(ControlInfo {
        id: qctrl.id,
        name: extract_name(&qctrl.name),
        ctrl_type: qctrl.ctrl_type.into(),
        minimum: qctrl.minimum,
        maximum: qctrl.maximum,
        step: qctrl.step,
        default_value: qctrl.default_value,
        flags: qctrl.flags,
    })
}

// ===== Public Functions =====

/// Query if a control exists and get its information
pub fn query_control(fd: RawFd, control_id: u32) -> Option<ControlInfo> {
    query_raw(fd, control_id).ok()
}

/// Get current value of a control
pub fn get_control(fd: RawFd, control_id: u32) -> io::Result<i32> {
    let mut ctrl = V4l2Control {
        id: control_id,
        value: 0,
    };
    // SAFETY: VIDIOC_G_CTRL takes a v4l2_control
    unsafe { xioctl(fd, VIDIOC_G_CTRL, &mut ctrl)? };
    Ok(ctrl.value)
}

/// Set value of a control, returning the value the driver kept
pub fn set_control(fd: RawFd, control_id: u32, value: i32) -> io::Result<i32> {
    let mut ctrl = V4l2Control {
        id: control_id,
        value,
    };
    // SAFETY: VIDIOC_S_CTRL takes a v4l2_control
    unsafe { xioctl(fd, VIDIOC_S_CTRL, &mut ctrl)? };

    // Check if the driver accepted our value
    if ctrl.value != value {
        debug!(
            control_id,
            requested = value,
            actual = ctrl.value,
            "V4L2 control value was clamped"
        );
    }
    Ok(ctrl.value)
}

/// Query all menu items for a menu-type control
pub fn query_menu_items(fd: RawFd, info: &ControlInfo) -> Vec<MenuItem> {
    let mut items = Vec::new();
    if !matches!(info.ctrl_type, ControlType::Menu | ControlType::IntegerMenu) {
        return items;
    }

    for index in info.minimum.max(0)..=info.maximum {
        let mut qmenu = V4l2Querymenu {
            id: info.id,
            index: index as u32,
            name: [0; 32],
            reserved: 0,
        };

        // SAFETY: VIDIOC_QUERYMENU takes a v4l2_querymenu
        if unsafe { xioctl(fd, VIDIOC_QUERYMENU, &mut qmenu) }.is_ok() {
            // Integer menus carry an i64 value where menus carry the name
            let name = match info.ctrl_type {
                ControlType::IntegerMenu => {
                    let raw = qmenu.name;
                    let mut bytes = [0u8; 8];
                    bytes.copy_from_slice(&raw[..8]);
                    i64::from_ne_bytes(bytes).to_string()
                }
                _ => {
                    let raw = qmenu.name;
                    extract_name(&raw)
                }
            };
            items.push(MenuItem { index, name });
        }
    }

    items
}

/// Apply one control request: clamp into range and set, or reset to default
pub fn apply_request(fd: RawFd, request: &ControlRequest) -> Result<(), CaptureError> {
    let info = query_raw(fd, request.id).map_err(|source| CaptureError::Ioctl {
        operation: "VIDIOC_QUERYCTRL",
        source,
    })?;

    if info.is_disabled() {
        warn!(control = request.name, "Control is disabled on this device, skipping");
        return Ok(());
    }

    let target = match request.value {
        Some(value) => {
            let clamped = info.clamp(value);
            if clamped != value {
                warn!(
                    control = request.name,
                    requested = value,
                    minimum = info.minimum,
                    maximum = info.maximum,
                    value = clamped,
                    "Control value out of range, clamped"
                );
            }
            clamped
        }
        None => info.default_value,
    };

    let actual = set_control(fd, request.id, target).map_err(|source| CaptureError::Ioctl {
        operation: "VIDIOC_S_CTRL",
        source,
    })?;
    info!(control = request.name, value = actual, "Control set");
    Ok(())
}

/// Every control the device exposes, in driver order
pub fn enumerate(fd: RawFd) -> Vec<ControlInfo> {
    let mut controls = Vec::new();
    let mut next = V4L2_CTRL_FLAG_NEXT_CTRL;

    while let Ok(info) = query_raw(fd, next) {
        next = info.id | V4L2_CTRL_FLAG_NEXT_CTRL;
        if info.ctrl_type != ControlType::ControlClass {
            controls.push(info);
        }
    }

    debug!(count = controls.len(), "Enumerated controls");
    controls
}

/// Every control with its current value and menu options
pub fn list_controls(fd: RawFd) -> Vec<ControlState> {
    enumerate(fd)
        .into_iter()
        .filter(|info| !info.is_disabled())
        .map(|info| ControlState {
            value: get_control(fd, info.id).ok(),
            menu: query_menu_items(fd, &info),
            info,
        })
        .collect()
}

/// Restore every settable control to its default, returning how many were reset
pub fn reset_all(fd: RawFd) -> usize {
    let mut count = 0;
    for info in enumerate(fd).iter().filter(|info| info.is_settable()) {
        match set_control(fd, info.id, info.default_value) {
            Ok(_) => count += 1,
            Err(e) => warn!(control = %info.name, error = %e, "Failed to reset control"),
        }
    }
    info!(count, "Controls reset to defaults");
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(ctrl_type: ControlType, minimum: i32, maximum: i32) -> ControlInfo {
        ControlInfo {
            id: V4L2_CID_BRIGHTNESS,
            name: "Brightness".to_string(),
            ctrl_type,
            minimum,
            maximum,
            step: 1,
            default_value: 0,
            flags: 0,
        }
    }

    #[test]
    fn test_control_id_values() {
        // Verify control IDs match expected values
        assert_eq!(V4L2_CID_BRIGHTNESS, 0x00980900);
        assert_eq!(V4L2_CID_BACKLIGHT_COMPENSATION, 0x0098091c);
        assert_eq!(V4L2_CID_EXPOSURE_AUTO, 0x009a0901);
        assert_eq!(V4L2_CID_EXPOSURE_ABSOLUTE, 0x009a0902);
        assert_eq!(V4L2_CID_GAIN, 0x00980913);
    }

    #[test]
    fn test_control_type_conversion() {
        assert_eq!(ControlType::from(1), ControlType::Integer);
        assert_eq!(ControlType::from(2), ControlType::Boolean);
        assert_eq!(ControlType::from(3), ControlType::Menu);
        assert_eq!(ControlType::from(6), ControlType::ControlClass);
        assert_eq!(ControlType::from(99), ControlType::Unknown(99));
    }

    #[test]
    fn test_resolve_names() {
        assert_eq!(resolve_control("Brightness").unwrap().1, V4L2_CID_BRIGHTNESS);
        assert_eq!(resolve_control("focus-auto").unwrap().1, V4L2_CID_FOCUS_AUTO);
        assert!(matches!(
            resolve_control("warp_drive"),
            Err(ConfigError::UnknownControl(_))
        ));
        assert_eq!(control_name(V4L2_CID_CONTRAST), Some("contrast"));
    }

    #[test]
    fn test_parse_requests() {
        let req: ControlRequest = "contrast=40".parse().unwrap();
        assert_eq!(req.id, V4L2_CID_CONTRAST);
        assert_eq!(req.value, Some(40));

        let reset: ControlRequest = "gain".parse().unwrap();
        assert_eq!(reset.value, None);

        let boolean: ControlRequest = "focus_auto=off".parse().unwrap();
        assert_eq!(boolean.value, Some(0));

        assert!(matches!(
            "contrast=lots".parse::<ControlRequest>(),
            Err(ConfigError::InvalidControlValue { .. })
        ));
    }

    #[test]
    fn test_clamping() {
        assert_eq!(info(ControlType::Integer, -64, 64).clamp(200), 64);
        assert_eq!(info(ControlType::Integer, -64, 64).clamp(-200), -64);
        assert_eq!(info(ControlType::Boolean, 0, 1).clamp(7), 1);
        assert_eq!(info(ControlType::Menu, 0, 3).clamp(9), 3);
    }

    #[test]
    fn test_settable() {
        assert!(info(ControlType::Integer, 0, 1).is_settable());
        assert!(!info(ControlType::Button, 0, 0).is_settable());
        let mut read_only = info(ControlType::Integer, 0, 1);
        read_only.flags = V4L2_CTRL_FLAG_READ_ONLY;
        assert!(!read_only.is_settable());
    }
}
