//! Intel RealSense depth source.
//!
//! Captures colour (RGB8) and Z16 depth with depth aligned to the colour
//! stream. Depth is passed on in raw sensor units together with the sensor's
//! depth unit, so the pipeline can derive the raw bounds of the distance
//! window for whatever unit the device is configured with.

use anyhow::Result;
use realsense_rust::{
    config::Config,
    context::Context,
    frame::{ColorFrame, CompositeFrame, DepthFrame as RsDepthFrame, FrameEx},
    kind::{Rs2CameraInfo, Rs2Format, Rs2Option, Rs2ProductLine, Rs2StreamKind},
    pipeline::{ActivePipeline, FrameWaitError, InactivePipeline},
    processing_blocks::align::Align,
};
use spacestream_codec::{ColorImage, DepthBuffer, DEFAULT_DEPTH_UNIT_SCALE};
use std::collections::HashSet;
use std::ffi::CString;
use std::time::Duration;

use crate::source::{DepthFrame, DepthSource};

/// A connected device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub serial: String,
}

/// List connected RealSense devices.
pub fn list_devices() -> Result<Vec<DeviceInfo>> {
    let context = Context::new()?;
    let mut product_lines = HashSet::new();
    product_lines.insert(Rs2ProductLine::AnyIntel);
    let devices = context.query_devices(product_lines);

    let info = |device: &realsense_rust::device::Device, kind| {
        device
            .info(kind)
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    };
    Ok(devices
        .iter()
        .map(|device| DeviceInfo {
            name: info(device, Rs2CameraInfo::Name),
            serial: info(device, Rs2CameraInfo::SerialNumber),
        })
        .collect())
}

/// Aligned colour + depth capture from a RealSense camera.
pub struct RealSenseSource {
    pipeline: ActivePipeline,
    align: Align,
    name: String,
    wait_timeout: Duration,
}

// RealSenseSource is Send because the librealsense pipeline handles may be
// used from any thread as long as access is not concurrent.
unsafe impl Send for RealSenseSource {}

impl RealSenseSource {
    /// Open a camera. With `serial`, opens the device with that serial
    /// number, otherwise the first one found.
    pub fn open(width: u32, height: u32, fps: u32, serial: Option<&str>) -> Result<Self> {
        let context = Context::new()?;
        let pipeline = InactivePipeline::try_from(&context)?;

        let mut config = Config::new();
        if let Some(sn) = serial {
            config.enable_device_from_serial(&CString::new(sn)?)?;
        }
        config.enable_stream(
            Rs2StreamKind::Color,
            None,
            width as usize,
            height as usize,
            Rs2Format::Rgb8,
            fps as usize,
        )?;
        config.enable_stream(
            Rs2StreamKind::Depth,
            None,
            width as usize,
            height as usize,
            Rs2Format::Z16,
            fps as usize,
        )?;
        let pipeline = pipeline.start(Some(config))?;

        for stream in pipeline.profile().streams() {
            if stream.kind() == Rs2StreamKind::Color {
                if let Ok(intr) = stream.intrinsics() {
                    tracing::info!(
                        "Colour intrinsics: fx={:.1} fy={:.1} ppx={:.1} ppy={:.1}",
                        intr.fx(),
                        intr.fy(),
                        intr.ppx(),
                        intr.ppy()
                    );
                }
                break;
            }
        }

        let name = pipeline
            .profile()
            .device()
            .info(Rs2CameraInfo::Name)
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "realsense".to_string());
        tracing::info!("Opened {} at {}x{}@{}", name, width, height, fps);

        Ok(Self {
            pipeline,
            align: Align::new(Rs2StreamKind::Color, 1)?,
            name,
            wait_timeout: Duration::from_secs(5),
        })
    }

    /// Depth unit currently configured on the device, metres per raw unit.
    pub fn depth_unit_scale(&self) -> f64 {
        let device = self.pipeline.profile().device();
        for sensor in device.sensors() {
            if let Some(val) = sensor.get_option(Rs2Option::DepthUnits) {
                return f64::from(val);
            }
        }
        DEFAULT_DEPTH_UNIT_SCALE
    }

    fn capture(&mut self) -> Result<Option<DepthFrame>> {
        let composite: CompositeFrame = match self.pipeline.wait(Some(self.wait_timeout)) {
            Ok(composite) => composite,
            Err(FrameWaitError::DidTimeoutBeforeFrameArrival) => {
                tracing::debug!("No frame from {} within {:?}", self.name, self.wait_timeout);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        self.align.queue(composite)?;
        let aligned = self.align.wait(self.wait_timeout)?;

        let color_frames: Vec<ColorFrame> = aligned.frames_of_type();
        let color_frame = color_frames
            .first()
            .ok_or_else(|| anyhow::anyhow!("No color frame in composite"))?;
        let color_width = color_frame.width() as u32;
        let color_height = color_frame.height() as u32;
        let timestamp_us = (color_frame.timestamp() * 1000.0) as u64;
        let color_rgb = unsafe {
            let ptr = color_frame.get_data() as *const std::ffi::c_void as *const u8;
            std::slice::from_raw_parts(ptr, color_frame.get_data_size()).to_vec()
        };
        let color = ColorImage::from_rgb(color_width, color_height, color_rgb)?;

        let depth_frames: Vec<RsDepthFrame> = aligned.frames_of_type();
        let depth_frame = depth_frames
            .first()
            .ok_or_else(|| anyhow::anyhow!("No depth frame in composite"))?;
        let depth_width = depth_frame.width() as u32;
        let depth_height = depth_frame.height() as u32;
        let raw = unsafe {
            let ptr = depth_frame.get_data() as *const std::ffi::c_void as *const u16;
            std::slice::from_raw_parts(ptr, depth_frame.get_data_size() / 2).to_vec()
        };
        let depth = DepthBuffer::new(depth_width, depth_height, raw)?;

        Ok(Some(DepthFrame {
            timestamp_us,
            depth,
            color: Some(color),
            depth_unit_scale: Some(self.depth_unit_scale()),
        }))
    }
}

impl DepthSource for RealSenseSource {
    fn read(&mut self) -> Result<Option<DepthFrame>> {
        self.capture()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
