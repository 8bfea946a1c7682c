// Webcam input for the frost effect. Every call to `next_frame()` blocks until the
// device delivers a new image and returns it as 0x00RRGGBB pixels, unmirrored; the
// tracker decides whether the selfie view flips it.

use crate::config::CameraConfig;
use crate::error::Error;
use crate::types::FrameBuffer;
use log::info;

use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};

pub struct CameraCapture {
    cam: Camera,
    width: u32,
    height: u32,
}

impl CameraCapture {
    /// Open the configured device, asking for the closest format to the requested size.
    pub fn open(config: &CameraConfig) -> Result<Self, Error> {
        let fmt = CameraFormat::new(
            Resolution::new(config.width, config.height),
            FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
            30,
        );
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(CameraIndex::Index(config.index), req)
            .map_err(|e| Error::CameraInit(format!("camera {}: {e}", config.index)))?;
        cam.open_stream()
            .map_err(|e| Error::CameraInit(format!("open stream: {e}")))?;

        // The device may settle on a different resolution than requested.
        let actual = cam.resolution();
        info!(
            "camera {} streaming at {}x{} (asked for {}x{})",
            config.index,
            actual.width(),
            actual.height(),
            config.width,
            config.height
        );
        Ok(Self { cam, width: actual.width(), height: actual.height() })
    }

    pub fn next_frame(&mut self) -> Result<FrameBuffer, Error> {
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::CameraFrame(format!("fetch frame: {e}")))?;
        let rgb = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("decode RGB: {e}")))?;
        Ok(FrameBuffer::from_rgb_image(&rgb))
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
