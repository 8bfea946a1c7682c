// Error types. Every variant states *where* things went wrong.
use thiserror::Error;

/// A layer index fell outside `[-bound, bound)`.
/// This is a bug in the renderer's own layer assignment, never bad input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("layer index {index} is out of range [-{bound}, {bound})")]
pub struct LayerError {
    pub index: i32,
    pub bound: i32,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Window init error: {0}")]
    WindowInit(String), // Creating the window failed
    #[error("Window update error: {0}")]
    WindowUpdate(String), // Updating the window buffer failed
    #[error("Camera init error: {0}")]
    CameraInit(String), // Opening/starting the camera failed
    #[error("Camera frame error: {0}")]
    CameraFrame(String), // Grabbing/decoding a frame failed
    #[error("Config error: {0}")]
    Config(String), // Config file unreadable or values out of range
    #[error("Tracker error: {0}")]
    Tracker(String), // The hand tracking source failed
    #[error("Layering error: {0}")]
    Layer(#[from] LayerError), // Fatal: depth layering contract violated
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError), // Saving/encoding an image failed
}
