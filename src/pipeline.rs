// Per-frame glue: camera frame -> tracker -> hand circle -> frost effect.

use crate::config::{FilterConfig, TrackerOptions};
use crate::effect::EffectRenderer;
use crate::error::Error;
use crate::hand::HandLandmarkProcessor;
use crate::tracker::{HandTracker, TrackingResults};
use crate::types::{FrameBuffer, HandCircle, Keypoint};
use log::info;

pub struct FramePipeline<T: HandTracker> {
    tracker: T,
    processor: HandLandmarkProcessor,
    renderer: EffectRenderer,
    last_landmarks: Option<Vec<Vec<Keypoint>>>,
    last_hand: Option<HandCircle>,
}

impl<T: HandTracker> FramePipeline<T> {
    pub fn new(mut tracker: T, options: &TrackerOptions, filter: &FilterConfig, renderer: EffectRenderer) -> Self {
        tracker.set_options(options);
        let (w, h) = renderer.viewport();
        Self {
            tracker,
            processor: HandLandmarkProcessor::new(filter, w, h),
            renderer,
            last_landmarks: None,
            last_hand: None,
        }
    }

    /// Textures all arrived; frames sent before this are not tracked.
    pub fn is_ready(&mut self) -> bool {
        self.renderer.is_ready()
    }

    pub fn pending_textures(&self) -> usize {
        self.renderer.pending_textures()
    }

    /// Track and render one camera frame. `Ok(None)` while the effect is still loading.
    pub fn process_frame(&mut self, frame: FrameBuffer) -> Result<Option<&FrameBuffer>, Error> {
        if !self.renderer.is_ready() {
            return Ok(None);
        }
        let results = self.tracker.send(frame)?;
        self.on_results(results)
    }

    /// Tracker callback: filter the first hand and render it over the tracked image.
    pub fn on_results(&mut self, results: TrackingResults) -> Result<Option<&FrameBuffer>, Error> {
        let TrackingResults { image, multi_hand_landmarks } = results;
        self.last_hand = self.processor.process(multi_hand_landmarks.as_deref());
        self.last_landmarks = multi_hand_landmarks;
        self.renderer.render(&image, self.last_hand)
    }

    /// Forget the smoothed hand; the next sighting has to be confirmed again.
    pub fn reset_tracking(&mut self) {
        info!("hand tracking reset");
        self.processor.reset();
        self.last_hand = None;
    }

    pub fn tracker_mut(&mut self) -> &mut T {
        &mut self.tracker
    }

    /// Landmarks of the last tracked frame (debug overlay).
    pub fn last_landmarks(&self) -> Option<&[Vec<Keypoint>]> {
        self.last_landmarks.as_deref()
    }

    /// Filtered hand of the last tracked frame, in viewport pixels.
    pub fn last_hand(&self) -> Option<HandCircle> {
        self.last_hand
    }
}
