// Hand tracking sources. A tracker takes a camera frame and hands back the image it
// worked on (mirrored in selfie mode) plus the landmarks of every hand it found.
//
// Two sources ship with the demo:
//  - PointerHandTracker: a synthetic hand that follows the mouse while the button is held;
//  - ReplayHandTracker: landmarks recorded to JSON lines, played back in a loop.

use crate::config::TrackerOptions;
use crate::error::Error;
use crate::geometry::NUM_HAND_LANDMARKS;
use crate::types::{FrameBuffer, Keypoint};
use log::{info, warn};
use serde::Deserialize;
use std::path::Path;

pub struct TrackingResults {
    pub image: FrameBuffer,
    /// Normalized landmarks (x right, y down) in `image` coordinates, or `None` when
    /// no hand passed the confidence checks.
    pub multi_hand_landmarks: Option<Vec<Vec<Keypoint>>>,
}

pub trait HandTracker {
    fn set_options(&mut self, options: &TrackerOptions);
    fn send(&mut self, frame: FrameBuffer) -> Result<TrackingResults, Error>;
}

/// Mean landmark visibility; landmarks without a score count as fully visible.
fn hand_confidence(hand: &[Keypoint]) -> f32 {
    if hand.is_empty() {
        return 0.0;
    }
    hand.iter().map(|k| k.visibility.unwrap_or(1.0)).sum::<f32>() / hand.len() as f32
}

/// Keep at most `max_hands` hands that clear the confidence threshold. A hand that was
/// already being tracked last frame is held to the tracking threshold instead.
fn accept_hands(
    options: &TrackerOptions,
    hands: Vec<Vec<Keypoint>>,
    was_tracking: bool,
) -> Option<Vec<Vec<Keypoint>>> {
    let threshold = if was_tracking {
        options.min_tracking_confidence
    } else {
        options.min_detection_confidence
    };
    let kept: Vec<_> = hands
        .into_iter()
        .filter(|h| !h.is_empty() && hand_confidence(h) >= threshold)
        .take(options.max_hands)
        .collect();
    if kept.is_empty() { None } else { Some(kept) }
}

/* ------------------------------- pointer hand ------------------------------- */

// Open right hand in hand-heights, palm near the origin, y down.
const HAND_TEMPLATE: [[f32; 2]; NUM_HAND_LANDMARKS] = [
    [0.00, 0.45],  // wrist
    [-0.15, 0.35], [-0.28, 0.22], [-0.38, 0.10], [-0.45, 0.00],  // thumb
    [-0.15, 0.00], [-0.17, -0.20], [-0.18, -0.32], [-0.19, -0.42],  // index
    [0.00, -0.03], [0.00, -0.25], [0.00, -0.38], [0.00, -0.50],  // middle
    [0.13, 0.00], [0.14, -0.20], [0.15, -0.32], [0.16, -0.42],  // ring
    [0.25, 0.06], [0.28, -0.10], [0.30, -0.20], [0.32, -0.30],  // pinky
];

/// Places a synthetic hand under the pointer. Handy without a hand-tracking model.
pub struct PointerHandTracker {
    options: TrackerOptions,
    pointer: Option<(f32, f32)>,
    hand_height: f32,
}

impl PointerHandTracker {
    /// `hand_height`: size of the synthetic hand as a fraction of the frame height.
    pub fn new(hand_height: f32) -> Self {
        Self { options: TrackerOptions::default(), pointer: None, hand_height }
    }

    /// Pointer position normalized to the displayed image, or `None` to drop the hand.
    pub fn set_pointer(&mut self, pointer: Option<(f32, f32)>) {
        self.pointer = pointer;
    }

    fn synthesize(&self, (px, py): (f32, f32), aspect: f32) -> Vec<Keypoint> {
        HAND_TEMPLATE
            .iter()
            .map(|&[dx, dy]| {
                Keypoint::new(px + dx * self.hand_height / aspect, py + dy * self.hand_height)
            })
            .collect()
    }
}

impl HandTracker for PointerHandTracker {
    fn set_options(&mut self, options: &TrackerOptions) {
        self.options = options.clone();
    }

    fn send(&mut self, frame: FrameBuffer) -> Result<TrackingResults, Error> {
        let image = if self.options.selfie_mode { frame.mirrored() } else { frame };
        let aspect = image.width as f32 / image.height.max(1) as f32;
        // The pointer already lives in displayed coordinates, so no mirroring here.
        let hands = self.pointer.map(|p| vec![self.synthesize(p, aspect)]).unwrap_or_default();
        let multi_hand_landmarks = accept_hands(&self.options, hands, false);
        Ok(TrackingResults { image, multi_hand_landmarks })
    }
}

/* ------------------------------- replay ------------------------------- */

#[derive(Deserialize)]
struct RecordedFrame {
    #[serde(rename = "multiHandLandmarks", default)]
    multi_hand_landmarks: Option<Vec<Vec<Keypoint>>>,
}

/// Plays back recorded landmarks, one JSON line per camera frame, looping at the end.
/// A line is either `null` or `{"multiHandLandmarks": [[{"x":..,"y":..}, ...], ...]}`.
pub struct ReplayHandTracker {
    options: TrackerOptions,
    frames: Vec<Option<Vec<Vec<Keypoint>>>>,
    cursor: usize,
    tracking: bool,
}

impl ReplayHandTracker {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Tracker(format!("{}: {e}", path.display())))?;
        let tracker = Self::from_json_lines(&text)?;
        info!("replaying {} frames from {}", tracker.frame_count(), path.display());
        Ok(tracker)
    }

    pub fn from_json_lines(text: &str) -> Result<Self, Error> {
        let mut frames = Vec::new();
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Option<RecordedFrame>>(line) {
                Ok(frame) => frames.push(frame.and_then(|f| f.multi_hand_landmarks)),
                Err(e) => warn!("replay line {}: {e}", n + 1),
            }
        }
        if frames.is_empty() {
            return Err(Error::Tracker("replay contains no frames".into()));
        }
        Ok(Self { options: TrackerOptions::default(), frames, cursor: 0, tracking: false })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl HandTracker for ReplayHandTracker {
    fn set_options(&mut self, options: &TrackerOptions) {
        self.options = options.clone();
    }

    fn send(&mut self, frame: FrameBuffer) -> Result<TrackingResults, Error> {
        let selfie = self.options.selfie_mode;
        let image = if selfie { frame.mirrored() } else { frame };

        let mut hands = self.frames[self.cursor].clone().unwrap_or_default();
        self.cursor = (self.cursor + 1) % self.frames.len();
        if selfie {
            for k in hands.iter_mut().flatten() {
                k.x = 1.0 - k.x;
            }
        }
        let multi_hand_landmarks = accept_hands(&self.options, hands, self.tracking);
        self.tracking = multi_hand_landmarks.is_some();
        Ok(TrackingResults { image, multi_hand_landmarks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{INDEX_TIP, MIDDLE_TIP, PINKY_TIP, RING_TIP, THUMB_TIP, WRIST, palm_center};

    fn options(selfie: bool) -> TrackerOptions {
        TrackerOptions { selfie_mode: selfie, ..TrackerOptions::default() }
    }

    fn frame() -> FrameBuffer {
        // Red left edge, blue right edge: mirroring is visible.
        let mut fb = FrameBuffer::new(4, 2);
        for y in 0..2 {
            fb.pixels[y * 4] = 0x00_FF_00_00;
            fb.pixels[y * 4 + 3] = 0x00_00_00_FF;
        }
        fb
    }

    #[test]
    fn pointer_hand_follows_the_pointer() {
        let mut t = PointerHandTracker::new(0.2);
        t.set_options(&options(true));
        assert!(t.send(frame()).unwrap().multi_hand_landmarks.is_none());

        t.set_pointer(Some((0.3, 0.6)));
        let res = t.send(frame()).unwrap();
        assert_eq!(res.image.pixels[0], 0x00_00_00_FF);
        let hands = res.multi_hand_landmarks.unwrap();
        assert_eq!(hands.len(), 1);
        let hand = &hands[0];
        assert_eq!(hand.len(), NUM_HAND_LANDMARKS);
        for tip in [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP] {
            assert!(hand[tip].y < hand[WRIST].y);
        }
        let palm = palm_center(hand).unwrap();
        assert!((palm.x - 0.3).abs() < 0.1 && (palm.y - 0.6).abs() < 0.1, "{palm:?}");
    }

    #[test]
    fn replay_loops_and_skips_bad_lines() {
        let text = "null\n\nnot json\n{\"multiHandLandmarks\": [[{\"x\": 0.25, \"y\": 0.5}]]}\n{}\n";
        let mut t = ReplayHandTracker::from_json_lines(text).unwrap();
        t.set_options(&options(false));
        assert_eq!(t.frame_count(), 3);
        let seen: Vec<_> = (0..4).map(|_| t.send(frame()).unwrap().multi_hand_landmarks).collect();
        assert!(seen[0].is_none());
        assert_eq!(seen[1].as_ref().unwrap()[0][0].x, 0.25);
        assert!(seen[2].is_none());
        assert!(seen[3].is_none());
    }

    #[test]
    fn replay_mirrors_in_selfie_mode() {
        let mut t = ReplayHandTracker::from_json_lines("{\"multiHandLandmarks\": [[{\"x\": 0.25, \"y\": 0.5}]]}").unwrap();
        t.set_options(&options(true));
        let res = t.send(frame()).unwrap();
        assert_eq!(res.multi_hand_landmarks.unwrap()[0][0].x, 0.75);
        assert_eq!(res.image.pixels[3], 0x00_FF_00_00);
    }

    #[test]
    fn max_hands_and_confidence_are_applied() {
        let hand = |v: f32| format!("[{{\"x\": 0.5, \"y\": 0.5, \"visibility\": {v}}}]");
        let line = format!("{{\"multiHandLandmarks\": [{}, {}, {}]}}", hand(0.5), hand(0.95), hand(0.8));
        let mut t = ReplayHandTracker::from_json_lines(&line).unwrap();
        t.set_options(&TrackerOptions { max_hands: 1, ..options(false) });
        let hands = t.send(frame()).unwrap().multi_hand_landmarks.unwrap();
        assert_eq!(hands.len(), 1);
        assert_eq!(hands[0][0].visibility, Some(0.95));
    }

    #[test]
    fn tracked_hands_use_the_tracking_threshold() {
        let line = |v: f32| format!("{{\"multiHandLandmarks\": [[{{\"x\": 0.5, \"y\": 0.5, \"visibility\": {v}}}]]}}");
        let text = format!("{}\n{}\n", line(0.95), line(0.8));
        let mut t = ReplayHandTracker::from_json_lines(&text).unwrap();
        t.set_options(&TrackerOptions {
            min_detection_confidence: 0.7,
            min_tracking_confidence: 0.9,
            ..options(false)
        });
        assert!(t.send(frame()).unwrap().multi_hand_landmarks.is_some());
        // 0.8 would start a detection but is too weak to keep tracking.
        assert!(t.send(frame()).unwrap().multi_hand_landmarks.is_none());
        assert!(t.send(frame()).unwrap().multi_hand_landmarks.is_some());
    }

    #[test]
    fn shipped_wave_recording_parses() {
        let mut t = ReplayHandTracker::from_json_lines(include_str!("../demos/wave.jsonl")).unwrap();
        t.set_options(&options(true));
        assert_eq!(t.frame_count(), 420);
        let found = (0..t.frame_count())
            .filter(|_| t.send(frame()).unwrap().multi_hand_landmarks.is_some())
            .count();
        assert_eq!(found, 240);
    }

    #[test]
    fn empty_replay_is_an_error() {
        assert!(matches!(ReplayHandTracker::from_json_lines("\n\n"), Err(Error::Tracker(_))));
    }
}
