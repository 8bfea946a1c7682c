// Hand keypoints -> one stable "hand circle".
// Extraction is purely geometric; the temporal filter adds smoothing and debouncing.

use crate::config::FilterConfig;
use crate::types::{HandCircle, Keypoint};
use log::debug;

/// Circle around one hand's keypoints, in viewport pixels (y up, origin at center).
pub fn extract_hand_circle(
    keypoints: &[Keypoint],
    viewport_width: f32,
    viewport_height: f32,
) -> Option<HandCircle> {
    if keypoints.is_empty() {
        return None;
    }
    let to_viewport = |k: &Keypoint| {
        ((k.x - 0.5) * viewport_width, (0.5 - k.y) * viewport_height)
    };

    // Running mean.
    let (mut cx, mut cy) = (0.0f32, 0.0f32);
    for (i, k) in keypoints.iter().enumerate() {
        let (x, y) = to_viewport(k);
        cx += (x - cx) / (i + 1) as f32;
        cy += (y - cy) / (i + 1) as f32;
    }

    let radius = keypoints
        .iter()
        .map(|k| {
            let (x, y) = to_viewport(k);
            ((x - cx) * (x - cx) + (y - cy) * (y - cy)).sqrt()
        })
        .fold(0.0f32, f32::max);

    Some(HandCircle { center_x: cx, center_y: cy, radius })
}

/// Smooths and debounces raw circles across frames. Call exactly once per frame, in order.
#[derive(Clone, Debug)]
pub struct HandCircleTemporalFilter {
    low_pass_alpha: f32,
    lifetime_threshold: u32,
    presence_threshold: u32,
    filtered_circle: Option<HandCircle>,
    last_circle: Option<HandCircle>,
    last_circle_absent_frames: u32,
    presence_streak: u32,
}

impl HandCircleTemporalFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            low_pass_alpha: config.low_pass_alpha,
            lifetime_threshold: config.hand_detection_lifetime_threshold,
            presence_threshold: config.hand_detection_presence_threshold,
            filtered_circle: None,
            last_circle: None,
            last_circle_absent_frames: 0,
            presence_streak: 0,
        }
    }

    pub fn process(&mut self, raw: Option<HandCircle>) -> Option<HandCircle> {
        match raw {
            Some(circle) => {
                self.last_circle = Some(circle);
                self.last_circle_absent_frames = 0;
                self.presence_streak = self.presence_streak.saturating_add(1);
            }
            None => {
                self.last_circle_absent_frames += 1;
                if self.last_circle_absent_frames >= self.lifetime_threshold {
                    if self.last_circle.is_some() {
                        debug!("hand lost after {} absent frames", self.last_circle_absent_frames);
                    }
                    self.last_circle = None;
                    self.last_circle_absent_frames = 0;
                    self.presence_streak = 0;
                }
            }
        }

        // Snap on (re)acquisition so we never smooth toward a stale position.
        self.filtered_circle = match (self.filtered_circle, self.last_circle) {
            (Some(old), Some(last)) => Some(old.mix(&last, self.low_pass_alpha)),
            (None, Some(last)) => Some(last),
            _ => None,
        };

        if self.presence_streak >= self.presence_threshold {
            if self.presence_streak == self.presence_threshold {
                debug!("hand confirmed after {} frames", self.presence_streak);
            }
            self.filtered_circle
        } else {
            None
        }
    }

    /// Forget everything (e.g. the video source changed).
    pub fn reset(&mut self) {
        self.filtered_circle = None;
        self.last_circle = None;
        self.last_circle_absent_frames = 0;
        self.presence_streak = 0;
    }
}

/// Extractor + filter for the first tracked hand.
#[derive(Clone, Debug)]
pub struct HandLandmarkProcessor {
    viewport_width: f32,
    viewport_height: f32,
    filter: HandCircleTemporalFilter,
}

impl HandLandmarkProcessor {
    pub fn new(config: &FilterConfig, viewport_width: usize, viewport_height: usize) -> Self {
        Self {
            viewport_width: viewport_width as f32,
            viewport_height: viewport_height as f32,
            filter: HandCircleTemporalFilter::new(config),
        }
    }

    pub fn extract_first_hand_circle(
        &self,
        multi_hand_landmarks: Option<&[Vec<Keypoint>]>,
    ) -> Option<HandCircle> {
        let first = multi_hand_landmarks?.first()?;
        extract_hand_circle(first, self.viewport_width, self.viewport_height)
    }

    /// Stable circle for the first hand, or `None`.
    pub fn process(&mut self, multi_hand_landmarks: Option<&[Vec<Keypoint>]>) -> Option<HandCircle> {
        let raw = self.extract_first_hand_circle(multi_hand_landmarks);
        self.filter.process(raw)
    }

    pub fn reset(&mut self) {
        self.filter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(alpha: f32, lifetime: u32, presence: u32) -> FilterConfig {
        FilterConfig {
            low_pass_alpha: alpha,
            hand_detection_lifetime_threshold: lifetime,
            hand_detection_presence_threshold: presence,
        }
    }

    fn circle(x: f32, y: f32, r: f32) -> HandCircle {
        HandCircle { center_x: x, center_y: y, radius: r }
    }

    fn close(a: HandCircle, b: HandCircle, eps: f32) -> bool {
        (a.center_x - b.center_x).abs() < eps
            && (a.center_y - b.center_y).abs() < eps
            && (a.radius - b.radius).abs() < eps
    }

    #[test]
    fn no_keypoints_no_circle() {
        assert_eq!(extract_hand_circle(&[], 100.0, 100.0), None);
        let p = HandLandmarkProcessor::new(&cfg(0.8, 3, 3), 100, 100);
        assert_eq!(p.extract_first_hand_circle(None), None);
        assert_eq!(p.extract_first_hand_circle(Some(&[])), None);
    }

    #[test]
    fn extraction_flips_y_and_centers_on_viewport() {
        // Two points mirrored around (0.25, 0.25) in normalized space.
        let kps = [Keypoint::new(0.2, 0.2), Keypoint::new(0.3, 0.3)];
        let c = extract_hand_circle(&kps, 1000.0, 500.0).unwrap();
        assert!((c.center_x - (-250.0)).abs() < 1e-3);
        assert!((c.center_y - 125.0).abs() < 1e-3);
        // Half the diagonal between (-300, 150) and (-200, 100).
        let expected = (50.0f32 * 50.0 + 25.0 * 25.0).sqrt();
        assert!((c.radius - expected).abs() < 1e-3);
    }

    #[test]
    fn single_keypoint_has_zero_radius() {
        let c = extract_hand_circle(&[Keypoint::new(0.5, 0.5)], 640.0, 480.0).unwrap();
        assert_eq!(c, circle(0.0, 0.0, 0.0));
    }

    #[test]
    fn only_the_first_hand_is_used() {
        let p = HandLandmarkProcessor::new(&cfg(0.8, 3, 1), 100, 100);
        let hands = vec![vec![Keypoint::new(0.0, 0.0)], vec![Keypoint::new(1.0, 1.0)]];
        let c = p.extract_first_hand_circle(Some(&hands)).unwrap();
        assert_eq!((c.center_x, c.center_y), (-50.0, 50.0));
    }

    #[test]
    fn scenario_presence_three_returns_from_third_frame() {
        let mut f = HandCircleTemporalFilter::new(&cfg(0.8, 3, 3));
        let c = circle(10.0, -20.0, 30.0);
        assert_eq!(f.process(Some(c)), None);
        assert_eq!(f.process(Some(c)), None);
        for _ in 3..=5 {
            let out = f.process(Some(c)).expect("confirmed from frame 3");
            assert!(close(out, c, 1e-4));
        }
    }

    #[test]
    fn constant_input_converges() {
        let mut f = HandCircleTemporalFilter::new(&cfg(0.3, 3, 2));
        f.process(Some(circle(0.0, 0.0, 10.0)));
        let target = circle(100.0, 50.0, 40.0);
        let mut out = None;
        for _ in 0..40 {
            out = f.process(Some(target));
            assert!(out.is_some());
        }
        assert!(close(out.unwrap(), target, 1e-3));
    }

    #[test]
    fn single_spurious_detection_never_surfaces() {
        let mut f = HandCircleTemporalFilter::new(&cfg(0.8, 3, 2));
        for _ in 0..5 {
            assert_eq!(f.process(None), None);
        }
        assert_eq!(f.process(Some(circle(1.0, 2.0, 3.0))), None);
        for _ in 0..5 {
            assert_eq!(f.process(None), None);
        }
    }

    #[test]
    fn grace_frames_resume_blending() {
        let mut f = HandCircleTemporalFilter::new(&cfg(0.5, 3, 1));
        let a = circle(0.0, 0.0, 10.0);
        let b = circle(100.0, 0.0, 10.0);
        f.process(Some(a));
        // Two dropouts (< lifetime 3): the last circle is held.
        assert!(close(f.process(None).unwrap(), a, 1e-5));
        assert!(close(f.process(None).unwrap(), a, 1e-5));
        // Reappears elsewhere: blended from the old filtered circle, not snapped.
        let out = f.process(Some(b)).unwrap();
        assert!((out.center_x - 50.0).abs() < 1e-4);
    }

    #[test]
    fn lifetime_expiry_snaps_on_reacquire() {
        let mut f = HandCircleTemporalFilter::new(&cfg(0.5, 2, 1));
        f.process(Some(circle(0.0, 0.0, 10.0)));
        assert!(f.process(None).is_some());
        assert_eq!(f.process(None), None); // lifetime reached
        assert_eq!(f.presence_streak, 0);
        let b = circle(100.0, 0.0, 10.0);
        assert_eq!(f.process(Some(b)), Some(b));
    }

    #[test]
    fn long_presence_does_not_overflow_streak() {
        let mut f = HandCircleTemporalFilter::new(&cfg(0.8, 3, 3));
        f.presence_streak = u32::MAX;
        let c = circle(1.0, 2.0, 3.0);
        assert_eq!(f.process(Some(c)), Some(c));
        assert_eq!(f.presence_streak, u32::MAX);
    }

    #[test]
    fn threshold_one_trusts_immediately() {
        let mut f = HandCircleTemporalFilter::new(&cfg(0.8, 1, 1));
        let c = circle(5.0, 5.0, 5.0);
        assert_eq!(f.process(Some(c)), Some(c));
        assert_eq!(f.process(None), None);
    }

    #[test]
    fn reset_forgets_streak() {
        let mut p = HandLandmarkProcessor::new(&cfg(0.8, 3, 2), 100, 100);
        let hands = vec![vec![Keypoint::new(0.5, 0.5), Keypoint::new(0.6, 0.5)]];
        p.process(Some(&hands));
        assert!(p.process(Some(&hands)).is_some());
        p.reset();
        assert_eq!(p.process(Some(&hands)), None);
    }
}
