// Textures the effect needs, their background loader, and procedural stand-ins
// for any file that is missing from the asset directory.

use crate::config::AssetConfig;
use crate::draw::{for_each_text_pixel, text_width_5x7};
use crate::raster::Texture;
use image::Rgba;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::thread;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureKind {
    FrostDiffuse,
    FrostDudv,
    FrostTransparency,
    HandHint,
    HandMask,
    OnboardingText,
}

impl TextureKind {
    pub const ALL: [TextureKind; 6] = [
        TextureKind::FrostDiffuse,
        TextureKind::FrostDudv,
        TextureKind::FrostTransparency,
        TextureKind::HandHint,
        TextureKind::HandMask,
        TextureKind::OnboardingText,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            TextureKind::FrostDiffuse => "frost_diffuse.jpg",
            TextureKind::FrostDudv => "frost_dudv.jpg",
            TextureKind::FrostTransparency => "frost_transparency.jpg",
            TextureKind::HandHint => "hand_hint.png",
            TextureKind::HandMask => "hand_mask.png",
            TextureKind::OnboardingText => "onboarding_text.png",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Loaded textures plus the countdown of those still outstanding.
pub struct TextureSet {
    slots: [Option<Texture>; 6],
    pending: usize,
}

impl TextureSet {
    pub fn new() -> Self {
        Self { slots: Default::default(), pending: TextureKind::ALL.len() }
    }

    /// Store a delivered texture. Only the first delivery per kind counts down.
    pub fn insert(&mut self, kind: TextureKind, texture: Texture) -> bool {
        let slot = &mut self.slots[kind.slot()];
        if slot.is_some() {
            warn!("duplicate delivery of {kind:?} ignored");
            return false;
        }
        *slot = Some(texture);
        self.pending -= 1;
        true
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }

    pub fn get(&self, kind: TextureKind) -> Option<&Texture> {
        self.slots[kind.slot()].as_ref()
    }
}

/// Loads textures from a directory on worker threads.
pub struct TextureLoader {
    dir: Option<PathBuf>,
    procedural_fallback: bool,
}

impl TextureLoader {
    pub fn new(config: &AssetConfig) -> Self {
        Self { dir: config.dir.clone(), procedural_fallback: config.procedural_fallback }
    }

    /// Start loading `kind`; `on_load` runs exactly once, on the worker thread, when
    /// the texture is ready. It never runs if the file is unusable and there is no
    /// fallback (the effect then stays not-ready).
    pub fn load<F>(&self, kind: TextureKind, on_load: F)
    where
        F: FnOnce(TextureKind, Texture) + Send + 'static,
    {
        let path = self.dir.as_ref().map(|d| d.join(kind.file_name()));
        let fallback = self.procedural_fallback;
        thread::spawn(move || match resolve(kind, path.as_deref(), fallback) {
            Some(texture) => on_load(kind, texture),
            None => error!("{kind:?}: no texture available, effect will not start"),
        });
    }
}

fn resolve(kind: TextureKind, path: Option<&Path>, fallback: bool) -> Option<Texture> {
    if let Some(path) = path {
        match image::open(path) {
            Ok(img) => {
                info!("loaded {}", path.display());
                return Some(img.to_rgba8());
            }
            Err(e) => warn!("{}: {e}", path.display()),
        }
    }
    if !fallback {
        return None;
    }
    info!("synthesizing {kind:?}");
    Some(procedural(kind))
}

/* ----------------------------- procedural textures ----------------------------- */

/// Deterministic xorshift32 RNG; seeds the noise lattices.
struct Rng32 {
    state: u32,
}

impl Rng32 {
    fn from_seed(seed: u32) -> Self {
        Self { state: seed | 1 }
    }

    fn next_f32(&mut self) -> f32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        (x >> 8) as f32 / (1u32 << 24) as f32
    }
}

/// Tileable value noise (several octaves), values in [0,1].
fn value_noise(size: u32, cells: u32, octaves: u32, seed: u32) -> Vec<f32> {
    let mut rng = Rng32::from_seed(seed);
    let mut out = vec![0.0f32; (size * size) as usize];
    let mut total = 0.0;
    let mut amp = 1.0;
    for o in 0..octaves {
        let n = cells << o;
        let lattice: Vec<f32> = (0..n * n).map(|_| rng.next_f32()).collect();
        let at = |x: u32, y: u32| lattice[((y % n) * n + (x % n)) as usize];
        for y in 0..size {
            for x in 0..size {
                let fx = x as f32 * n as f32 / size as f32;
                let fy = y as f32 * n as f32 / size as f32;
                let (ix, iy) = (fx as u32, fy as u32);
                let smooth = |t: f32| t * t * (3.0 - 2.0 * t);
                let (tx, ty) = (smooth(fx - ix as f32), smooth(fy - iy as f32));
                let top = at(ix, iy) * (1.0 - tx) + at(ix + 1, iy) * tx;
                let bottom = at(ix, iy + 1) * (1.0 - tx) + at(ix + 1, iy + 1) * tx;
                out[(y * size + x) as usize] += amp * (top * (1.0 - ty) + bottom * ty);
            }
        }
        total += amp;
        amp *= 0.5;
    }
    for v in &mut out {
        *v /= total;
    }
    out
}

fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Circular Gaussian falloff with peak 1 at the center, reaching 0 at `radius`.
fn feathered_disc(d: f32, radius: f32) -> f32 {
    let sigma = radius * 0.5;
    let w = (-(d * d) / (2.0 * sigma * sigma)).exp();
    let edge = (-2.0f32).exp(); // value of w at d == radius
    ((w - edge) / (1.0 - edge)).clamp(0.0, 1.0)
}

pub const ONBOARDING_TEXT: &str = "SHOW ME YOUR HAND";

/// A stand-in for `kind`, good enough to run the effect without asset files.
pub fn procedural(kind: TextureKind) -> Texture {
    const FROST: u32 = 256;
    const SPRITE: u32 = 128;
    match kind {
        TextureKind::FrostDiffuse => {
            let n = value_noise(FROST, 8, 4, 0xC0FFEE);
            Texture::from_fn(FROST, FROST, |x, y| {
                let t = n[(y * FROST + x) as usize];
                let c = |lo: f32| to_u8(lo + (1.0 - lo) * t);
                Rgba([c(0.72), c(0.84), c(0.93), 255])
            })
        }
        TextureKind::FrostDudv => {
            let r = value_noise(FROST, 4, 3, 0xD00D);
            let g = value_noise(FROST, 4, 3, 0xBEEF);
            Texture::from_fn(FROST, FROST, |x, y| {
                let i = (y * FROST + x) as usize;
                Rgba([to_u8(r[i]), to_u8(g[i]), 0, 255])
            })
        }
        TextureKind::FrostTransparency => {
            let n = value_noise(FROST, 6, 4, 0x1CE);
            Texture::from_fn(FROST, FROST, |x, y| {
                let v = to_u8(0.35 + 0.5 * n[(y * FROST + x) as usize]);
                Rgba([v, v, v, 255])
            })
        }
        TextureKind::HandMask => {
            // Black with feathered coverage: alpha-blending it clears the frost mask.
            let r = SPRITE as f32 * 0.5;
            Texture::from_fn(SPRITE, SPRITE, |x, y| {
                let d = ((x as f32 + 0.5 - r).powi(2) + (y as f32 + 0.5 - r).powi(2)).sqrt();
                Rgba([0, 0, 0, to_u8(feathered_disc(d, r))])
            })
        }
        TextureKind::HandHint => {
            // Soft white ring with a faint fill.
            let r = SPRITE as f32 * 0.5;
            Texture::from_fn(SPRITE, SPRITE, |x, y| {
                let d = ((x as f32 + 0.5 - r).powi(2) + (y as f32 + 0.5 - r).powi(2)).sqrt() / r;
                let ring = (1.0 - ((d - 0.85) / 0.08).abs()).clamp(0.0, 1.0);
                let fill = if d < 0.85 { 0.12 } else { 0.0 };
                Rgba([255, 255, 255, to_u8(ring.max(fill))])
            })
        }
        TextureKind::OnboardingText => {
            // Full-frame overlay, text centered in the lower third.
            let (w, h, scale) = (640u32, 360u32, 5usize);
            let mut tex = Texture::new(w, h);
            let ox = (w as usize).saturating_sub(text_width_5x7(ONBOARDING_TEXT, scale)) / 2;
            let oy = (h as usize) * 2 / 3;
            for_each_text_pixel(ONBOARDING_TEXT, scale, |x, y| {
                let (x, y) = ((ox + x) as u32, (oy + y) as u32);
                if x < w && y < h {
                    tex.put_pixel(x, y, Rgba([255, 255, 255, 255]));
                }
            });
            tex
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn countdown_ignores_duplicates() {
        let mut set = TextureSet::new();
        assert_eq!(set.pending(), 6);
        assert!(set.insert(TextureKind::HandMask, Texture::new(1, 1)));
        assert!(!set.insert(TextureKind::HandMask, Texture::new(1, 1)));
        assert_eq!(set.pending(), 5);
        for kind in TextureKind::ALL {
            set.insert(kind, Texture::new(1, 1));
        }
        assert!(set.is_complete());
        assert!(set.get(TextureKind::OnboardingText).is_some());
    }

    #[test]
    fn noise_is_tileable_and_bounded() {
        let n = value_noise(32, 4, 3, 7);
        assert!(n.iter().all(|&v| (0.0..=1.0).contains(&v)));
        // Left and right edges continue into each other: neighbours across the seam are close.
        for y in 0..32 {
            let left = n[y * 32];
            let right = n[y * 32 + 31];
            assert!((left - right).abs() < 0.5);
        }
    }

    #[test]
    fn hand_mask_is_opaque_center_clear_edge() {
        let tex = procedural(TextureKind::HandMask);
        let (w, h) = tex.dimensions();
        assert!(tex.get_pixel(w / 2, h / 2).0[3] > 250);
        assert_eq!(tex.get_pixel(0, 0).0[3], 0);
        assert_eq!(tex.get_pixel(w / 2, h / 2).0[0], 0);
    }

    #[test]
    fn onboarding_text_has_ink() {
        let tex = procedural(TextureKind::OnboardingText);
        assert!(tex.pixels().any(|p| p.0[3] == 255));
        assert_eq!(tex.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn missing_directory_falls_back_once() {
        let loader = TextureLoader::new(&AssetConfig {
            dir: Some(PathBuf::from("/nonexistent/frost-assets")),
            procedural_fallback: true,
        });
        let (tx, rx) = mpsc::channel();
        loader.load(TextureKind::FrostDudv, move |kind, tex| {
            tx.send((kind, tex.dimensions())).ok();
        });
        let (kind, dims) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(kind, TextureKind::FrostDudv);
        assert_eq!(dims, (256, 256));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn no_fallback_never_delivers() {
        assert!(resolve(TextureKind::HandHint, Some(Path::new("/nonexistent/x.png")), false).is_none());
    }
}
