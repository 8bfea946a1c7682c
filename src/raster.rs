// Software rasterizer for camera-facing planes.
// A plane is projected to a screen rectangle; every pixel whose center falls inside
// gets a fragment (plane uv + screen uv + depth), a shader closure turns it into an
// sRGB RGBA color, and the target surface blends it in.

use crate::gamma::{GammaLut, pack_rgb, unpack_rgb};
use crate::layering::{PerspectiveLayering, Plane};
use crate::types::{FrameBuffer, Mask};
use image::RgbaImage;

pub type Texture = RgbaImage;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blend {
    /// Replace the destination.
    Opaque,
    /// dst += src * src_alpha (saturating).
    Additive,
    /// dst = mix(dst, src, src_alpha).
    Alpha,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wrap {
    Clamp,
    Repeat,
}

/// Everything a shader may look at for one pixel.
#[derive(Clone, Copy, Debug)]
pub struct Fragment {
    /// Plane-local coordinates, (0,0) bottom-left, (1,1) top-right.
    pub u: f32,
    pub v: f32,
    /// Same convention over the whole viewport.
    pub screen_u: f32,
    pub screen_v: f32,
    pub depth: f32,
}

pub trait Surface {
    fn size(&self) -> (usize, usize);
    fn blend(&mut self, idx: usize, rgba: [f32; 4], mode: Blend);
}

/// The mask stores one channel; red carries the value.
impl Surface for Mask {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn blend(&mut self, idx: usize, rgba: [f32; 4], mode: Blend) {
        let (v, a) = (rgba[0], rgba[3]);
        let m = &mut self.alpha[idx];
        *m = match mode {
            Blend::Opaque => v,
            Blend::Additive => *m + v * a,
            Blend::Alpha => *m * (1.0 - a) + v * a,
        }
        .clamp(0.0, 1.0);
    }
}

/// Output frame plus the gamma tables used for alpha blending into it.
pub struct Canvas<'a> {
    pub frame: &'a mut FrameBuffer,
    pub lut: &'a GammaLut,
}

impl Surface for Canvas<'_> {
    fn size(&self) -> (usize, usize) {
        (self.frame.width, self.frame.height)
    }

    fn blend(&mut self, idx: usize, rgba: [f32; 4], mode: Blend) {
        let dst = &mut self.frame.pixels[idx];
        let src = [rgba[0], rgba[1], rgba[2]];
        *dst = match mode {
            Blend::Opaque => pack_rgb(src),
            Blend::Additive => {
                let d = unpack_rgb(*dst);
                pack_rgb([d[0] + src[0] * rgba[3], d[1] + src[1] * rgba[3], d[2] + src[2] * rgba[3]])
            }
            Blend::Alpha => self.lut.blend_over(*dst, src, rgba[3]),
        };
    }
}

fn wrap_coord(i: i64, n: u32, wrap: Wrap) -> u32 {
    let n = n as i64;
    match wrap {
        Wrap::Clamp => i.clamp(0, n - 1) as u32,
        Wrap::Repeat => i.rem_euclid(n) as u32,
    }
}

/// Bilinear texture lookup at (u, v), v growing upwards. Channels in [0,1].
pub fn sample_texture(tex: &Texture, u: f32, v: f32, wrap: Wrap) -> [f32; 4] {
    let (w, h) = tex.dimensions();
    if w == 0 || h == 0 {
        return [0.0; 4];
    }
    let x = u * w as f32 - 0.5;
    let y = (1.0 - v) * h as f32 - 0.5;
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let (x0, y0) = (x0 as i64, y0 as i64);

    let texel = |tx: i64, ty: i64| tex.get_pixel(wrap_coord(tx, w, wrap), wrap_coord(ty, h, wrap)).0;
    let (a, b, c, d) = (texel(x0, y0), texel(x0 + 1, y0), texel(x0, y0 + 1), texel(x0 + 1, y0 + 1));

    let mut out = [0.0f32; 4];
    for ch in 0..4 {
        let top = a[ch] as f32 * (1.0 - fx) + b[ch] as f32 * fx;
        let bottom = c[ch] as f32 * (1.0 - fx) + d[ch] as f32 * fx;
        out[ch] = (top * (1.0 - fy) + bottom * fy) / 255.0;
    }
    out
}

/// Nearest lookup into a camera frame at (u, v), v growing upwards, clamped at the edges.
pub fn sample_frame(frame: &FrameBuffer, u: f32, v: f32) -> [f32; 3] {
    if frame.width == 0 || frame.height == 0 {
        return [0.0; 3];
    }
    let x = ((u * frame.width as f32) as i64).clamp(0, frame.width as i64 - 1) as usize;
    let y = (((1.0 - v) * frame.height as f32) as i64).clamp(0, frame.height as i64 - 1) as usize;
    unpack_rgb(frame.pixels[y * frame.width + x])
}

/// Rasterize one placed plane into `target`.
/// Returns the number of pixels touched (0 when the plane is off screen).
pub fn fill_plane<S, F>(
    target: &mut S,
    layering: &PerspectiveLayering,
    plane: &Plane,
    mode: Blend,
    mut shade: F,
) -> usize
where
    S: Surface,
    F: FnMut(&Fragment) -> [f32; 4],
{
    let Some(rect) = layering.screen_rect(plane) else { return 0 };
    let (w, h) = target.size();
    let (rw, rh) = (rect.x1 - rect.x0, rect.y1 - rect.y0);
    if rw <= 0.0 || rh <= 0.0 || w == 0 || h == 0 {
        return 0;
    }

    let ix0 = rect.x0.floor().max(0.0) as usize;
    let iy0 = rect.y0.floor().max(0.0) as usize;
    let ix1 = (rect.x1.ceil().max(0.0) as usize).min(w);
    let iy1 = (rect.y1.ceil().max(0.0) as usize).min(h);
    let depth = plane.depth();

    let mut touched = 0;
    for py in iy0..iy1 {
        let cy = py as f32 + 0.5;
        if cy < rect.y0 || cy >= rect.y1 {
            continue;
        }
        for px in ix0..ix1 {
            let cx = px as f32 + 0.5;
            if cx < rect.x0 || cx >= rect.x1 {
                continue;
            }
            let frag = Fragment {
                u: (cx - rect.x0) / rw,
                v: 1.0 - (cy - rect.y0) / rh,
                screen_u: cx / w as f32,
                screen_v: 1.0 - cy / h as f32,
                depth,
            };
            let rgba = shade(&frag);
            target.blend(py * w + px, rgba, mode);
            touched += 1;
        }
    }
    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use image::Rgba;

    fn small() -> (RenderConfig, PerspectiveLayering) {
        let cfg = RenderConfig { viewport_width: 16, viewport_height: 8, ..RenderConfig::default() };
        let l = PerspectiveLayering::new(&cfg);
        (cfg, l)
    }

    #[test]
    fn viewport_plane_covers_every_pixel_once() {
        let (cfg, l) = small();
        let mut mask = Mask::new(16, 8);
        let d = l.depth_for_layer(-1).unwrap();
        let plane = l.place_at_depth(Plane::viewport(cfg.viewport_width, cfg.viewport_height), d);
        let n = fill_plane(&mut mask, &l, &plane, Blend::Additive, |_| [0.25, 0.0, 0.0, 1.0]);
        assert_eq!(n, 16 * 8);
        assert!(mask.alpha.iter().all(|&a| (a - 0.25).abs() < 1e-6));
    }

    #[test]
    fn screen_uv_matches_plane_uv_for_viewport_plane() {
        let (cfg, l) = small();
        let mut mask = Mask::new(16, 8);
        let d = l.depth_for_layer(-2).unwrap();
        let plane = l.place_at_depth(Plane::viewport(cfg.viewport_width, cfg.viewport_height), d);
        fill_plane(&mut mask, &l, &plane, Blend::Opaque, |f| {
            assert!((f.u - f.screen_u).abs() < 1e-3 && (f.v - f.screen_v).abs() < 1e-3);
            assert!((f.depth - d).abs() < 1e-4);
            [0.0; 4]
        });
    }

    #[test]
    fn mask_blend_modes() {
        let mut m = Mask::new(1, 1);
        m.alpha[0] = 0.8;
        m.blend(0, [0.5, 0.0, 0.0, 1.0], Blend::Additive);
        assert_eq!(m.alpha[0], 1.0);
        m.blend(0, [0.0, 0.0, 0.0, 0.75], Blend::Alpha);
        assert!((m.alpha[0] - 0.25).abs() < 1e-6);
        m.blend(0, [0.6, 0.0, 0.0, 0.0], Blend::Opaque);
        assert!((m.alpha[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn bilinear_sampling_and_wrap() {
        let mut tex = Texture::new(2, 1);
        tex.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        tex.put_pixel(1, 0, Rgba([255, 255, 255, 255]));
        // Texel centers.
        assert!(sample_texture(&tex, 0.25, 0.5, Wrap::Clamp)[0] < 1e-6);
        assert!((sample_texture(&tex, 0.75, 0.5, Wrap::Clamp)[0] - 1.0).abs() < 1e-6);
        // Halfway between them.
        assert!((sample_texture(&tex, 0.5, 0.5, Wrap::Clamp)[0] - 0.5).abs() < 1e-6);
        // Repeat: one full period later is the same value.
        let a = sample_texture(&tex, 0.3, 0.5, Wrap::Repeat)[0];
        let b = sample_texture(&tex, 1.3, 0.5, Wrap::Repeat)[0];
        assert!((a - b).abs() < 1e-5);
    }

    #[test]
    fn frame_sampling_flips_v() {
        let fb = FrameBuffer { width: 1, height: 2, pixels: vec![0x00_FF_00_00, 0x00_00_00_FF] };
        assert_eq!(sample_frame(&fb, 0.5, 0.9), [1.0, 0.0, 0.0]);
        assert_eq!(sample_frame(&fb, 0.5, 0.1), [0.0, 0.0, 1.0]);
    }
}
