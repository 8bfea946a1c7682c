// Gamma-correct blending for the composite pass, with powf replaced by table lookups.
// Colors travel through the renderer as sRGB-encoded [0,1] floats; blending happens
// in linear light so soft frost edges don't darken into halos.

pub struct GammaLut {
    // sRGB(0..255) -> linear (0..1)
    srgb_to_linear: [f32; 256],
    // linear(0..1) -> sRGB(0..255), index = (linear * 4095).round()
    linear_to_srgb: [u8; 4096],
}

impl GammaLut {
    /// Build both tables once at startup.
    pub fn new() -> Self {
        let mut s2l = [0.0f32; 256];
        for (v, slot) in s2l.iter_mut().enumerate() {
            let c = v as f32 / 255.0;
            *slot = if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) };
        }

        let mut l2s = [0u8; 4096];
        for (i, slot) in l2s.iter_mut().enumerate() {
            let l = i as f32 / 4095.0;
            let s = if l <= 0.003_130_8 { 12.92 * l } else { 1.055 * l.powf(1.0 / 2.4) - 0.055 };
            *slot = (s * 255.0).round().clamp(0.0, 255.0) as u8;
        }

        Self { srgb_to_linear: s2l, linear_to_srgb: l2s }
    }

    #[inline]
    pub fn srgb_u8_to_linear(&self, v: u8) -> f32 {
        self.srgb_to_linear[v as usize]
    }

    #[inline]
    pub fn linear_to_srgb_u8(&self, l: f32) -> u8 {
        let idx = (l.clamp(0.0, 1.0) * 4095.0).round() as usize;
        self.linear_to_srgb[idx]
    }

    /// Blend an sRGB color (channels in [0,1]) over a 0x00RRGGBB pixel with coverage `a`.
    pub fn blend_over(&self, dst: u32, src: [f32; 3], a: f32) -> u32 {
        if a <= 0.0 {
            return dst;
        }
        if a >= 1.0 {
            return pack_rgb(src);
        }
        let d = unpack_rgb8(dst);
        let mut out = [0u8; 3];
        for c in 0..3 {
            let s_lin = self.srgb_u8_to_linear(unit_to_u8(src[c]));
            let d_lin = self.srgb_u8_to_linear(d[c]);
            out[c] = self.linear_to_srgb_u8(a * s_lin + (1.0 - a) * d_lin);
        }
        ((out[0] as u32) << 16) | ((out[1] as u32) << 8) | out[2] as u32
    }
}

#[inline]
pub fn unit_to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[inline]
pub fn unpack_rgb8(px: u32) -> [u8; 3] {
    [((px >> 16) & 0xFF) as u8, ((px >> 8) & 0xFF) as u8, (px & 0xFF) as u8]
}

/// 0x00RRGGBB -> sRGB floats in [0,1].
#[inline]
pub fn unpack_rgb(px: u32) -> [f32; 3] {
    let [r, g, b] = unpack_rgb8(px);
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
}

/// sRGB floats in [0,1] -> 0x00RRGGBB.
#[inline]
pub fn pack_rgb(c: [f32; 3]) -> u32 {
    ((unit_to_u8(c[0]) as u32) << 16) | ((unit_to_u8(c[1]) as u32) << 8) | unit_to_u8(c[2]) as u32
}
