// Frost effect renderer.
//
// Each frame runs two passes, each built as an explicit list of draw commands:
//  1) mask pass: carry last frame's frost coverage forward, let frost regrow while no
//     hand is around, and wipe it away under the hand;
//  2) composite pass: camera frame, refractive frost surface (opacity = coverage),
//     onboarding text, hand hint.
// The two coverage masks swap roles between the passes, so the composite reads the
// coverage just written as "previous".

use crate::accumulation::AccumulationBufferPair;
use crate::assets::{TextureKind, TextureLoader, TextureSet};
use crate::clock::{AnimationClock, TimeSource};
use crate::config::{MaskAccumulationConfig, OnboardingTextConfig, RenderConfig};
use crate::error::{Error, LayerError};
use crate::gamma::GammaLut;
use crate::layering::{PerspectiveLayering, Plane};
use crate::raster::{
    Blend, Canvas, Fragment, Surface, Texture, Wrap, fill_plane, sample_frame, sample_texture,
};
use crate::types::{FrameBuffer, HandCircle, Mask};
use log::{debug, info, trace};
use std::borrow::Cow;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver};

// Mask pass layers.
const COVERAGE_CARRY_LAYER: i32 = -1;
const COVERAGE_DELTA_LAYER: i32 = -2;
const HAND_MASK_LAYER: i32 = -3;
// Composite pass layers.
const CAMERA_FRAME_LAYER: i32 = -1;
const FROST_LAYER: i32 = -2;
const HAND_HINT_LAYER: i32 = -3;
const ONBOARDING_TEXT_LAYER: i32 = -4;

/// Frost regrowth ramp. Its clock runs while the ramp is active and restarts
/// (opening a new cycle) each time it becomes active again.
pub struct MaskAccumulationAnimation {
    clock: AnimationClock,
    cycles: u32,
    config: MaskAccumulationConfig,
}

impl MaskAccumulationAnimation {
    pub fn new(time: Rc<dyn TimeSource>, config: MaskAccumulationConfig) -> Self {
        Self { clock: AnimationClock::new(time, false), cycles: 0, config }
    }

    /// Coverage to add this frame, or `None` while inactive or still in the intro.
    pub fn step(&mut self, active: bool) -> Option<f32> {
        if !active {
            self.clock.stop();
            return None;
        }
        if !self.clock.is_running() {
            self.clock.start();
            self.cycles += 1;
            debug!("coverage ramp cycle {}", self.cycles);
        }
        let intro = if self.cycles == 1 && self.config.skip_intro_during_first_cycle {
            0.0
        } else {
            self.config.animation_intro_length
        };
        let delta = self.clock.delta();
        let elapsed = self.clock.elapsed();
        if elapsed < intro {
            return None;
        }
        // Only count the part of this frame that lies past the intro.
        Some(delta.min(elapsed - intro) / self.config.animation_gain_length)
    }
}

/// Pulsing onboarding cue. Dismissed for good once a hand has been confirmed.
pub struct OnboardingTextAnimation {
    clock: AnimationClock,
    dismissed: bool,
    config: OnboardingTextConfig,
}

impl OnboardingTextAnimation {
    pub fn new(time: Rc<dyn TimeSource>, config: OnboardingTextConfig) -> Self {
        Self { clock: AnimationClock::new(time, false), dismissed: false, config }
    }

    /// Text opacity for this frame.
    pub fn step(&mut self, hand_present: bool) -> f32 {
        if hand_present && !self.dismissed {
            debug!("onboarding text dismissed");
            self.dismissed = true;
        }
        if self.dismissed {
            self.clock.stop();
            return 0.0;
        }
        if !self.clock.is_running() {
            self.clock.start();
        }
        let elapsed = self.clock.elapsed_time();
        let intro = self.config.opacity_animation_intro_length;
        if elapsed < intro {
            return 0.0;
        }
        // Triangle wave: 0 -> 1 over the first half of the loop, back to 0 over the second.
        let period = self.config.opacity_animation_loop_length;
        let opacity = 2.0 * ((elapsed - intro) % period) / period;
        if opacity > 1.0 { 2.0 - opacity } else { opacity }
    }
}

/// Inputs of the refractive frost surface.
pub struct FrostInputs<'a> {
    pub background: &'a FrameBuffer,
    pub ice_color: &'a Texture,
    pub ice_alpha: &'a Texture,
    pub dudv: &'a Texture,
    pub coverage: &'a Mask,
    pub distortion_strength: f32,
}

pub enum Material<'a> {
    /// Last frame's coverage, as a grey image.
    Coverage(&'a Mask),
    /// Uniform grey.
    Solid(f32),
    /// Texture with an opacity multiplier.
    Sprite { texture: &'a Texture, opacity: f32 },
    CameraFrame(&'a FrameBuffer),
    Frost(FrostInputs<'a>),
}

pub struct DrawCommand<'a> {
    pub layer: i32,
    pub plane: Plane,
    pub blend: Blend,
    pub material: Material<'a>,
}

/// Every texture the effect samples, borrowed for one frame.
struct FrameTextures<'a> {
    frost_diffuse: &'a Texture,
    frost_dudv: &'a Texture,
    frost_transparency: &'a Texture,
    hand_hint: &'a Texture,
    hand_mask: &'a Texture,
    onboarding_text: &'a Texture,
}

impl<'a> FrameTextures<'a> {
    fn from_set(set: &'a TextureSet) -> Option<Self> {
        Some(Self {
            frost_diffuse: set.get(TextureKind::FrostDiffuse)?,
            frost_dudv: set.get(TextureKind::FrostDudv)?,
            frost_transparency: set.get(TextureKind::FrostTransparency)?,
            hand_hint: set.get(TextureKind::HandHint)?,
            hand_mask: set.get(TextureKind::HandMask)?,
            onboarding_text: set.get(TextureKind::OnboardingText)?,
        })
    }
}

fn command<'a>(
    layering: &PerspectiveLayering,
    layer: i32,
    plane: Plane,
    blend: Blend,
    material: Material<'a>,
) -> Result<DrawCommand<'a>, LayerError> {
    let depth = layering.depth_for_layer(layer)?;
    Ok(DrawCommand { layer, plane: layering.place_at_depth(plane, depth), blend, material })
}

fn hand_sprite(hand: &HandCircle, radius_factor: f32) -> Plane {
    Plane::square(radius_factor * hand.radius, hand.center_x, hand.center_y)
}

fn mask_pass_commands<'a>(
    layering: &PerspectiveLayering,
    config: &RenderConfig,
    previous: &'a Mask,
    coverage_delta: Option<f32>,
    hand: Option<&HandCircle>,
    hand_mask: &'a Texture,
) -> Result<Vec<DrawCommand<'a>>, LayerError> {
    let viewport = Plane::viewport(config.viewport_width, config.viewport_height);
    let mut cmds = vec![command(
        layering,
        COVERAGE_CARRY_LAYER,
        viewport,
        Blend::Additive,
        Material::Coverage(previous),
    )?];
    if let Some(delta) = coverage_delta {
        cmds.push(command(layering, COVERAGE_DELTA_LAYER, viewport, Blend::Additive, Material::Solid(delta))?);
    }
    if let Some(hand) = hand {
        cmds.push(command(
            layering,
            HAND_MASK_LAYER,
            hand_sprite(hand, config.hand_mask_radius_factor),
            Blend::Alpha,
            Material::Sprite { texture: hand_mask, opacity: 1.0 },
        )?);
    }
    Ok(cmds)
}

fn composite_pass_commands<'a>(
    layering: &PerspectiveLayering,
    config: &RenderConfig,
    frame: &'a FrameBuffer,
    textures: &FrameTextures<'a>,
    coverage: &'a Mask,
    onboarding_opacity: f32,
    hand: Option<&HandCircle>,
) -> Result<Vec<DrawCommand<'a>>, LayerError> {
    let viewport = Plane::viewport(config.viewport_width, config.viewport_height);
    let frost = FrostInputs {
        background: frame,
        ice_color: textures.frost_diffuse,
        ice_alpha: textures.frost_transparency,
        dudv: textures.frost_dudv,
        coverage,
        distortion_strength: config.distortion_strength,
    };
    let mut cmds = vec![
        command(layering, CAMERA_FRAME_LAYER, viewport, Blend::Opaque, Material::CameraFrame(frame))?,
        command(layering, FROST_LAYER, viewport, Blend::Alpha, Material::Frost(frost))?,
        command(
            layering,
            ONBOARDING_TEXT_LAYER,
            viewport,
            Blend::Alpha,
            Material::Sprite { texture: textures.onboarding_text, opacity: onboarding_opacity },
        )?,
    ];
    if let Some(hand) = hand {
        cmds.push(command(
            layering,
            HAND_HINT_LAYER,
            hand_sprite(hand, config.hand_hint_radius_factor),
            Blend::Alpha,
            Material::Sprite { texture: textures.hand_hint, opacity: 1.0 },
        )?);
    }
    Ok(cmds)
}

fn shade_frost(frost: &FrostInputs, f: &Fragment) -> [f32; 4] {
    let s = frost.distortion_strength;
    // Distort the distortion lookup itself, then use the result as a signed offset.
    let first = sample_texture(frost.dudv, f.u, f.v, Wrap::Repeat);
    let warped = sample_texture(frost.dudv, f.u + first[0] * s, f.v + first[1] * s, Wrap::Repeat);
    let (du, dv) = ((warped[0] * 2.0 - 1.0) * s, (warped[1] * 2.0 - 1.0) * s);

    // Projective lookup: the offset is divided by the clip-space w (the plane depth).
    let w = f.depth.max(f32::EPSILON);
    let base = sample_frame(frost.background, f.screen_u + du / w, f.screen_v + dv / w);

    let ice = sample_texture(frost.ice_color, f.u, f.v, Wrap::Clamp);
    let ice_alpha = sample_texture(frost.ice_alpha, f.u, f.v, Wrap::Clamp)[0];
    let mix = |a: f32, b: f32| a + (b - a) * ice_alpha;
    [
        mix(base[0], ice[0]),
        mix(base[1], ice[1]),
        mix(base[2], ice[2]),
        frost.coverage.sample(f.u, f.v),
    ]
}

fn shade(material: &Material, f: &Fragment) -> [f32; 4] {
    match material {
        Material::Coverage(mask) => {
            let v = mask.sample(f.u, f.v);
            [v, v, v, 1.0]
        }
        Material::Solid(v) => [*v, *v, *v, 1.0],
        Material::Sprite { texture, opacity } => {
            let c = sample_texture(texture, f.u, f.v, Wrap::Clamp);
            [c[0], c[1], c[2], c[3] * opacity]
        }
        Material::CameraFrame(frame) => {
            let [r, g, b] = sample_frame(frame, f.u, f.v);
            [r, g, b, 1.0]
        }
        Material::Frost(frost) => shade_frost(frost, f),
    }
}

/// Draw far-to-near, then drop the list.
fn submit<S: Surface>(target: &mut S, layering: &PerspectiveLayering, mut commands: Vec<DrawCommand>) {
    commands.sort_by(|a, b| b.plane.depth().total_cmp(&a.plane.depth()));
    for cmd in &commands {
        let touched = fill_plane(target, layering, &cmd.plane, cmd.blend, |f| shade(&cmd.material, f));
        trace!("layer {} at depth {:.2}: {touched} px", cmd.layer, cmd.plane.depth());
    }
}

pub struct EffectRenderer {
    config: RenderConfig,
    layering: PerspectiveLayering,
    lut: GammaLut,
    buffers: AccumulationBufferPair,
    textures: TextureSet,
    inbox: Option<Receiver<(TextureKind, Texture)>>,
    ignore_hands_clock: AnimationClock,
    mask_accumulation: MaskAccumulationAnimation,
    onboarding: OnboardingTextAnimation,
    output: FrameBuffer,
}

impl EffectRenderer {
    pub fn new(config: RenderConfig, time: Rc<dyn TimeSource>) -> Self {
        let (w, h) = (config.viewport_width, config.viewport_height);
        Self {
            layering: PerspectiveLayering::new(&config),
            lut: GammaLut::new(),
            buffers: AccumulationBufferPair::new(w, h),
            textures: TextureSet::new(),
            inbox: None,
            ignore_hands_clock: AnimationClock::new(time.clone(), true),
            mask_accumulation: MaskAccumulationAnimation::new(time.clone(), config.mask_accumulation.clone()),
            onboarding: OnboardingTextAnimation::new(time, config.onboarding_text.clone()),
            output: FrameBuffer::new(w, h),
            config,
        }
    }

    /// Kick off loading of every texture through `loader`.
    pub fn request_textures(&mut self, loader: &TextureLoader) {
        let (tx, rx) = mpsc::channel();
        for kind in TextureKind::ALL {
            let tx = tx.clone();
            loader.load(kind, move |kind, texture| {
                // The renderer may be gone already; nothing to do then.
                let _ = tx.send((kind, texture));
            });
        }
        self.inbox = Some(rx);
    }

    /// Completion callback for one texture.
    pub fn on_texture_loaded(&mut self, kind: TextureKind, texture: Texture) {
        if self.textures.insert(kind, texture) && self.textures.is_complete() {
            info!("all textures loaded, effect ready");
        }
    }

    fn poll_textures(&mut self) {
        let Some(rx) = self.inbox.take() else { return };
        while let Ok((kind, texture)) = rx.try_recv() {
            self.on_texture_loaded(kind, texture);
        }
        if !self.textures.is_complete() {
            self.inbox = Some(rx);
        }
    }

    /// True once every texture has arrived. Check before tracking a frame.
    pub fn is_ready(&mut self) -> bool {
        self.poll_textures();
        self.textures.is_complete()
    }

    pub fn pending_textures(&self) -> usize {
        self.textures.pending()
    }

    pub fn viewport(&self) -> (usize, usize) {
        (self.config.viewport_width, self.config.viewport_height)
    }

    /// Render one frame. `Ok(None)` (and no state change) until all textures are loaded.
    pub fn render(
        &mut self,
        frame: &FrameBuffer,
        hand: Option<HandCircle>,
    ) -> Result<Option<&FrameBuffer>, Error> {
        if !self.is_ready() {
            return Ok(None);
        }
        let Self {
            config,
            layering,
            lut,
            buffers,
            textures,
            ignore_hands_clock,
            mask_accumulation,
            onboarding,
            output,
            ..
        } = self;
        let Some(textures) = FrameTextures::from_set(textures) else { return Ok(None) };

        let frame = if frame.width == config.viewport_width && frame.height == config.viewport_height {
            Cow::Borrowed(frame)
        } else {
            Cow::Owned(frame.resized(config.viewport_width, config.viewport_height))
        };

        // Let the intro animations play before reacting to hands.
        let hand = if ignore_hands_clock.elapsed_time() < config.ignore_hands_intro_length {
            None
        } else {
            hand
        };
        let coverage_delta = mask_accumulation.step(hand.is_none());
        let onboarding_opacity = onboarding.step(hand.is_some());

        {
            let (current, previous) = buffers.split_mut();
            current.clear();
            let cmds = mask_pass_commands(
                layering,
                config,
                previous,
                coverage_delta,
                hand.as_ref(),
                textures.hand_mask,
            )?;
            submit(current, layering, cmds);
        }
        // The coverage just written becomes "previous" for the composite and next frame.
        buffers.swap();

        output.pixels.fill(0);
        let cmds = composite_pass_commands(
            layering,
            config,
            &frame,
            &textures,
            buffers.previous(),
            onboarding_opacity,
            hand.as_ref(),
        )?;
        submit(&mut Canvas { frame: &mut *output, lut: &*lut }, layering, cmds);
        Ok(Some(&*output))
    }
}
