// What you SEE:
// • Live camera, slowly frosting over while no hand is in view.
// • Hold Left Mouse (or replay a recording with --replay): the frost melts under the hand.
// • D toggles the debug overlay (landmarks, hand circle, palm center, FPS).
// • R resets hand tracking. S saves a PNG screenshot. ESC quits.

mod accumulation;
mod assets;
mod camera;
mod clock;
mod config;
mod draw;
mod effect;
mod error;
mod gamma;
mod geometry;
mod hand;
mod layering;
mod pipeline;
mod raster;
mod tracker;
mod types;

use assets::TextureLoader;
use camera::CameraCapture;
use clap::Parser;
use clock::MonotonicTime;
use config::AppConfig;
use draw::{Drawer, draw_circle, draw_crosshair, draw_line, draw_text_5x7};
use effect::EffectRenderer;
use error::Error;
use log::{debug, error, info};
use pipeline::FramePipeline;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracker::{HandTracker, PointerHandTracker, ReplayHandTracker};
use types::FrameBuffer;

const HUD_WHITE: u32 = 0x00_FF_FF_FF;
const SKELETON_COLOR: u32 = 0x00_33_CC_FF;
const CIRCLE_COLOR: u32 = 0x00_FF_CC_33;
// Synthetic pointer hand, as a fraction of the frame height.
const POINTER_HAND_HEIGHT: f32 = 0.3;

#[derive(Parser, Debug)]
#[command(name = "frost-melt", about = "Camera feed that frosts over and melts under your hand")]
struct Args {
    /// TOML config file; built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Camera device index (overrides the config).
    #[arg(long)]
    camera: Option<u32>,
    /// Replay recorded hand landmarks (JSON lines) instead of following the mouse.
    #[arg(long)]
    replay: Option<PathBuf>,
    /// Texture directory (overrides the config).
    #[arg(long)]
    assets: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run(Args::parse()) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Error> {
    let mut cfg = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(index) = args.camera {
        cfg.camera.index = index;
    }
    if let Some(dir) = args.assets {
        cfg.assets.dir = Some(dir);
    }
    cfg.validate()?;

    let (w, h) = (cfg.effect.viewport_width, cfg.effect.viewport_height);
    info!(
        "viewport {w}x{h}, fov {}°, {} layers, assets {}",
        cfg.effect.vertical_fov,
        cfg.effect.num_layers_upper_bound,
        cfg.assets.dir.as_ref().map_or("<procedural>".into(), |d| d.display().to_string())
    );

    /* --- Camera + window ---
       Visual: window opens at the viewport size; camera frames are resampled to fit. */
    let cam = CameraCapture::open(&cfg.camera)?;
    let (cw, ch) = cam.resolution();
    if (cw as usize, ch as usize) != (w, h) {
        info!("resampling camera {cw}x{ch} to {w}x{h}");
    }
    let drawer = Drawer::new("Frost Melt", w, h)?;

    /* --- Effect ---
       Visual: nothing but the raw feed until every texture has arrived. */
    let mut renderer = EffectRenderer::new(cfg.effect.clone(), Rc::new(MonotonicTime::new()));
    renderer.request_textures(&TextureLoader::new(&cfg.assets));

    match &args.replay {
        Some(path) => {
            let tracker = ReplayHandTracker::open(path)?;
            let pipeline = FramePipeline::new(tracker, &cfg.tracker, &cfg.filter, renderer);
            run_loop(cam, drawer, pipeline, (w, h), |_, _| {})
        }
        None => {
            info!("pointer hand: hold the left mouse button over the window");
            let tracker = PointerHandTracker::new(POINTER_HAND_HEIGHT);
            let pipeline = FramePipeline::new(tracker, &cfg.tracker, &cfg.filter, renderer);
            run_loop(cam, drawer, pipeline, (w, h), |t, d| {
                let pointer = d
                    .left_mouse_down()
                    .then(|| d.mouse_pos())
                    .flatten()
                    .map(|(x, y)| (x / w as f32, y / h as f32));
                t.set_pointer(pointer);
            })
        }
    }
}

/// Main loop. `feed` hands window input to the tracker before each frame is sent.
fn run_loop<T: HandTracker>(
    mut cam: CameraCapture,
    mut drawer: Drawer,
    mut pipeline: FramePipeline<T>,
    (w, h): (usize, usize),
    mut feed: impl FnMut(&mut T, &Drawer),
) -> Result<(), Error> {
    let mut show_debug = false;
    let mut hud_fps_text = String::from("FPS: 0.0");
    let mut frames_this_second: u32 = 0;
    let mut last_fps_time = Instant::now();

    while drawer.is_open() && !drawer.esc_pressed() {
        /* 1) Live frame at the viewport size. */
        let live = cam.next_frame()?.resized(w, h);

        /* 2) Keys */
        if drawer.d_pressed_once() {
            show_debug = !show_debug;
        }
        if drawer.r_pressed_once() {
            pipeline.reset_tracking();
        }
        let save = drawer.s_pressed_once();

        /* 3) Still loading: show the raw feed with a tag. */
        if !pipeline.is_ready() {
            let mut screen = live;
            let tag = format!("LOADING | {} TEXTURES LEFT", pipeline.pending_textures());
            draw_text_5x7(&mut screen, 8, 8, &tag, HUD_WHITE);
            drawer.present(&screen)?;
            continue;
        }

        /* 4) Track + render. */
        feed(pipeline.tracker_mut(), &drawer);
        let mut screen = match pipeline.process_frame(live)? {
            Some(out) => out.clone(),
            None => continue,
        };

        /* 5) Screenshot (without the overlay), then debug overlay on top. */
        if save {
            save_screenshot(&screen)?;
        }
        if show_debug {
            draw_debug_overlay(&mut screen, &pipeline, &hud_fps_text);
        }
        drawer.present(&screen)?;

        /* 6) FPS */
        frames_this_second += 1;
        let now = Instant::now();
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let fps = frames_this_second as f32 / now.duration_since(last_fps_time).as_secs_f32();
            debug!("fps {fps:.1}");
            hud_fps_text = format!("FPS: {fps:.1}");
            frames_this_second = 0;
            last_fps_time = now;
        }
    }
    Ok(())
}

fn save_screenshot(frame: &FrameBuffer) -> Result<(), Error> {
    let stamp = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
    let path = PathBuf::from(format!("frost-{stamp}.png"));
    frame.to_rgba_image().save(&path)?;
    info!("saved {}", path.display());
    Ok(())
}

/// Landmarks, palm centers and the filtered hand circle, plus a one-line HUD.
fn draw_debug_overlay<T: HandTracker>(screen: &mut FrameBuffer, pipeline: &FramePipeline<T>, fps: &str) {
    let (w, h) = (screen.width as f32, screen.height as f32);
    let mut angle_text = String::new();

    for hand in pipeline.last_landmarks().unwrap_or_default() {
        let px = |i: usize| ((hand[i].x * w) as i32, (hand[i].y * h) as i32);
        if hand.len() >= geometry::NUM_HAND_LANDMARKS {
            for &(a, b) in &geometry::HAND_SKELETON {
                let ((x0, y0), (x1, y1)) = (px(a), px(b));
                draw_line(screen, x0, y0, x1, y1, SKELETON_COLOR);
            }
            // Hand direction: wrist toward the middle knuckle, y up.
            let (wrist, knuckle) = (hand[geometry::WRIST], hand[geometry::MIDDLE_MCP]);
            let angle = geometry::arctan360((knuckle.x - wrist.x) * w, (wrist.y - knuckle.y) * h);
            angle_text = format!(" | ANGLE: {:.0}", angle.to_degrees());
        }
        if let Some(palm) = geometry::palm_center(hand) {
            draw_crosshair(screen, (palm.x * w) as i32, (palm.y * h) as i32, 10, SKELETON_COLOR);
        }
    }

    let hand_text = match pipeline.last_hand() {
        Some(c) => {
            let (cx, cy) = (w * 0.5 + c.center_x, h * 0.5 - c.center_y);
            draw_circle(screen, cx as i32, cy as i32, c.radius as i32, CIRCLE_COLOR);
            draw_crosshair(screen, cx as i32, cy as i32, 6, CIRCLE_COLOR);
            format!("HAND: {:.0} {:.0} R {:.0}", c.center_x, c.center_y, c.radius)
        }
        None => String::from("HAND: NONE"),
    };
    let hud = format!("DEBUG | {hand_text}{angle_text} | {fps}");
    draw_text_5x7(screen, 8, 8, &hud, HUD_WHITE);
}
