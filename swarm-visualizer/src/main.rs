use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn, LevelFilter};
use minimp4::Mp4Muxer;
use openh264::encoder::{BitRate, Encoder, EncoderConfig, FrameRate};
use openh264::formats::YUVBuffer;
use palette::Srgb;
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{BufReader, Cursor};
use std::f32::consts::TAU;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;
use swarm_common::{DotFrame, Group, SimulationConfig, Snapshot};

/// Half-width of a dot's ellipse, in world units.
const DOT_RADIUS_X: f32 = 1.5;
/// Half-length of a dot's ellipse, in world units.
const DOT_RADIUS_Y: f32 = 6.0;
/// Vertices sampled along a dot's outline.
const DOT_OUTLINE_SEGMENTS: usize = 24;

/// Command-line arguments for the visualizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input snapshot file path (.bin)
    #[arg(short, long)]
    input: PathBuf,

    /// Output video file path (.mp4)
    #[arg(short, long, default_value = "dot_swarm.mp4")]
    output: PathBuf,

    /// Width of the output video in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Height of the output video in pixels (calculated from aspect ratio if not provided)
    #[arg(long)]
    height: Option<u32>,

    /// Frames per second for the output video
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Optional path to the config.toml file to get exact world dimensions
    #[arg(long)]
    config: Option<PathBuf>,

    /// World width (used if config is not provided)
    #[arg(long, default_value_t = 1280.0)]
    world_width: f32,

    /// World height (used if config is not provided)
    #[arg(long, default_value_t = 720.0)]
    world_height: f32,

    /// Background color: a name (black, white, ...) or a hex code like "#202020"
    #[arg(long, default_value = "white")]
    bg_color: String,

    /// Number of snapshots drawn per parallel batch
    #[arg(long, default_value_t = 10)]
    chunk_size: usize,

    /// Also write every frame as a PNG into this directory
    #[arg(long)]
    frames_dir: Option<PathBuf>,
}

// Color definitions for named colors (RGBA format)
const COLOR_MAP: &[(&str, [u8; 4])] = &[
    ("black", [0, 0, 0, 255]),
    ("white", [255, 255, 255, 255]),
    ("gray", [128, 128, 128, 255]),
    ("red", [255, 0, 0, 255]),
    ("green", [0, 255, 0, 255]),
    ("blue", [0, 0, 255, 255]),
];

/// Parse a color name or hex code to RGBA values
fn parse_color(color_name: &str) -> [u8; 4] {
    for &(name, color) in COLOR_MAP {
        if name.eq_ignore_ascii_case(color_name) {
            return color;
        }
    }
    match Srgb::<u8>::from_str(color_name) {
        Ok(rgb) => [rgb.red, rgb.green, rgb.blue, 255],
        Err(_) => {
            warn!("Color '{}' not recognized, using white.", color_name);
            [255, 255, 255, 255]
        }
    }
}

/// Fill color of each group's dots.
fn group_color(group: Group) -> [u8; 4] {
    match group {
        Group::A => [0x00, 0x00, 0x00, 255],
        Group::B => [0xff, 0x90, 0x00, 255],
        Group::C => [0xff, 0x00, 0xae, 255],
        Group::D => [0x00, 0xff, 0xff, 255],
    }
}

/// Rounds down to an even pixel count, as YUV 4:2:0 needs.
fn even(px: u32) -> u32 {
    (px & !1).max(2)
}

// Struct to represent a video frame
struct Frame {
    index: usize,
    image: RgbaImage,
}

/// Fills a dot's ellipse, rotated by its heading, centred on the dot.
///
/// The outline is sampled into a polygon for `draw_polygon_mut`. The centre
/// pixel is always painted so dots smaller than a pixel stay visible.
fn draw_dot(image: &mut RgbaImage, dot: &DotFrame, pixels_per_unit: f32) {
    let cx = dot.x * pixels_per_unit;
    let cy = dot.y * pixels_per_unit;
    let rx = DOT_RADIUS_X * pixels_per_unit;
    let ry = DOT_RADIUS_Y * pixels_per_unit;
    let (sin, cos) = dot.heading.sin_cos();
    let color = Rgba(group_color(dot.group));

    let mut outline: Vec<Point<i32>> = Vec::with_capacity(DOT_OUTLINE_SEGMENTS);
    for i in 0..DOT_OUTLINE_SEGMENTS {
        let t = i as f32 / DOT_OUTLINE_SEGMENTS as f32 * TAU;
        let (lx, ly) = (rx * t.cos(), ry * t.sin());
        let point = Point::new((cx + lx * cos - ly * sin).round() as i32, (cy + lx * sin + ly * cos).round() as i32);
        if outline.last() != Some(&point) {
            outline.push(point);
        }
    }
    // draw_polygon_mut panics when the polygon is closed explicitly.
    while outline.len() > 1 && outline.first() == outline.last() {
        outline.pop();
    }

    if outline.len() >= 3 {
        draw_polygon_mut(image, &outline, color);
    }
    let (px, py) = (cx.round() as i64, cy.round() as i64);
    if px >= 0 && py >= 0 && px < i64::from(image.width()) && py < i64::from(image.height()) {
        image.put_pixel(px as u32, py as u32, color);
    }
}

/// Draw a snapshot frame
fn draw_frame(snapshot: &Snapshot, frame_index: usize, width: u32, height: u32, pixels_per_unit: f32, bg_color: [u8; 4]) -> Frame {
    let mut image = ImageBuffer::from_pixel(width, height, Rgba(bg_color));

    if let Some(dots) = &snapshot.dots {
        for dot in dots {
            draw_dot(&mut image, dot, pixels_per_unit);
        }
    }

    Frame { index: frame_index, image }
}

/// RGB to YUV 4:2:0 (BT.601) for the H.264 encoder.
fn rgb_to_yuv420(image: &RgbaImage) -> Vec<u8> {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let y_plane_size = width * height;
    let mut yuv = vec![0u8; y_plane_size + y_plane_size / 2];

    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b, _] = pixel.0.map(f32::from);
        yuv[y as usize * width + x as usize] = (0.299 * r + 0.587 * g + 0.114 * b).round() as u8;
    }

    let u_plane_offset = y_plane_size;
    let v_plane_offset = y_plane_size + y_plane_size / 4;
    let uv_width = width / 2;
    for y in (0..height).step_by(2) {
        for x in (0..width).step_by(2) {
            let (mut sum_u, mut sum_v, mut count) = (0f32, 0f32, 0f32);
            for (sx, sy) in [(x, y), (x + 1, y), (x, y + 1), (x + 1, y + 1)] {
                if sx < width && sy < height {
                    let [r, g, b, _] = image.get_pixel(sx as u32, sy as u32).0.map(f32::from);
                    sum_u += -0.169 * r - 0.331 * g + 0.5 * b + 128.0;
                    sum_v += 0.5 * r - 0.419 * g - 0.081 * b + 128.0;
                    count += 1.0;
                }
            }
            let uv_idx = (y / 2) * uv_width + x / 2;
            yuv[u_plane_offset + uv_idx] = (sum_u / count).round() as u8;
            yuv[v_plane_offset + uv_idx] = (sum_v / count).round() as u8;
        }
    }

    yuv
}

/// Reads the `u32` count header followed by that many bincode snapshots.
fn read_snapshots(path: &Path) -> Result<Vec<Snapshot>> {
    let input_file = File::open(path).with_context(|| format!("Failed to open input file: {}", path.display()))?;
    let mut reader = BufReader::new(input_file);

    let snapshot_count: u32 = bincode::deserialize_from(&mut reader).context("Failed to read snapshot count from header")?;
    info!("Found {} snapshots in the file", snapshot_count);

    let mut snapshots = Vec::with_capacity(snapshot_count as usize);
    for i in 0..snapshot_count {
        match bincode::deserialize_from::<_, Snapshot>(&mut reader) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => {
                error!("Error deserializing snapshot {}: {}. Keeping the {} read so far.", i, e, snapshots.len());
                break;
            }
        }
    }
    Ok(snapshots)
}

fn progress_bar(len: u64, template: &str) -> Result<ProgressBar> {
    let bar = ProgressBar::new(len);
    bar.set_style(ProgressStyle::default_bar().template(template)?.progress_chars("#>-"));
    Ok(bar)
}

fn main() -> Result<()> {
    let args = Args::parse();
    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    Builder::from_default_env().filter(None, LevelFilter::Info).init();

    info!("Starting Swarm Visualizer...");
    info!("Input file: {}", args.input.display());
    info!("Output video: {}", args.output.display());

    // --- Determine World Dimensions ---
    let (world_width, world_height) = match &args.config {
        Some(config_path) => match SimulationConfig::load(config_path) {
            Ok(config) => {
                info!("Loaded world dimensions from {}", config_path.display());
                (config.world.width, config.world.height)
            }
            Err(e) => {
                warn!("Failed to load config file '{}': {}. Using provided dimensions.", config_path.display(), e);
                (args.world_width, args.world_height)
            }
        },
        None => (args.world_width, args.world_height),
    };
    info!("World size: {:.1} x {:.1}", world_width, world_height);

    // --- Calculate Output Dimensions and Scale ---
    let output_width_px = even(args.width);
    let output_height_px = even(args.height.unwrap_or_else(|| (output_width_px as f32 * world_height / world_width) as u32));
    let pixels_per_unit = (output_width_px as f32 / world_width).min(output_height_px as f32 / world_height);
    info!("Output video dimensions: {}x{} px at {} fps", output_width_px, output_height_px, args.fps);
    debug!("Scale: {:.4} pixels per world unit", pixels_per_unit);

    let bg_color = parse_color(&args.bg_color);

    // --- Read Snapshots ---
    let snapshots = read_snapshots(&args.input)?;
    if snapshots.is_empty() {
        warn!("Input file contains no snapshots. Exiting.");
        return Ok(());
    }
    let with_dots = snapshots.iter().filter(|s| s.dots.as_ref().is_some_and(|d| !d.is_empty())).count();
    if with_dots == 0 {
        warn!("No snapshots contain dot data! Set save_dots_in_snapshot = true in the config.");
    }

    // --- Draw Frames in Parallel ---
    let start_time = Instant::now();
    let draw_progress = progress_bar(
        snapshots.len() as u64,
        "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) [{eta}]",
    )?;
    let chunk_size = args.chunk_size.max(1);
    let mut frames: Vec<Frame> = Vec::with_capacity(snapshots.len());
    for (chunk_idx, chunk) in snapshots.chunks(chunk_size).enumerate() {
        let drawn: Vec<Frame> = chunk
            .par_iter()
            .enumerate()
            .map(|(i, snapshot)| {
                draw_frame(snapshot, chunk_idx * chunk_size + i, output_width_px, output_height_px, pixels_per_unit, bg_color)
            })
            .collect();
        draw_progress.inc(drawn.len() as u64);
        frames.extend(drawn);
    }
    draw_progress.finish_with_message("Frames drawn");

    if let Some(dir) = &args.frames_dir {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create frames directory {}", dir.display()))?;
        frames.par_iter().try_for_each(|frame| {
            let path = dir.join(format!("frame_{:05}.png", frame.index));
            frame.image.save(&path).with_context(|| format!("Failed to write {}", path.display()))
        })?;
        info!("Wrote {} PNG frames to {}", frames.len(), dir.display());
    }

    // --- Encode ---
    let mut encoder = Encoder::with_api_config(
        openh264::OpenH264API::from_source(),
        EncoderConfig::new()
            .max_frame_rate(FrameRate::from_hz(args.fps as f32))
            .bitrate(BitRate::from_bps(5_000_000)),
    )
    .context("Failed to initialize H.264 encoder")?;

    let encode_progress = progress_bar(
        frames.len() as u64,
        "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} encoded ({percent}%) [{eta}]",
    )?;
    let mut h264_data = Vec::new();
    let mut frame_count = 0usize;
    for frame in &frames {
        let yuv_source = YUVBuffer::from_vec(rgb_to_yuv420(&frame.image), output_width_px as usize, output_height_px as usize);
        match encoder.encode(&yuv_source) {
            Ok(bitstream) => {
                bitstream.write_vec(&mut h264_data);
                frame_count += 1;
            }
            Err(e) => error!("Error encoding frame {}: {}", frame.index, e),
        }
        encode_progress.inc(1);
    }
    encode_progress.finish_with_message(format!("Encoded {} frames", frame_count));

    // --- Mux MP4 ---
    let mut video_buffer = Cursor::new(Vec::new());
    {
        let mut mp4muxer = Mp4Muxer::new(&mut video_buffer);
        let dot_count = snapshots.first().map_or(0, |s| s.dot_count);
        mp4muxer.init_video(output_width_px as i32, output_height_px as i32, false, &format!("Dot swarm - {} dots", dot_count));
        mp4muxer.write_video(&h264_data);
        mp4muxer.close();
    }

    fs::write(&args.output, video_buffer.into_inner())
        .with_context(|| format!("Failed to write video file to {}", args.output.display()))?;

    let duration = start_time.elapsed();
    info!(
        "Video generation completed in {:.2?} ({:.1} frames per second)",
        duration,
        frame_count as f64 / duration.as_secs_f64()
    );
    info!("Output saved to: {}", args.output.display());
    Ok(())
}
