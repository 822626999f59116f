//! Depth streaming demo - encode, publish and decode depth frames
//!
//! Usage: spacestream [OPTIONS]
//!
//! Runs the pipeline from a synthetic scene (or a RealSense camera), publishes
//! into an in-process channel and decodes every frame on the receiving side,
//! logging how far the decoded depth is from the source.
//!
//! Examples:
//!   spacestream --frames 300                           # linear codec, 0-6 m
//!   spacestream --codec hue --curve ease-out --max 4   # hue codec, near precision
//!   spacestream --cycle 60                             # switch codec every 60 frames

use anyhow::Result;
use spacestream::codec::{
    CodecConfig, CodecVariant, DepthBounds, DepthBuffer, RemapCurve, DEFAULT_DEPTH_UNIT_SCALE,
};
use spacestream::{
    compose, ChannelPublisher, DepthSource, PipelineBuilder, StreamConfig, StreamReceiver,
    SyntheticDepthSource,
};
use std::env;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

struct Args {
    codec: CodecVariant,
    curve: RemapCurve,
    min_distance: f64,
    max_distance: f64,
    hue_sweep: f32,
    frames: Option<u64>,
    width: u32,
    height: u32,
    fps: u32,
    median: bool,
    color: bool,
    bgr: bool,
    cycle: Option<u64>,
    snapshot: Option<PathBuf>,
    realsense: bool,
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = env::args().collect();

    let mut parsed = Args {
        codec: CodecVariant::Linear,
        curve: RemapCurve::Linear,
        min_distance: 0.0,
        max_distance: 6.0,
        hue_sweep: spacestream::codec::DEFAULT_HUE_SWEEP_DEGREES,
        frames: None,
        width: 640,
        height: 480,
        fps: 30,
        median: false,
        color: true,
        bgr: false,
        cycle: None,
        snapshot: None,
        realsense: false,
    };
    let mut i = 1;

    while i < args.len() {
        let arg = args[i].as_str();

        match arg {
            "--help" | "-h" => return None,
            "--median" => parsed.median = true,
            "--no-color" => parsed.color = false,
            "--bgr" => parsed.bgr = true,
            "--realsense" => parsed.realsense = true,
            _ => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("Error: {} requires an argument", arg);
                    return None;
                };
                let ok = match arg {
                    "--codec" => value.parse().map(|v| parsed.codec = v).is_ok(),
                    "--curve" => value.parse().map(|v| parsed.curve = v).is_ok(),
                    "--min" => value.parse().map(|v| parsed.min_distance = v).is_ok(),
                    "--max" => value.parse().map(|v| parsed.max_distance = v).is_ok(),
                    "--hue-sweep" => value.parse().map(|v| parsed.hue_sweep = v).is_ok(),
                    "--frames" => value.parse().map(|v| parsed.frames = Some(v)).is_ok(),
                    "--width" => value.parse().map(|v| parsed.width = v).is_ok(),
                    "--height" => value.parse().map(|v| parsed.height = v).is_ok(),
                    "--fps" => value.parse().map(|v| parsed.fps = v).is_ok(),
                    "--cycle" => value.parse().map(|v| parsed.cycle = Some(v)).is_ok(),
                    "--snapshot" => {
                        parsed.snapshot = Some(PathBuf::from(value));
                        true
                    }
                    _ => {
                        eprintln!("Error: unknown option {}", arg);
                        return None;
                    }
                };
                if !ok {
                    eprintln!("Error: invalid value for {}: {}", arg, value);
                    return None;
                }
                i += 1;
            }
        }
        i += 1;
    }

    Some(parsed)
}

fn print_usage() {
    println!("Usage: spacestream [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --codec <name>       linear | hue (default: linear)");
    println!("  --curve <name>       linear | ease-out (default: linear)");
    println!("  --min <m>            Near end of the distance window (default: 0)");
    println!("  --max <m>            Far end of the distance window (default: 6)");
    println!("  --hue-sweep <deg>    Hue sweep of the hue codec (default: 300)");
    println!("  --frames <n>         Stop after n frames (default: run until Ctrl-C)");
    println!("  --width <px>         Capture width (default: 640)");
    println!("  --height <px>        Capture height (default: 480)");
    println!("  --fps <n>            Frame rate, 0 for unpaced (default: 30)");
    println!("  --median             3x3 median over the encoded depth map");
    println!("  --no-color           Publish the depth map alone");
    println!("  --bgr                Publish BGR frames");
    println!("  --cycle <n>          Switch codec every n frames");
    println!("  --snapshot <path>    Save the first published frame as PNG");
    println!("  --realsense          Capture from a RealSense camera");
    println!();
    println!("Examples:");
    println!("  spacestream --frames 300");
    println!("  spacestream --codec hue --curve ease-out --max 4");
    println!("  spacestream --cycle 60");
}

/// Open the camera and return it with its depth unit.
#[cfg(feature = "realsense")]
fn open_realsense(args: &Args) -> Result<(Box<dyn DepthSource>, f64)> {
    let devices = spacestream::list_devices()?;
    if devices.is_empty() {
        anyhow::bail!("No RealSense devices found");
    }
    for device in &devices {
        tracing::info!("Found {} ({})", device.name, device.serial);
    }
    let source = spacestream::RealSenseSource::open(args.width, args.height, args.fps, None)?;
    let scale = source.depth_unit_scale();
    tracing::info!("Depth unit: {} m", scale);
    Ok((Box::new(source), scale))
}

#[cfg(not(feature = "realsense"))]
fn open_realsense(_args: &Args) -> Result<(Box<dyn DepthSource>, f64)> {
    anyhow::bail!("built without the `realsense` feature")
}

/// Mean absolute error over samples with a reading, and the number of
/// readings lost or invented by the round trip.
fn compare(truth: &DepthBuffer, decoded: &DepthBuffer, bounds: DepthBounds) -> (f64, usize) {
    let mut total = 0u64;
    let mut count = 0u64;
    let mut mismatched = 0;
    for (&expected, &got) in truth.data.iter().zip(&decoded.data) {
        match bounds.clamp(expected) {
            Some(clamped) if got != 0 => {
                total += u64::from(clamped.abs_diff(got));
                count += 1;
            }
            None if got == 0 => {}
            _ => mismatched += 1,
        }
    }
    let mae = if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    };
    (mae, mismatched)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("spacestream=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .init();

    let args = match parse_args() {
        Some(a) => a,
        None => {
            print_usage();
            return Ok(());
        }
    };

    let config = StreamConfig {
        codec: CodecConfig::new(args.codec)
            .curve(args.curve)
            .hue_sweep(args.hue_sweep),
        min_distance: args.min_distance,
        max_distance: args.max_distance,
        median_filter: args.median,
        compose_color: args.color,
    };

    let mut truth = None;
    let (source, depth_unit_scale): (Box<dyn DepthSource>, f64) = if args.realsense {
        open_realsense(&args)?
    } else {
        let mut synthetic = SyntheticDepthSource::new(args.width, args.height);
        if let Some(frames) = args.frames {
            synthetic = synthetic.frame_limit(frames);
        }
        truth = Some(synthetic.clone());
        (Box::new(synthetic), DEFAULT_DEPTH_UNIT_SCALE)
    };

    let (publisher, mut rx) = ChannelPublisher::new(8);
    let mut pipeline = PipelineBuilder::new(source, publisher.bgr(args.bgr))
        .config(config)
        .fps(args.fps)
        .depth_unit_scale(depth_unit_scale)
        .build()?;
    pipeline.on_codec_change(|variant| tracing::info!("Now streaming with the {} codec", variant));

    let cancel = CancellationToken::new();
    let handle = pipeline.config_handle();

    let consumer_cancel = cancel.clone();
    let frame_limit = args.frames;
    let cycle = args.cycle;
    let mut snapshot = args.snapshot.clone();
    let consumer = tokio::spawn(async move {
        let mut receiver: Option<StreamReceiver> = None;
        let mut received = 0u64;

        while let Some(frame) = rx.recv().await {
            match receiver.as_mut() {
                Some(r) => r.update(frame.descriptor)?,
                None => {
                    tracing::info!("Stream descriptor: {}", frame.descriptor.to_json()?);
                    receiver = Some(StreamReceiver::new(frame.descriptor)?);
                }
            }
            let Some(active) = receiver.as_ref() else {
                continue;
            };

            if let Some(path) = snapshot.take() {
                compose::to_rgb_image(&frame.image)?.save(&path)?;
                tracing::info!("Saved snapshot to {}", path.display());
            }

            let decoded = active.decode(&frame.image)?;
            match &truth {
                Some(truth) => {
                    let (mae, mismatched) = compare(
                        &truth.frame_at(frame.sequence).depth,
                        &decoded,
                        frame.descriptor.bounds()?,
                    );
                    tracing::debug!(
                        "Frame {}: {} mean abs error {:.2} (bound {}), {} holes mismatched",
                        frame.sequence,
                        frame.descriptor.codec.variant,
                        mae,
                        active.error_bound(),
                        mismatched
                    );
                }
                None => {
                    tracing::debug!(
                        "Frame {}: {} valid samples",
                        frame.sequence,
                        decoded.valid_count()
                    );
                }
            }

            received += 1;
            if let Some(n) = cycle {
                if received % n == 0 {
                    let next = match handle.current().codec.variant {
                        CodecVariant::Linear => CodecVariant::HueColorization,
                        CodecVariant::HueColorization => CodecVariant::Linear,
                    };
                    if let Err(e) = handle.set_codec(next) {
                        tracing::warn!("Codec switch failed: {}", e);
                    }
                }
            }
            if frame_limit.is_some_and(|n| frame.sequence + 1 >= n) {
                consumer_cancel.cancel();
            }
        }

        Ok::<_, anyhow::Error>(received)
    });

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, stopping");
            signal_cancel.cancel();
        }
    });

    let published = pipeline.run(cancel).await;
    // Dropping the pipeline closes the channel so the consumer drains and exits.
    drop(pipeline);
    let received = consumer.await??;

    let published = published?;
    tracing::info!("Published {} frames, decoded {}", published, received);
    Ok(())
}
