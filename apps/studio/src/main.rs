use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    decode_data_url, dispatch_event, fetch_rendered, parse_script, EffectTarget, HttpWarpClient,
    RequestOrchestrator, SourceImage,
};
use shared::{
    domain::{ControlFamily, LandmarkMode},
    protocol::TransformPointsRequest,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, normalize_api_url, Settings};

#[derive(Parser, Debug)]
#[command(name = "warp-studio", about = "Effects and landmark warping client")]
struct Args {
    /// Base URL of the warp service.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    cloud_name: Option<String>,
    #[arg(long, global = true)]
    public_id: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe the warp service and print its info.
    Health,
    /// Place landmarks on an image and submit a warp.
    Warp {
        #[arg(long)]
        image: PathBuf,
        /// Source landmark click as `x,y`; repeat per landmark.
        #[arg(long = "source", value_parser = parse_point, required = true)]
        source: Vec<(f64, f64)>,
        /// Destination landmark click as `x,y`; repeat per landmark.
        #[arg(long = "dest", value_parser = parse_point, required = true)]
        dest: Vec<(f64, f64)>,
        /// Size the image is displayed at, `WxH`. Clicks are in this space.
        #[arg(long, value_parser = parse_size)]
        display: Option<(f64, f64)>,
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
        #[arg(long)]
        output: PathBuf,
    },
    /// Map points through the TPS defined by landmark pairs.
    Points {
        #[arg(long = "source", value_parser = parse_point, required = true)]
        source: Vec<(f64, f64)>,
        #[arg(long = "dest", value_parser = parse_point, required = true)]
        dest: Vec<(f64, f64)>,
        #[arg(long = "point", value_parser = parse_point, required = true)]
        points: Vec<(f64, f64)>,
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
    },
    /// Compose effect directives and print the delivery URL.
    Effects {
        #[arg(long = "preset")]
        presets: Vec<String>,
        /// Directive as `key=value`.
        #[arg(long = "set", value_parser = parse_assignment)]
        sets: Vec<(String, String)>,
        #[arg(long = "reset", value_parser = parse_family)]
        resets: Vec<ControlFamily>,
        /// Download the rendered image here.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replay a JSON array of session events.
    Replay {
        #[arg(long)]
        script: PathBuf,
    },
}

fn parse_point(raw: &str) -> Result<(f64, f64), String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{raw}'"))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("bad x in '{raw}': {e}"))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("bad y in '{raw}': {e}"))?;
    Ok((x, y))
}

fn parse_size(raw: &str) -> Result<(f64, f64), String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH but got '{raw}'"))?;
    let w = w.trim().parse::<f64>().map_err(|e| format!("bad width in '{raw}': {e}"))?;
    let h = h.trim().parse::<f64>().map_err(|e| format!("bad height in '{raw}': {e}"))?;
    if w <= 0.0 || h <= 0.0 {
        return Err(format!("display size must be positive: '{raw}'"));
    }
    Ok((w, h))
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value but got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn parse_family(raw: &str) -> Result<ControlFamily, String> {
    match raw.to_ascii_lowercase().as_str() {
        "rgb" => Ok(ControlFamily::Rgb),
        "hsv" => Ok(ControlFamily::Hsv),
        "advanced" => Ok(ControlFamily::Advanced),
        other => Err(format!("unknown control family '{other}' (rgb, hsv, advanced)")),
    }
}

fn resolve_settings(args: &Args) -> Result<Settings> {
    let mut settings = load_settings();
    if let Some(v) = &args.api_url {
        settings.api_url = v.clone();
    }
    if let Some(v) = &args.cloud_name {
        settings.cloud_name = v.clone();
    }
    if let Some(v) = &args.public_id {
        settings.public_id = v.clone();
    }
    settings.api_url = normalize_api_url(&settings.api_url)?;
    Ok(settings)
}

fn build_orchestrator(settings: &Settings) -> Result<Arc<RequestOrchestrator>> {
    let client = HttpWarpClient::new(&settings.api_url)
        .with_context(|| format!("invalid warp api url '{}'", settings.api_url))?;
    Ok(RequestOrchestrator::new(
        Arc::new(client),
        EffectTarget {
            cloud_name: settings.cloud_name.clone(),
            public_id: settings.public_id.clone(),
        },
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();
    let settings = resolve_settings(&args)?;
    info!(api_url = %settings.api_url, "warp-studio starting");

    match args.command {
        Command::Health => run_health(&settings).await,
        Command::Warp {
            image,
            source,
            dest,
            display,
            percent,
            output,
        } => run_warp(&settings, &image, &source, &dest, display, percent, &output).await,
        Command::Points {
            source,
            dest,
            points,
            percent,
        } => run_points(&settings, &source, &dest, &points, percent).await,
        Command::Effects {
            presets,
            sets,
            resets,
            output,
        } => run_effects(&settings, &presets, sets, &resets, output.as_deref()).await,
        Command::Replay { script } => run_replay(&settings, &script).await,
    }
}

async fn run_health(settings: &Settings) -> Result<()> {
    let orchestrator = build_orchestrator(settings)?;
    if let Some(banner) = orchestrator.check_health().await {
        bail!(banner);
    }
    let client = HttpWarpClient::new(&settings.api_url)?;
    match client.server_info().await {
        Ok(info) => println!(
            "{} {} (warptps {})",
            info.name,
            info.version,
            info.warptps_version.as_deref().unwrap_or("unknown")
        ),
        Err(err) => warn!("server info unavailable: {err}"),
    }
    println!("warp server healthy at {}", settings.api_url);
    Ok(())
}

async fn run_warp(
    settings: &Settings,
    image_path: &Path,
    source: &[(f64, f64)],
    dest: &[(f64, f64)],
    display: Option<(f64, f64)>,
    percent: u8,
    output: &Path,
) -> Result<()> {
    let orchestrator = build_orchestrator(settings)?;
    if let Some(banner) = orchestrator.check_health().await {
        eprintln!("warning: {banner}");
    }

    let image = SourceImage::from_path(image_path)?;
    let (displayed_width, displayed_height) = display.unwrap_or((
        f64::from(image.dimensions.width),
        f64::from(image.dimensions.height),
    ));
    orchestrator.load_image(image).await?;
    orchestrator.set_morph_percent(percent).await?;

    for (mode, clicks) in [(LandmarkMode::Source, source), (LandmarkMode::Dest, dest)] {
        if orchestrator.snapshot().await.mode != mode {
            orchestrator.toggle_mode().await?;
        }
        for &(x, y) in clicks {
            if orchestrator
                .record_click(x, y, displayed_width, displayed_height)
                .await?
                .is_none()
            {
                warn!(x, y, ?mode, "click ignored");
            }
        }
    }

    let result = match orchestrator.submit().await {
        Ok(result) => result,
        Err(err) => {
            let message = orchestrator
                .snapshot()
                .await
                .last_error
                .unwrap_or_else(|| err.to_string());
            bail!(message);
        }
    };

    let decoded = decode_data_url(&result.image)?;
    if let (Some(expected), Some(actual)) = (
        decoded.extension(),
        output.extension().and_then(|e| e.to_str()),
    ) {
        if !expected.eq_ignore_ascii_case(actual) {
            warn!(expected, actual, "output extension differs from returned image type");
        }
    }
    tokio::fs::write(output, &decoded.bytes)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "warped image written to {} (request {})",
        output.display(),
        result.request_id
    );
    Ok(())
}

async fn run_points(
    settings: &Settings,
    source: &[(f64, f64)],
    dest: &[(f64, f64)],
    points: &[(f64, f64)],
    percent: u8,
) -> Result<()> {
    let client = HttpWarpClient::new(&settings.api_url)?;
    let pairs = |list: &[(f64, f64)]| list.iter().map(|&(x, y)| [x, y]).collect::<Vec<_>>();
    let transformed = client
        .transform_points(&TransformPointsRequest {
            points: pairs(points),
            source_landmarks: pairs(source),
            dest_landmarks: pairs(dest),
            percent: f64::from(percent) / 100.0,
        })
        .await
        .map_err(|err| anyhow!("Error transforming points: {err}"))?;
    for ([x, y], (px, py)) in transformed.iter().zip(points) {
        println!("{px},{py} -> {x},{y}");
    }
    Ok(())
}

async fn run_effects(
    settings: &Settings,
    presets: &[String],
    sets: Vec<(String, String)>,
    resets: &[ControlFamily],
    output: Option<&Path>,
) -> Result<()> {
    let orchestrator = build_orchestrator(settings)?;
    orchestrator
        .edit_transforms(|transforms| -> Result<()> {
            for family in resets {
                transforms.reset_family(*family);
            }
            for preset in presets {
                transforms.apply_preset(preset)?;
            }
            for (key, value) in sets {
                match value.parse::<i32>() {
                    Ok(number) if transforms.set_slider(&key, number).is_ok() => {}
                    Ok(number) => transforms.upsert(key, number),
                    Err(_) => transforms.upsert(key, value),
                }
            }
            Ok(())
        })
        .await?;

    let request = orchestrator.effect_request().await;
    for effect in request.effect_strings() {
        println!("{effect}");
    }
    println!("{}", request.delivery_url()?);

    if let Some(output) = output {
        let bytes = fetch_rendered(&reqwest::Client::new(), &request).await?;
        tokio::fs::write(output, bytes)
            .await
            .with_context(|| format!("failed to write {}", output.display()))?;
        println!("rendered image written to {}", output.display());
    }
    Ok(())
}

async fn run_replay(settings: &Settings, script: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(script)
        .await
        .with_context(|| format!("failed to read script {}", script.display()))?;
    let events = parse_script(&raw)?;
    let base_dir = script.parent().unwrap_or_else(|| Path::new("."));

    let orchestrator = build_orchestrator(settings)?;
    if let Some(banner) = orchestrator.check_health().await {
        eprintln!("warning: {banner}");
    }
    for (index, event) in events.into_iter().enumerate() {
        let name = event.name();
        if let Err(err) = dispatch_event(&orchestrator, event, base_dir).await {
            warn!(index, event = name, "event failed: {err:#}");
        }
    }

    let snapshot = orchestrator.snapshot().await;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
