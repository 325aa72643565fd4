use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::*;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod record;

use config::{Overrides, RecorderConfig};

#[derive(Parser)]
#[command(name = "skycap")]
#[command(about = "Record a webcam or Tello drone feed to mp4", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML file with recorder settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory recordings are written to
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Upper bound on the quit-key wait per frame
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,

    /// No preview window; the quit key is read from the keyboard directly
    #[arg(long, global = true)]
    headless: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a webcam
    Webcam {
        /// Index of the camera to record
        #[arg(long)]
        channel: Option<u32>,
    },

    /// Record a Tello drone's video feed, rebooting the drone afterwards
    Tello,

    ListCameras {
        #[arg(long)]
        json: bool,
    },

    /// Print geometry and frame count of a recording
    Probe {
        path: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Record a generated test pattern
    Synthetic {
        /// Stop after this many frames instead of waiting for the quit key
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        frames: Option<u64>,

        #[arg(long, default_value = "640")]
        width: u32,

        #[arg(long, default_value = "480")]
        height: u32,

        #[arg(long, default_value = "30")]
        fps: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .init();

    let mut config = RecorderConfig::load_or_default(cli.config.as_deref())?;
    config.apply(Overrides {
        output_dir: cli.output_dir,
        poll_interval_ms: cli.poll_interval_ms,
        headless: cli.headless,
    });
    config.validate()?;

    ffmpeg::init()?;

    match cli.command {
        Commands::Webcam { channel } => {
            let channel = channel.unwrap_or(config.webcam.channel);
            let summary = record::webcam(&config, channel)?;
            record::report(&summary);
        }

        Commands::Tello => {
            let summary = record::tello(&config)?;
            record::report(&summary);
        }

        Commands::ListCameras { json } => {
            cmd_list_cameras(json)?;
        }

        Commands::Probe { path, json } => {
            cmd_probe(&path, json)?;
        }

        Commands::Synthetic {
            frames,
            width,
            height,
            fps,
        } => {
            let summary = record::synthetic(
                &config,
                record::SyntheticArgs {
                    frames,
                    width,
                    height,
                    fps,
                },
            )?;
            record::report(&summary);
        }
    }

    Ok(())
}

fn cmd_list_cameras(json_output: bool) -> Result<()> {
    let cameras = skycap_camera::list_cameras()?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&cameras)?);
        return Ok(());
    }

    if cameras.is_empty() {
        warn!("No cameras found");
    }

    for camera in cameras {
        println!("{camera}");
    }

    Ok(())
}

fn cmd_probe(path: &std::path::Path, json_output: bool) -> Result<()> {
    let info = skycap_enc_ffmpeg::probe::probe_video_file(path)?;

    if json_output {
        println!(
            "{}",
            serde_json::json!({
                "width": info.width,
                "height": info.height,
                "fps": info.fps,
                "frame_count": info.frame_count,
                "codec_tag": info.codec_tag.map(|tag| tag.to_string()),
            })
        );
    } else {
        println!(
            "{}: {}x{}, {} frames, {} fps, codec tag {}",
            path.display(),
            info.width,
            info.height,
            info.frame_count,
            info.fps.map_or("?".to_string(), |fps| fps.to_string()),
            info.codec_tag.map_or("?".to_string(), |tag| tag.to_string()),
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn synthetic_frame_count_must_be_positive() {
        let err = Cli::try_parse_from(["skycap", "synthetic", "--frames", "0"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let cli = Cli::try_parse_from(["skycap", "synthetic", "--frames", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Synthetic {
                frames: Some(5),
                width: 640,
                height: 480,
                fps: 30
            }
        ));
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli =
            Cli::try_parse_from(["skycap", "webcam", "--channel", "2", "--headless"]).unwrap();

        assert!(cli.headless);
        assert_eq!(cli.log_level, "info");
        assert!(matches!(cli.command, Commands::Webcam { channel: Some(2) }));
    }
}
