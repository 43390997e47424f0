use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use video_portal::config::PortalConfig;
use video_portal::fetch::FetchProgress;
use video_portal::session::{ViewSession, ViewState};
use video_portal::storage::progress::{ProgressFormatter, ProgressStats};
use video_portal::upload::UploadRequest;
use video_portal::{VideoId, VideoManager, VideoRecord, VideoSettings};

#[derive(Parser)]
#[command(name = "video-portal")]
#[command(about = "Upload, share and watch videos", long_about = None)]
pub struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Prefix for share links
    #[arg(long, global = true)]
    origin: Option<String>,

    /// Acting user
    #[arg(long, global = true)]
    owner: Option<String>,

    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn load_config(&self) -> Result<PortalConfig> {
        let mut config = match &self.config {
            Some(path) => PortalConfig::from_file(path)?,
            None => PortalConfig::default(),
        };
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(origin) = &self.origin {
            config.origin = origin.clone();
        }
        if let Some(owner) = &self.owner {
            config.owner_id = owner.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a video
    Upload {
        file: PathBuf,

        /// Title to show instead of the file name
        #[arg(short, long)]
        title: Option<String>,

        /// Do not let viewers download the video
        #[arg(long)]
        no_download: bool,
    },

    /// List your videos
    List,

    /// Open a video the way a viewer would and optionally save the playback bytes
    Watch {
        id: String,

        #[arg(short, long)]
        password: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Download a video that allows downloads
    Download {
        id: String,

        #[arg(short, long)]
        password: Option<String>,

        /// Target file; defaults to "<title>.mp4" in the current directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Change title, password, sharing or download permission
    Settings {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, conflicts_with = "clear_password")]
        password: Option<String>,

        #[arg(long)]
        clear_password: bool,

        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        #[arg(long)]
        disable: bool,

        #[arg(long)]
        downloadable: Option<bool>,
    },

    /// Delete a video and its stored objects
    Delete { id: String },

    /// Print the share link of a video
    Link { id: String },

    /// Check that every stored part of a video exists
    Check { id: String },
}

pub async fn execute_command(manager: &VideoManager, config: &PortalConfig, command: Commands) -> Result<()> {
    match command {
        Commands::Upload { file, title, no_download } => {
            let request = UploadRequest {
                owner_id: config.owner_id.clone(),
                downloadable: !no_download,
                title,
            };
            let video = manager
                .upload_path(&file, request, &print_upload_progress)
                .await
                .with_context(|| format!("uploading {}", file.display()))?;

            println!("Uploaded \"{}\"", video.title);
            println!("id: {}", video.id);
            println!("link: {}", manager.share_link(&video.id));
        }
        Commands::List => {
            let videos = manager.list(&config.owner_id).await?;
            if videos.is_empty() {
                println!("No videos yet");
            }
            for video in videos {
                print_video(manager, &video);
            }
        }
        Commands::Watch { id, password, output } => {
            let session = open_session(manager, &id, password.as_deref()).await?;
            let blob = session.playback().await.context("playback handle was released")?;
            if let ViewState::Ready { video, url } = session.state() {
                println!("Ready: \"{}\" ({} bytes) at {}", video.title, blob.len(), url);
            }
            if let Some(output) = output {
                tokio::fs::write(&output, &blob.data).await?;
                println!("Saved to {}", output.display());
            }
        }
        Commands::Download { id, password, output } => {
            let session = open_session(manager, &id, password.as_deref()).await?;
            let download = session.download().await?;
            let output = match output {
                Some(output) => output,
                None => Path::new(&download.file_name)
                    .file_name()
                    .map(PathBuf::from)
                    .with_context(|| format!("cannot save {:?} as a file", download.file_name))?,
            };
            tokio::fs::write(&output, &download.blob.data).await?;
            println!("Downloaded {} bytes to {}", download.blob.len(), output.display());
        }
        Commands::Settings {
            id,
            title,
            password,
            clear_password,
            enable,
            disable,
            downloadable,
        } => {
            let id: VideoId = id.parse()?;
            let settings = VideoSettings {
                title,
                access_password: if clear_password { Some(None) } else { password.map(Some) },
                is_enabled: match (enable, disable) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
                downloadable,
            };
            let video = manager.update_settings(&id, &settings).await?;
            print_video(manager, &video);
        }
        Commands::Delete { id } => {
            let id: VideoId = id.parse()?;
            manager.delete(&id).await?;
            println!("Deleted {}", id);
        }
        Commands::Link { id } => {
            let id: VideoId = id.parse()?;
            let video = manager.get(&id).await?;
            println!("{}", manager.share_link(&video.id));
        }
        Commands::Check { id } => {
            let id: VideoId = id.parse()?;
            let report = manager.check(&id).await?;
            println!("Title: {}", report.title);
            println!("Chunked: {}", report.is_chunked);
            if let Some(count) = report.chunk_count {
                println!("Chunk count: {} (paths listed: {})", count, report.listed_paths);
            }
            for missing in &report.missing {
                println!("  MISSING part {}: {}", missing.index + 1, missing.key);
            }
            println!("Summary: {} found, {} missing", report.found, report.missing.len());
            if !report.is_healthy() {
                bail!("video {} is damaged", id);
            }
        }
    }

    Ok(())
}

async fn open_session(manager: &VideoManager, id: &str, password: Option<&str>) -> Result<ViewSession> {
    let mut session = manager.watch(id);
    session.open_with_progress(&print_fetch_progress).await?;

    if let ViewState::NeedsPassword { .. } = session.state() {
        let Some(password) = password else {
            bail!("this video needs a password (use --password)");
        };
        session.submit_password_with_progress(password, &print_fetch_progress).await?;
    }

    match session.state() {
        ViewState::Ready { .. } => Ok(session),
        ViewState::NeedsPassword { error: Some(error), .. } => bail!("{}", error),
        ViewState::Failed { message, .. } => bail!("{}", message),
        other => bail!("unexpected state {}", other.name()),
    }
}

fn print_video(manager: &VideoManager, video: &VideoRecord) {
    let mut flags = vec![if video.is_enabled { "enabled" } else { "disabled" }];
    if video.required_password().is_some() {
        flags.push("password");
    }
    if video.downloadable {
        flags.push("downloadable");
    }
    if video.is_chunked {
        flags.push("chunked");
    }

    println!(
        "{}  {}  [{}]  {}  {}",
        video.id,
        video.title,
        flags.join(", "),
        video.created_at.format("%Y-%m-%d %H:%M"),
        manager.share_link(&video.id)
    );
}

fn print_upload_progress(stats: &ProgressStats) {
    eprintln!(
        "{}  {}  {}",
        stats.format_progress(),
        stats.format_speed(),
        stats.format_time_remaining()
    );
}

fn print_fetch_progress(progress: &FetchProgress) {
    match progress.parts {
        Some((done, total)) => eprintln!("loading {:.0}% (part {}/{})", progress.percent, done, total),
        None => eprintln!("loading {:.0}%", progress.percent),
    }
}
