use atom::LinkFinder;
use atom::http::{ReqwestClient, Uri};
use clap::{Parser, Subcommand};
use eyre::Context;
use gdata::youtube::{StandardFeed, VideoEntry, VideoFeed, YouTubeService, user_uploads_uri};
use gdata::{GDataFeed, GDataService};
use std::io::IsTerminal;
use tokio_stream::StreamExt;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Prints the entries of Google Data feeds.
#[derive(Parser, Debug)]
#[command(name = "gdata-cli", version)]
struct Args {
    /// Value of the Authorization header, for example `GoogleLogin auth=...`
    #[arg(long, env = "GDATA_AUTH_HEADER", hide_env_values = true)]
    auth_header: Option<String>,

    /// YouTube developer key
    #[arg(long, env = "YOUTUBE_DEVELOPER_KEY", hide_env_values = true)]
    developer_key: Option<String>,

    /// YouTube client id
    #[arg(long, env = "YOUTUBE_CLIENT_ID")]
    client_id: Option<String>,

    /// Stop after this many entries
    #[arg(short = 'n', long, default_value_t = 25)]
    limit: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// A YouTube standard feed, such as top_rated or most_viewed
    Standard { feed: StandardFeed },

    /// The videos a YouTube user has uploaded
    Uploads { username: String },

    /// Any Calendar or YouTube feed
    Feed { uri: String },
}

impl Args {
    fn youtube(&self) -> YouTubeService {
        let mut youtube = YouTubeService::new(ReqwestClient::new());
        if let Some(key) = &self.developer_key {
            youtube = youtube.with_developer_key(key);
        }
        if let Some(client_id) = &self.client_id {
            youtube = youtube.with_client_id(client_id);
        }
        if let Some(auth) = &self.auth_header {
            youtube = youtube.with_auth_header(auth);
        }
        youtube
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(std::io::stdout().is_terminal())
        .init();

    let args = Args::parse();
    match &args.command {
        Command::Standard { feed } => {
            print_videos(&args.youtube(), &feed.uri(), args.limit).await?;
        }
        Command::Uploads { username } => {
            print_videos(&args.youtube(), &user_uploads_uri(username), args.limit).await?;
        }
        Command::Feed { uri } => {
            let host = Uri::parse(uri)?
                .host
                .ok_or_else(|| eyre::eyre!("feed URI {uri} has no host"))?;
            let mut service = GDataService::for_server(host);
            service.set_auth_header(args.auth_header.clone());
            if let Some(key) = &args.developer_key {
                service.set_header("X-GData-Key", format!("key={key}"));
            }

            let entries = service.feed_entries::<GDataFeed>(uri).take(args.limit);
            let mut entries = std::pin::pin!(entries);
            while let Some(entry) = entries.next().await {
                let entry = entry.context("fetch entry")?;
                let title = entry.title.as_ref().and_then(|t| t.text.as_deref());
                let updated = entry.updated.as_ref().and_then(|u| u.text.as_deref());
                println!("{:<30} {}", updated.unwrap_or("-"), title.unwrap_or("(untitled)"));
                if let Some(href) = entry.self_link().and_then(|l| l.href.as_deref()) {
                    println!("{:<30} {href}", "");
                }
            }
        }
    }

    Ok(())
}

async fn print_videos(youtube: &YouTubeService, uri: &str, limit: usize) -> eyre::Result<()> {
    let videos = youtube.feed_entries::<VideoFeed>(uri).take(limit);
    let mut videos = std::pin::pin!(videos);
    while let Some(video) = videos.next().await {
        let video = video.context("fetch video")?;
        print_video(&video);
    }
    Ok(())
}

fn print_video(video: &VideoEntry) {
    let title = video.title.as_ref().and_then(|t| t.text.as_deref());
    let views = video
        .statistics
        .as_ref()
        .and_then(|s| s.view_count.as_deref());
    println!(
        "{:<12} {:>10} {}",
        video.video_id().unwrap_or("-"),
        views.unwrap_or("N/A"),
        title.unwrap_or("(untitled)")
    );
}
