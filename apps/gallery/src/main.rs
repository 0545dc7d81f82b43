use std::{io::Write, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    build_store, config::load_settings, BackendKind, GalleryController, GalleryEvent,
    Severity, StoreBackend, SyncOutcome,
};
use shared::{
    domain::ImageId,
    protocol::{parse_tags, ImageFile, ImageUpload},
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Upload, browse and delete tagged images")]
struct Cli {
    /// Settings file; `gallery.toml` is read when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Talk to the image service at this URL instead of the fixture.
    #[arg(long, conflicts_with = "fixture")]
    api_url: Option<String>,
    /// Use the in-memory fixture regardless of settings.
    #[arg(long)]
    fixture: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List images, optionally only those carrying a tag.
    List {
        #[arg(long)]
        tag: Option<String>,
    },
    /// Print the distinct tags across all images.
    Tags,
    /// Upload an image file.
    Upload {
        path: PathBuf,
        #[arg(long)]
        title: String,
        /// Comma-separated tags.
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Delete an image by identifier.
    Delete { id: String },
    /// Read commands from stdin against a single gallery session.
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
        settings.backend = BackendKind::Remote;
    }
    if cli.fixture {
        settings.backend = BackendKind::Fixture;
    }
    settings.validate()?;
    info!(backend = ?settings.backend, api_url = %settings.api_url, "gallery: starting");

    let controller = GalleryController::new(build_store(StoreBackend::from_settings(&settings))?);
    let printer = spawn_notification_printer(&controller);

    controller.refresh().await;
    let result = run(&controller, cli.command).await;

    drop(controller);
    let _ = printer.await;
    result
}

fn spawn_notification_printer(
    controller: &Arc<GalleryController>,
) -> tokio::task::JoinHandle<()> {
    let events = controller.subscribe_events();
    tokio::spawn(async move {
        print_notifications(events, std::io::stderr()).await;
    })
}

/// Writes notifications until the controller goes away. Lagging behind only
/// loses the skipped events.
async fn print_notifications<W: Write>(
    mut events: broadcast::Receiver<GalleryEvent>,
    mut out: W,
) -> W {
    loop {
        match events.recv().await {
            Ok(GalleryEvent::Notification(notification)) => {
                let marker = match notification.severity {
                    Severity::Info => "ok",
                    Severity::Error => "error",
                };
                let _ = writeln!(
                    out,
                    "[{marker}] {}: {}",
                    notification.title, notification.description
                );
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "gallery: notification printer lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
    out
}

async fn run(controller: &GalleryController, command: Command) -> Result<()> {
    match command {
        Command::List { tag } => print_images(controller, tag.as_deref()).await,
        Command::Tags => print_tags(controller).await,
        Command::Upload { path, title, tags } => {
            let upload = read_upload(path, title, &tags).await?;
            expect_applied(controller.submit_upload(upload).await, "upload")?;
            print_images(controller, None).await;
        }
        Command::Delete { id } => {
            expect_applied(controller.request_delete(&ImageId(id)).await, "delete")?;
        }
        Command::Shell => shell(controller).await?,
    }
    Ok(())
}

fn expect_applied(outcome: SyncOutcome, operation: &str) -> Result<()> {
    match outcome {
        SyncOutcome::Failed => bail!("{operation} failed"),
        SyncOutcome::Applied | SyncOutcome::Discarded => Ok(()),
    }
}

async fn read_upload(path: PathBuf, title: String, tags: &str) -> Result<ImageUpload> {
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(ImageUpload {
        title,
        tags: parse_tags(tags),
        image: ImageFile {
            mime_type: mime_guess::from_path(&path).first_raw().map(str::to_string),
            filename,
            bytes,
        },
    })
}

async fn print_images(controller: &GalleryController, tag: Option<&str>) {
    let snapshot = controller.snapshot().await;
    if snapshot.loading {
        println!("(still loading)");
    }
    let images = controller.visible_records(tag).await;
    if images.is_empty() {
        println!("no images");
    }
    for image in images {
        println!(
            "{}\t{}\t[{}]\t{}\t{}",
            image.id,
            image.title,
            image.tags.join(", "),
            image.created_at.to_rfc3339(),
            image.image_url
        );
    }
}

async fn print_tags(controller: &GalleryController) {
    for tag in controller.derived_tags().await {
        println!("{tag}");
    }
}

const SHELL_HELP: &str =
    "commands: list [tag] | tags | upload <path> [tags=a,b] <title...> | delete <id> | refresh | quit";

#[derive(Debug, PartialEq, Eq)]
struct ShellUpload {
    path: PathBuf,
    title: String,
    tags: String,
}

/// Parses the words after `upload`. The `tags=` word is optional and may
/// appear anywhere after the path.
fn parse_shell_upload<'a>(mut words: impl Iterator<Item = &'a str>) -> Option<ShellUpload> {
    let path = PathBuf::from(words.next()?);
    let mut tags = String::new();
    let mut title = Vec::new();
    for word in words {
        match word.strip_prefix("tags=") {
            Some(value) => tags = value.to_string(),
            None => title.push(word),
        }
    }
    Some(ShellUpload {
        path,
        title: title.join(" "),
        tags,
    })
}

async fn shell(controller: &GalleryController) -> Result<()> {
    println!("{SHELL_HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        match words.next() {
            None => continue,
            Some("list") => print_images(controller, words.next()).await,
            Some("tags") => print_tags(controller).await,
            Some("refresh") => {
                controller.refresh().await;
            }
            Some("delete") => match words.next() {
                Some(id) => {
                    controller.request_delete(&ImageId::from(id)).await;
                }
                None => println!("usage: delete <id>"),
            },
            Some("upload") => {
                let Some(ShellUpload { path, title, tags }) = parse_shell_upload(words) else {
                    println!("usage: upload <path> [tags=a,b] <title...>");
                    continue;
                };
                match read_upload(path, title, &tags).await {
                    Ok(upload) => {
                        controller.submit_upload(upload).await;
                    }
                    Err(err) => println!("{err:#}"),
                }
            }
            Some("quit") | Some("exit") => break,
            Some(_) => println!("{SHELL_HELP}"),
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
