use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rollcall_core::{AttendanceRecord, Identity};
use rollcall_export::ExportFormat;
use rollcall_hw::{Camera, Microphone};
use rollcall_store::{DocumentStore, SqliteStore, ATTENDANCE, FACE_ENCODINGS};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall attendance CLI")]
struct Cli {
    /// Database file or sqlite:// URL (default: $ROLLCALL_DATABASE_URL or the data directory)
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List attendance records
    List,
    /// List registered attendees
    Identities,
    /// Write attendance to a file
    Export {
        /// Output format: excel, pdf, or word
        #[arg(short, long, value_parser = parse_format)]
        format: ExportFormat,
        /// Output path (default: attendance.xlsx / .pdf / .docx)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Delete every attendance record
    Clear,
    /// List cameras and microphones
    Devices,
    /// Capture one camera frame and save it as an image
    Capture {
        /// V4L2 device path
        #[arg(short, long, default_value = "/dev/video0")]
        device: String,
        /// Frames discarded before the capture
        #[arg(short, long, default_value_t = 4)]
        warmup: usize,
        /// Output image path
        #[arg(short, long, default_value = "capture.png")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => {
            let store = open_store(cli.database.as_deref())?;
            let records = store.find_all(ATTENDANCE)?;
            if records.is_empty() {
                println!("No attendance recorded");
            }
            for doc in records {
                let record: AttendanceRecord = serde_json::from_value(doc.into())?;
                println!("{:<24} {}", record.display_label(), record.display_status());
            }
        }
        Commands::Identities => {
            let store = open_store(cli.database.as_deref())?;
            let identities = store.find_all(FACE_ENCODINGS)?;
            if identities.is_empty() {
                println!("No attendees registered");
            }
            for doc in identities {
                let identity: Identity = serde_json::from_value(doc.into())?;
                println!(
                    "{:<24} roll {:<10} ({}-d encoding)",
                    identity.name,
                    identity.roll_number,
                    identity.encoding.len()
                );
            }
        }
        Commands::Export { format, out } => {
            let store = open_store(cli.database.as_deref())?;
            let records = store.find_all(ATTENDANCE)?;
            let bytes = rollcall_export::render(format, &records)?;
            let out = out.unwrap_or_else(|| PathBuf::from(format.file_name()));
            std::fs::write(&out, &bytes).with_context(|| format!("writing {}", out.display()))?;
            println!("Exported {} records to {}", records.len(), out.display());
        }
        Commands::Clear => {
            let store = open_store(cli.database.as_deref())?;
            let removed = store.delete_all(ATTENDANCE)?;
            println!("Removed {removed} attendance records");
        }
        Commands::Devices => {
            let cameras = Camera::list_devices();
            println!("Cameras:");
            if cameras.is_empty() {
                println!("  (none)");
            }
            for cam in cameras {
                println!("  {:<14} {} [{}] {}", cam.path, cam.name, cam.driver, cam.bus);
            }

            println!("Microphones:");
            match Microphone::list_input_devices() {
                Ok(mics) if mics.is_empty() => println!("  (none)"),
                Ok(mics) => mics.iter().for_each(|name| println!("  {name}")),
                Err(e) => println!("  unavailable: {e}"),
            }
        }
        Commands::Capture {
            device,
            warmup,
            out,
        } => {
            let frame = Camera::with_device(&device, |camera| camera.capture_frame(warmup))?;
            println!(
                "Captured frame {} ({}x{}, dark: {})",
                frame.sequence, frame.width, frame.height, frame.is_dark
            );
            frame
                .into_image()?
                .save(&out)
                .with_context(|| format!("saving {}", out.display()))?;
            println!("Saved {}", out.display());
        }
    }

    Ok(())
}

fn open_store(database: Option<&str>) -> Result<SqliteStore> {
    let path = database
        .map(str::to_string)
        .or_else(|| std::env::var("ROLLCALL_DATABASE_URL").ok())
        .map(|url| rollcall_store::path_from_url(&url))
        .unwrap_or_else(rollcall_core::default_database_path);
    SqliteStore::open(&path).with_context(|| format!("opening database {}", path.display()))
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    s.parse().map_err(|e: rollcall_export::ExportError| e.to_string())
}
