use clap::{Parser, Subcommand};
use std::path::PathBuf;
use telecare_core::analysis::assemble_prompt_body;
use telecare_core::config::pem_from_env_value;
use telecare_core::flags::{FileFlagStore, FlagKey, FlagStore};
use telecare_core::{IdentityClaim, SessionSigner};
use telecare_files::{extract_batch, UploadLimits, UploadedFile};
use telecare_keys::SessionKeyPair;

#[derive(Parser)]
#[command(name = "telecare")]
#[command(about = "Telecare operations CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a session signing key pair
    Keygen {
        /// Directory to write the PEM files into
        dir: PathBuf,
    },
    /// Issue a signed session token
    IssueToken {
        /// Private key: PEM, path to a PEM file, or base64-encoded PEM
        #[arg(long)]
        key: String,
        /// Subject (user id)
        #[arg(long)]
        sub: String,
        /// Display name
        #[arg(long)]
        name: String,
        #[arg(long)]
        doctor: bool,
        #[arg(long)]
        admin: bool,
        /// Lifetime of the token in hours
        #[arg(long, default_value_t = 8)]
        ttl_hours: i64,
    },
    /// Inspect or change feature flags in a YAML flag file
    Flags {
        #[command(subcommand)]
        command: FlagsCommand,
    },
    /// Extract text from documents and print the assembled prompt body
    Extract {
        /// PDF, DOCX or plain-text files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Subcommand)]
enum FlagsCommand {
    /// Print every flag
    Show {
        #[arg(long)]
        file: PathBuf,
    },
    /// Set one flag
    Set {
        #[arg(long)]
        file: PathBuf,
        /// maintenance, registration, appointments or notifications
        key: String,
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
        /// Appointments only: default length in minutes
        #[arg(long)]
        default_duration: Option<u32>,
        /// Appointments only: daily cap
        #[arg(long)]
        max_daily: Option<u32>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Keygen { dir }) => {
            std::fs::create_dir_all(&dir)?;
            let keys = SessionKeyPair::generate()?;
            let (private, public) = keys.write_to_dir(&dir)?;
            println!("Wrote private key: {}", private.display());
            println!("Wrote public key: {}", public.display());
        }
        Some(Commands::IssueToken {
            key,
            sub,
            name,
            doctor,
            admin,
            ttl_hours,
        }) => {
            let pem = pem_from_env_value("--key", Some(key))?.ok_or("--key is empty")?;
            let signer = SessionSigner::from_pkcs8_pem(&pem)?;
            let identity = IdentityClaim {
                subject: sub,
                name,
                is_doctor: doctor,
                is_admin: admin,
            };
            let expires_at = chrono::Utc::now() + chrono::Duration::hours(ttl_hours);
            println!("{}", signer.issue(&identity, expires_at)?);
        }
        Some(Commands::Flags {
            command: FlagsCommand::Show { file },
        }) => {
            let flags = FileFlagStore::new(file).snapshot().await?;
            print!("{}", serde_yaml::to_string(&flags.to_rows())?);
        }
        Some(Commands::Flags {
            command:
                FlagsCommand::Set {
                    file,
                    key,
                    enabled,
                    default_duration,
                    max_daily,
                },
        }) => {
            let store = FileFlagStore::new(file);
            let key: FlagKey = key.parse()?;

            let value = if key == FlagKey::Appointments {
                let current = store.snapshot().await?.appointments;
                serde_json::json!({
                    "enabled": enabled,
                    "default_duration": default_duration.unwrap_or(current.default_duration),
                    "max_daily": max_daily.unwrap_or(current.max_daily),
                })
            } else {
                if default_duration.is_some() || max_daily.is_some() {
                    eprintln!("--default-duration and --max-daily only apply to appointments");
                }
                serde_json::json!({ "enabled": enabled })
            };

            let flags = store.update(key, value).await?;
            println!("{key}: {}", flags.value_of(key));
        }
        Some(Commands::Extract { files }) => {
            let mut uploads = Vec::with_capacity(files.len());
            for path in &files {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                uploads.push(UploadedFile::new(name, None, std::fs::read(path)?));
            }

            let documents = extract_batch(uploads, &UploadLimits::default())?;
            for document in &documents {
                eprintln!(
                    "{}: {} chars{}, sha256 {}",
                    document.name(),
                    document.text().chars().count(),
                    if document.truncated() { " (truncated)" } else { "" },
                    document.sha256()
                );
            }
            println!("{}", assemble_prompt_body(&documents));
        }
        None => {
            println!("Use 'telecare --help' for commands");
        }
    }

    Ok(())
}
