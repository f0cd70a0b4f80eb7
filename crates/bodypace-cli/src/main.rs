//! bodypace: personal data client
//!
//! Local commands (no server needed):
//!   show-secrets                 - print the stored secret record
//!   generate-key                 - create a personal key
//!   encrypt <file> [<dir>]       - write <encrypted-name> + <encrypted-name>.keys
//!   decrypt <file> [<dir>]       - restore the original file from such a pair
//!   show-credentials / forget-credentials
//!
//! Server commands:
//!   login / logout / ping
//!   get-files, get-file, upload-file, remove-file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bodypace_client::{ClientError, DocumentClient};
use bodypace_core::config::{default_config_path, expand_tilde, BodypaceConfig};
use bodypace_crypto::PersonalKey;
use bodypace_secrets::{FileSecretStore, SecretRecord, SecretStore, SecretUpdate};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "bodypace",
    version,
    about = "Bodypace personal data client",
    long_about = "bodypace: encrypt documents locally and exchange them with a personal data server"
)]
struct Cli {
    /// Path to config.toml (default: $XDG_CONFIG_HOME/bodypace/config.toml)
    #[arg(long, short = 'c', env = "BODYPACE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// URL of the server to connect to (overrides config)
    #[arg(long, short = 's', env = "BODYPACE_SERVER", global = true)]
    server: Option<String>,

    /// File used to store secrets and credentials (overrides config)
    #[arg(long, short = 'S', env = "BODYPACE_SECRETS", global = true)]
    secrets: Option<PathBuf>,

    /// Log level filter, e.g. "debug" or "bodypace_client=trace"
    #[arg(long, env = "BODYPACE_LOG", global = true)]
    log: Option<String>,

    /// Log output format
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Display personal key, access token and credentials
    #[command(name = "show-secrets")]
    ShowSecrets,

    /// Generate a new personal key
    #[command(name = "generate-key")]
    GenerateKey {
        /// Save the generated key to the secrets file
        #[arg(long, short = 'k')]
        keep: bool,
        /// Do not display the generated key
        #[arg(long = "no-print", short = 'n')]
        no_print: bool,
    },

    /// Encrypt a file with the personal key
    Encrypt {
        /// File to encrypt
        file: PathBuf,
        /// Directory to write the encrypted pair into
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Decrypt a file (and its .keys sidecar) with the personal key
    Decrypt {
        /// Encrypted file; <file>.keys must sit next to it
        file: PathBuf,
        /// Directory to write the decrypted file into
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Display the last username and password sent to the server
    #[command(name = "show-credentials")]
    ShowCredentials,

    /// Remove the stored username and password
    #[command(name = "forget-credentials")]
    ForgetCredentials,

    /// Get an access token from the server
    ///
    /// Missing arguments fall back to the stored credentials; a password
    /// that is still missing is prompted for.
    Login {
        username: Option<String>,
        password: Option<String>,
    },

    /// Remove the stored access token
    Logout,

    /// Check that the server is reachable and the access token is valid
    Ping,

    /// List all documents on the server belonging to the logged in user
    #[command(name = "get-files")]
    GetFiles {
        /// Decrypt document names and keys
        #[arg(long, short = 'd')]
        decrypt: bool,
    },

    /// Download one document into the current directory
    #[command(name = "get-file")]
    GetFile {
        /// Id of the document to download
        id: i64,
        /// Decrypt the document before saving it
        #[arg(long, short = 'd')]
        decrypt: bool,
        /// Save under a different name
        #[arg(long, short = 'n')]
        name: Option<String>,
    },

    /// Upload one file to the server
    #[command(name = "upload-file")]
    UploadFile {
        /// File to upload
        file: PathBuf,
        /// Encrypt name and content before uploading
        #[arg(long, short = 'e')]
        encrypt: bool,
        /// Store the file on the server under a different name
        #[arg(long, short = 'n')]
        name: Option<String>,
    },

    /// Remove one document from the server
    #[command(name = "remove-file")]
    RemoveFile {
        /// Id of the document to remove
        id: i64,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (defaults + config file + overrides)
    Show,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn from_config(format: &str) -> Self {
        match format {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = load_config(&config_path, &cli)?;

    let format = cli
        .log_format
        .unwrap_or_else(|| LogFormat::from_config(&config.logging.format));
    init_logging(&config.logging.level, format);
    tracing::debug!(config = %config_path.display(), server = %config.server.url, "starting");

    let store = FileSecretStore::new(expand_tilde(&config.secrets.path));

    match cli.command {
        Commands::ShowSecrets => cmd_show_secrets(&store),
        Commands::GenerateKey { keep, no_print } => cmd_generate_key(&store, keep, no_print),
        Commands::Encrypt { file, dir } => cmd_encrypt(&store, &file, &dir).await,
        Commands::Decrypt { file, dir } => cmd_decrypt(&store, &file, &dir).await,
        Commands::ShowCredentials => cmd_show_credentials(&store),
        Commands::ForgetCredentials => cmd_forget_credentials(&store),
        Commands::Login { username, password } => {
            cmd_login(&config, &store, username, password).await
        }
        Commands::Logout => cmd_logout(&store),
        Commands::Ping => cmd_ping(&config, &store).await,
        Commands::GetFiles { decrypt } => cmd_get_files(&config, &store, decrypt).await,
        Commands::GetFile { id, decrypt, name } => {
            cmd_get_file(&config, &store, id, decrypt, name.as_deref()).await
        }
        Commands::UploadFile { file, encrypt, name } => {
            cmd_upload_file(&config, &store, &file, encrypt, name.as_deref()).await
        }
        Commands::RemoveFile { id } => cmd_remove_file(&config, &store, id).await,
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &config_path),
    }
}

// ── Config + logging ──────────────────────────────────────────────────────────

/// Load the config file (defaults when absent) and apply CLI/env overrides.
fn load_config(path: &Path, cli: &Cli) -> Result<BodypaceConfig> {
    let mut config = BodypaceConfig::load(&expand_tilde(path))
        .with_context(|| format!("loading config: {}", path.display()))?;

    if let Some(server) = &cli.server {
        config.server.url = server.clone();
    }
    if let Some(secrets) = &cli.secrets {
        config.secrets.path = secrets.clone();
    }
    if let Some(level) = &cli.log {
        config.logging.level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.logging.format = match format {
            LogFormat::Text => "text".into(),
            LogFormat::Json => "json".into(),
        };
    }
    Ok(config)
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output; logs go to stderr
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Secret helpers ────────────────────────────────────────────────────────────

fn load_secrets(store: &FileSecretStore) -> Result<SecretRecord> {
    store
        .load()
        .with_context(|| format!("reading secrets: {}", store.path().display()))
}

fn update_secrets(store: &FileSecretStore, update: SecretUpdate) -> Result<SecretRecord> {
    store
        .update(update)
        .with_context(|| format!("writing secrets: {}", store.path().display()))
}

/// The stored personal key, if any.
fn stored_personal_key(record: &SecretRecord) -> Result<Option<PersonalKey>> {
    record
        .personal_key
        .as_deref()
        .map(PersonalKey::from_base64)
        .transpose()
        .context("stored personal key is not a valid key")
}

fn required_personal_key(record: &SecretRecord) -> Result<PersonalKey> {
    Ok(stored_personal_key(record)?.ok_or(ClientError::MissingKey)?)
}

/// The personal key for a call that only uses it when `needed`. A stored key
/// is not parsed otherwise, so a damaged one does not block plaintext calls.
fn personal_key_if(record: &SecretRecord, needed: bool) -> Result<Option<PersonalKey>> {
    if needed {
        Ok(Some(required_personal_key(record)?))
    } else {
        Ok(None)
    }
}

fn required_access_token(record: &SecretRecord) -> Result<String> {
    Ok(record
        .access_token
        .clone()
        .ok_or(ClientError::MissingCredential)?)
}

/// Username/password for `login`: arguments win over stored credentials.
fn pick_credentials(
    username: Option<String>,
    password: Option<String>,
    record: &SecretRecord,
) -> (Option<String>, Option<String>) {
    (
        username.or_else(|| record.username.clone()),
        password.or_else(|| record.password.clone()),
    )
}

fn build_client(config: &BodypaceConfig) -> Result<DocumentClient> {
    DocumentClient::from_config(&config.server).context("building server client")
}

// ── Progress helpers ──────────────────────────────────────────────────────────

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Run a server call behind a spinner, clearing it whatever the outcome.
async fn with_spinner<T>(prefix: &str, msg: &str, call: impl Future<Output = T>) -> T {
    let pb = make_spinner(prefix);
    pb.set_message(msg.to_string());
    let out = call.await;
    pb.finish_and_clear();
    out
}

// ── Local commands ────────────────────────────────────────────────────────────

fn cmd_show_secrets(store: &FileSecretStore) -> Result<()> {
    let record = load_secrets(store)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn cmd_generate_key(store: &FileSecretStore, keep: bool, no_print: bool) -> Result<()> {
    let key = PersonalKey::generate();
    if !no_print {
        println!("generated key: {}", key.to_base64());
    }
    if keep {
        update_secrets(store, SecretUpdate::PersonalKey(Some(key.to_base64())))?;
        println!("key saved to {}", store.path().display());
    }
    Ok(())
}

async fn cmd_encrypt(store: &FileSecretStore, file: &Path, dir: &Path) -> Result<()> {
    let key = required_personal_key(&load_secrets(store)?)?;
    let artifact = bodypace_client::encrypt_file(file, dir, &key)
        .await
        .with_context(|| format!("encrypting {}", file.display()))?;

    println!("file encrypted, new files:");
    println!("{}", artifact.data_path.display());
    println!("{}", artifact.keys_path.display());
    Ok(())
}

async fn cmd_decrypt(store: &FileSecretStore, file: &Path, dir: &Path) -> Result<()> {
    let key = required_personal_key(&load_secrets(store)?)?;
    let output = bodypace_client::decrypt_file(file, dir, &key)
        .await
        .with_context(|| format!("decrypting {}", file.display()))?;

    println!("file decrypted, new file:");
    println!("{}", output.display());
    Ok(())
}

fn cmd_show_credentials(store: &FileSecretStore) -> Result<()> {
    let record = load_secrets(store)?;
    let credentials = serde_json::json!({
        "username": record.username,
        "password": record.password,
    });
    println!("{}", serde_json::to_string_pretty(&credentials)?);
    Ok(())
}

fn cmd_forget_credentials(store: &FileSecretStore) -> Result<()> {
    update_secrets(
        store,
        SecretUpdate::Credentials {
            username: None,
            password: None,
        },
    )?;
    println!("credentials forgotten");
    Ok(())
}

// ── Account commands ──────────────────────────────────────────────────────────

async fn cmd_login(
    config: &BodypaceConfig,
    store: &FileSecretStore,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let record = load_secrets(store)?;
    let (username, password) = pick_credentials(username, password, &record);
    let username = username.context("missing username")?;
    let password = match password {
        Some(p) => p,
        None => rpassword::prompt_password(format!("password for {username}: "))
            .context("reading password")?,
    };
    let secret = SecretString::from(password.clone());

    let client = build_client(config)?;
    let token = with_spinner("login", &username, client.login(&username, &secret)).await?;

    update_secrets(store, SecretUpdate::AccessToken(Some(token)))?;
    update_secrets(
        store,
        SecretUpdate::Credentials {
            username: Some(username),
            password: Some(password),
        },
    )?;
    println!("logged in, access token stored");
    Ok(())
}

fn cmd_logout(store: &FileSecretStore) -> Result<()> {
    update_secrets(store, SecretUpdate::AccessToken(None))?;
    println!("logged out");
    Ok(())
}

async fn cmd_ping(config: &BodypaceConfig, store: &FileSecretStore) -> Result<()> {
    let token = required_access_token(&load_secrets(store)?)?;
    let client = build_client(config)?;
    let sub = with_spinner("ping", client.base_url(), client.whoami(&token)).await?;
    println!("token is valid, user id on server: {sub}");
    Ok(())
}

// ── Document commands ─────────────────────────────────────────────────────────

async fn cmd_get_files(config: &BodypaceConfig, store: &FileSecretStore, decrypt: bool) -> Result<()> {
    let record = load_secrets(store)?;
    let token = required_access_token(&record)?;
    let key = personal_key_if(&record, decrypt)?;
    let client = build_client(config)?;

    let documents = with_spinner(
        "get-files",
        "listing documents",
        client.list_documents(key.as_ref(), &token, decrypt),
    )
    .await?;
    println!("{}", serde_json::to_string_pretty(&documents)?);
    Ok(())
}

async fn cmd_get_file(
    config: &BodypaceConfig,
    store: &FileSecretStore,
    id: i64,
    decrypt: bool,
    name: Option<&str>,
) -> Result<()> {
    let record = load_secrets(store)?;
    let token = required_access_token(&record)?;
    let key = personal_key_if(&record, decrypt)?;
    let client = build_client(config)?;

    let document = with_spinner(
        "get-file",
        &format!("document {id}"),
        client.get_document(key.as_ref(), &token, id, decrypt),
    )
    .await?;

    let written = bodypace_client::save_fetched(&document, name, Path::new("."))
        .await
        .with_context(|| format!("saving document {id}"))?;
    println!("file downloaded, new files:");
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

async fn cmd_upload_file(
    config: &BodypaceConfig,
    store: &FileSecretStore,
    file: &Path,
    encrypt: bool,
    name: Option<&str>,
) -> Result<()> {
    let record = load_secrets(store)?;
    let token = required_access_token(&record)?;
    let key = personal_key_if(&record, encrypt)?;

    let meta = tokio::fs::metadata(file)
        .await
        .with_context(|| format!("file not found: {}", file.display()))?;
    anyhow::ensure!(meta.is_file(), "not a file: {}", file.display());

    let name = match name {
        Some(n) => n.to_string(),
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .with_context(|| format!("no file name in {}", file.display()))?,
    };
    let content = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;

    let client = build_client(config)?;
    with_spinner(
        "upload-file",
        &name,
        client.upload_document(&token, key.as_ref(), content, &name, encrypt),
    )
    .await?;
    println!("file uploaded successfully");
    Ok(())
}

async fn cmd_remove_file(config: &BodypaceConfig, store: &FileSecretStore, id: i64) -> Result<()> {
    let token = required_access_token(&load_secrets(store)?)?;
    let client = build_client(config)?;
    with_spinner(
        "remove-file",
        &format!("document {id}"),
        client.delete_document(&token, id),
    )
    .await?;
    println!("file removed successfully");
    Ok(())
}

// ── `bodypace config show` ────────────────────────────────────────────────────

fn cmd_config_show(config: &BodypaceConfig, path: &Path) -> Result<()> {
    println!("# config file: {}", path.display());
    print!("{}", toml::to_string_pretty(config).context("serializing config")?);
    Ok(())
}
