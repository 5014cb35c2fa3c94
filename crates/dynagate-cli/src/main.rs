//! dynagate — connection token issuer.
//!
//! The trusted out-of-band counterpart of the provisioning gateway: mints
//! encrypted connection tokens under the shared AES-256 key, generates keys,
//! and decodes tokens for operator debugging.

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;

use dynagate_core::{TokenCipher, TokenClaims, ENCRYPTION_KEY_ENV};

/// dynagate — mint and inspect encrypted connection tokens
#[derive(Parser)]
#[command(name = "dynagate", version, about = "Mint and inspect encrypted connection tokens")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a 32-character encryption key for DYNAGATE_ENCRYPTION_KEY
    Keygen,

    /// Mint a connection token under the key from the environment
    Token {
        /// Target protocol (ssh, rdp, vnc)
        #[arg(long)]
        protocol: String,

        /// Target host
        #[arg(long)]
        hostname: String,

        /// Target port (defaults to the protocol's port at the gateway)
        #[arg(long)]
        port: Option<u16>,

        /// Login username
        #[arg(long)]
        username: Option<String>,

        /// Login password
        #[arg(long)]
        password: Option<String>,
    },

    /// Decrypt a token and print its claims (password redacted)
    Inspect {
        /// The encrypted token
        token: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    use tracing_subscriber::EnvFilter;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    match cli.command {
        Command::Keygen => {
            println!("{}", generate_key());
        }

        Command::Token {
            protocol,
            hostname,
            port,
            username,
            password,
        } => {
            let cipher = load_cipher()?;
            let claims = TokenClaims {
                protocol,
                hostname,
                port: port.map(|p| p.to_string()),
                username,
                password,
                timestamp: unix_millis(),
            };
            println!("{}", cipher.encode(&claims));
        }

        Command::Inspect { token } => {
            let cipher = load_cipher()?;
            let mut claims = cipher
                .decode(&token)
                .context("token did not decrypt under the configured key")?;
            if claims.password.is_some() {
                claims.password = Some("<redacted>".to_string());
            }
            println!("{}", serde_json::to_string_pretty(&claims)?);
        }
    }

    Ok(())
}

fn load_cipher() -> anyhow::Result<TokenCipher> {
    debug!(env = ENCRYPTION_KEY_ENV, "loading encryption key");
    TokenCipher::from_env().with_context(|| format!("set {ENCRYPTION_KEY_ENV} to a 32-byte key"))
}

/// A fresh 32-character alphanumeric key (printable, env-var friendly).
fn generate_key() -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_millis() as u64
}
