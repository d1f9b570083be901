//! License key service.
//!
//! Issues encrypted, Schnorr-signed license tokens over HTTP, stores them in
//! SQLite and sweeps expired ones every month. The same binary can generate
//! identity keys and issue or verify single tokens from the command line.
//!
//! Usage:
//!   licensekey-server --port 3000
//!   licensekey-server keygen
//!   licensekey-server verify --product-id <ID> --license-key <TOKEN>

use std::{fs, path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use licensekey_crypto::{EnvelopeCipher, KdfParams};
use licensekey_engine::{
    parse_key_bytes, IdentityKeyStore, KeyStoreConfig, LicenseAttributes, LicenseIssuer,
    LicenseVerifier, PublicKey, KEY_SIZE,
};
use licensekey_server::{build_router, spawn_sweep, AppState};
use licensekey_store::LicenseStore;
use serde_json::json;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "licensekey-server")]
#[command(about = "License key issuance and verification service")]
struct Args {
    /// Directory holding the identity keys
    #[arg(long, env = "ID_KEYS_FOLDER", default_value = "id-keys", global = true)]
    keys_dir: PathBuf,

    /// Private key file name inside the keys directory
    #[arg(long, env = "ID_PRIVATE_KEY_FILE", default_value = "private.key", global = true)]
    private_key_file: String,

    /// Public key file name inside the keys directory
    #[arg(long, env = "ID_PUBLIC_KEY_FILE", default_value = "public.key", global = true)]
    public_key_file: String,

    /// HTTP port
    #[arg(short, long, env = "PORT", default_value = "3000", global = true)]
    port: u16,

    /// SQLite database for issued keys
    #[arg(long, env = "LICENSE_DB", default_value = "licenses.db", global = true)]
    database: PathBuf,

    /// Verify every issued token and log the outcome
    #[arg(long, global = true)]
    self_check: bool,

    /// Argon2 memory cost in KiB
    #[arg(long, default_value = "19456", global = true)]
    kdf_memory: u32,

    /// Argon2 iterations
    #[arg(long, default_value = "2", global = true)]
    kdf_time: u32,

    /// Argon2 parallelism
    #[arg(long, default_value = "1", global = true)]
    kdf_parallelism: u32,

    /// Maximum concurrent issue/verify operations in the HTTP service
    #[arg(long, default_value_t = licensekey_server::DEFAULT_CRYPTO_CONCURRENCY, global = true)]
    max_crypto_tasks: usize,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (the default)
    Serve,
    /// Generate identity keys, refusing to overwrite existing ones
    Keygen,
    /// Issue a single token and print it
    Issue {
        #[arg(long)]
        product_id: String,
        #[arg(long)]
        holder_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "Trial")]
        license_type: String,
        /// ISO date, RFC 3339 instant or milliseconds since the epoch
        #[arg(long)]
        expiry: String,
    },
    /// Verify a token with the public key and print the report
    Verify {
        #[arg(long)]
        product_id: String,
        #[arg(long)]
        license_key: String,
    },
}

impl Args {
    fn key_store(&self) -> IdentityKeyStore {
        IdentityKeyStore::new(KeyStoreConfig {
            dir: self.keys_dir.clone(),
            private_key_file: self.private_key_file.clone(),
            public_key_file: self.public_key_file.clone(),
        })
    }

    /// Fails on KDF costs Argon2 would refuse.
    fn cipher(&self) -> Result<EnvelopeCipher> {
        let params = KdfParams {
            memory_cost: self.kdf_memory,
            time_cost: self.kdf_time,
            parallelism: self.kdf_parallelism,
        };
        params.validate().context("Invalid KDF parameters")?;
        Ok(EnvelopeCipher::new(params))
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    match &args.command {
        None | Some(Command::Serve) => serve(&args).await.map(|()| ExitCode::SUCCESS),
        Some(Command::Keygen) => keygen(&args).map(|()| ExitCode::SUCCESS),
        Some(Command::Issue {
            product_id,
            holder_name,
            email,
            license_type,
            expiry,
        }) => {
            let attrs = parse_attributes(product_id, holder_name, email, license_type, expiry)?;
            issue(&args, attrs).await.map(|()| ExitCode::SUCCESS)
        }
        Some(Command::Verify {
            product_id,
            license_key,
        }) => verify(&args, product_id, license_key).await,
    }
}

async fn serve(args: &Args) -> Result<()> {
    info!("License key service starting...");
    let cipher = args.cipher()?;

    let keypair = args
        .key_store()
        .load()
        .context("Failed to load identity keys")?;
    let public_key = keypair.public_key();
    info!("Issuer public key: {}", public_key.to_hex());

    let store = LicenseStore::open(&args.database)
        .with_context(|| format!("Failed to open license database {:?}", args.database))?;
    spawn_sweep(store.clone());

    let issuer = LicenseIssuer::new(Arc::new(keypair), cipher);
    if args.max_crypto_tasks == 0 {
        return Err(anyhow!("--max-crypto-tasks must be at least 1"));
    }
    let mut state = AppState::new(issuer, store).with_crypto_limit(args.max_crypto_tasks);
    state.self_check = args.self_check;
    let app = build_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port))
        .await
        .context("Failed to bind HTTP port")?;

    println!("\n========================================");
    println!("  License Key Service Running");
    println!("========================================");
    println!("  Public key: {}", public_key.to_hex());
    println!("  HTTP Port:  {}", args.port);
    println!("  Database:   {}", args.database.display());
    println!("========================================\n");

    axum::serve(listener, app).await.context("HTTP server failed")
}

fn keygen(args: &Args) -> Result<()> {
    let store = args.key_store();
    let keypair = store
        .bootstrap()
        .context("Failed to generate identity keys")?;
    info!("Identity keys written to {:?}", store.config().dir);
    println!("{}", keypair.public_key().to_hex());
    Ok(())
}

fn parse_attributes(
    product_id: &str,
    holder_name: &str,
    email: &str,
    license_type: &str,
    expiry: &str,
) -> Result<LicenseAttributes> {
    let expiry_date = match expiry.parse::<i64>() {
        Ok(millis) => json!(millis),
        Err(_) => json!(expiry),
    };
    let attrs: LicenseAttributes = serde_json::from_value(json!({
        "productId": product_id,
        "holderName": holder_name,
        "email": email,
        "licenseType": license_type,
        "expiryDate": expiry_date,
    }))
    .context("Invalid license attributes")?;
    attrs.validate()?;
    Ok(attrs)
}

async fn issue(args: &Args, attrs: LicenseAttributes) -> Result<()> {
    let cipher = args.cipher()?;
    let keypair = args
        .key_store()
        .load()
        .context("Failed to load identity keys")?;
    let issuer = LicenseIssuer::new(Arc::new(keypair), cipher);

    let token = if args.self_check {
        let verifier = issuer.verifier();
        issuer.issue_with_self_check(&attrs, &verifier).await?.0
    } else {
        issuer.issue(&attrs).await?
    };
    println!("{token}");
    Ok(())
}

/// Reads only the public key, so tokens can be checked on hosts that never
/// held the private key.
fn read_public_key(store: &IdentityKeyStore) -> Result<PublicKey> {
    let path = store.public_key_path();
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read public key {:?}", path))?;
    let bytes: [u8; KEY_SIZE] = parse_key_bytes(&text)?
        .try_into()
        .map_err(|bytes: Vec<u8>| anyhow!("public key has {} bytes, expected {KEY_SIZE}", bytes.len()))?;
    Ok(PublicKey::from_bytes(bytes))
}

async fn verify(args: &Args, product_id: &str, license_key: &str) -> Result<ExitCode> {
    let public_key = read_public_key(&args.key_store())?;
    let verifier = LicenseVerifier::new(public_key, args.cipher()?);

    let report = verifier.verify(product_id, license_key).await?.report();
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if report.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
