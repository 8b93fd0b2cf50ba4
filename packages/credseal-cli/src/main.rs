//! credseal CLI
//!
//! Client-side tooling for the credential envelope protocol:
//!
//! - `keygen`    generate principal key pairs into a keys directory
//! - `seal`      print the wire envelope for a set of credentials
//! - `login`     seal credentials and post them to a server
//! - `fetch-key` download a public key from a server

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use credseal_core::crypto::MIN_KEY_BITS;
use credseal_core::keystore::KeyRole;
use credseal_core::{
    KeyStore, LoginCredentials, Principal, SecureEnvelope, WireEncoding, WireEnvelope,
};

/// Secure credential envelope client
#[derive(Parser, Debug)]
#[command(name = "credseal", version, about = "Secure credential envelope client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate RSA key pairs
    Keygen {
        /// Output directory
        #[arg(long, default_value = "keys", env = "CREDSEAL_KEYS_DIR")]
        dir: PathBuf,

        /// Only generate this principal's pair (server or client)
        #[arg(long)]
        principal: Option<Principal>,

        /// Modulus size in bits
        #[arg(long, default_value_t = MIN_KEY_BITS)]
        bits: usize,

        /// Overwrite existing key files
        #[arg(long)]
        force: bool,
    },

    /// Seal credentials and print the envelope JSON
    Seal(SealArgs),

    /// Seal credentials and log in against a server
    Login {
        #[command(flatten)]
        seal: SealArgs,

        /// Server base URL
        #[arg(long, default_value = "http://localhost:5001", env = "CREDSEAL_URL")]
        url: String,
    },

    /// Download a public key from a server
    FetchKey {
        /// Server base URL
        #[arg(long, default_value = "http://localhost:5001", env = "CREDSEAL_URL")]
        url: String,

        /// Whose key to fetch
        #[arg(long, default_value = "server")]
        principal: Principal,

        /// Write the PEM here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct SealArgs {
    /// Account email
    #[arg(long)]
    email: String,

    /// Account password
    #[arg(long, env = "CREDSEAL_PASSWORD", hide_env_values = true)]
    password: String,

    /// Directory holding server_public_key.pem and client_private_key.pem
    #[arg(long, default_value = "keys", env = "CREDSEAL_KEYS_DIR")]
    keys_dir: PathBuf,

    /// Envelope field encoding (hex or base64)
    #[arg(long, default_value = "hex", env = "CREDSEAL_WIRE_ENCODING")]
    encoding: WireEncoding,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    match Cli::parse().command {
        Commands::Keygen {
            dir,
            principal,
            bits,
            force,
        } => {
            let principals = match principal {
                Some(p) => vec![p],
                None => Principal::ALL.to_vec(),
            };
            for path in keygen(&dir, &principals, bits, force)? {
                println!("wrote {}", path.display());
            }
        }
        Commands::Seal(args) => {
            let wire = seal(&args)?;
            println!("{}", serde_json::to_string_pretty(&wire)?);
        }
        Commands::Login { seal: args, url } => login(&args, &url).await?,
        Commands::FetchKey {
            url,
            principal,
            out,
        } => {
            let pem = fetch_key(&url, principal).await?;
            match out {
                Some(path) => {
                    std::fs::write(&path, &pem)
                        .wrap_err_with(|| format!("writing {}", path.display()))?;
                    println!("wrote {}", path.display());
                }
                None => print!("{}", pem),
            }
        }
    }

    Ok(())
}

/// Generate and persist key pairs, refusing to clobber existing files
/// unless `force` is set. Returns the written paths.
fn keygen(dir: &Path, principals: &[Principal], bits: usize, force: bool) -> Result<Vec<PathBuf>> {
    let store = KeyStore::new(dir);

    if !force {
        if let Some(existing) = principals.iter().find(|p| store.has_any(**p)) {
            bail!(
                "{} keys already exist in {} (use --force to overwrite)",
                existing,
                dir.display()
            );
        }
    }

    let mut written = Vec::new();
    for &principal in principals {
        store.generate_with_bits(principal, bits)?;
        written.push(store.path_for(principal, KeyRole::Private));
        written.push(store.path_for(principal, KeyRole::Public));
    }
    Ok(written)
}

/// Build the wire envelope from the server's public key and our private key.
fn seal(args: &SealArgs) -> Result<WireEnvelope> {
    let store = KeyStore::new(&args.keys_dir);
    let server_public = store
        .load_public(Principal::Server)
        .wrap_err("loading server public key")?;
    let client_private = store
        .load_private(Principal::Client)
        .wrap_err("loading client private key")?;

    let credentials = LoginCredentials::new(args.email.as_str(), args.password.as_str())?;
    let envelope = SecureEnvelope::seal(&credentials, &server_public, &client_private)?;
    Ok(envelope.encode(args.encoding))
}

async fn login(args: &SealArgs, url: &str) -> Result<()> {
    let wire = seal(args)?;
    let endpoint = format!("{}/auth/secure/login", url.trim_end_matches('/'));

    let response = reqwest::Client::new()
        .post(&endpoint)
        .json(&wire)
        .send()
        .await
        .wrap_err_with(|| format!("POST {}", endpoint))?;

    let status = response.status();
    let body = response.text().await?;
    let rendered = serde_json::from_str::<serde_json::Value>(&body)
        .and_then(|json| serde_json::to_string_pretty(&json))
        .unwrap_or(body);

    println!("{}", rendered);
    if !status.is_success() {
        bail!("login failed with {}", status);
    }
    Ok(())
}

async fn fetch_key(url: &str, principal: Principal) -> Result<String> {
    let endpoint = format!("{}/keys/{}", url.trim_end_matches('/'), principal);

    let response = reqwest::get(&endpoint)
        .await
        .wrap_err_with(|| format!("GET {}", endpoint))?;
    if !response.status().is_success() {
        bail!("GET {} returned {}", endpoint, response.status());
    }

    let pem = response.text().await?;
    // Refuse to save anything that is not a usable public key
    credseal_core::PublicKey::from_pem(&pem)?;
    Ok(pem)
}
