//! credseal Server
//!
//! HTTP front for the secure credential envelope protocol:
//!
//! 1. **Secure login**: accepts `{"payload", "signature"}` envelopes, proves
//!    they were sealed by the registered client, decrypts the credentials and
//!    delegates the password check to the configured identity provider.
//!
//! 2. **Public key distribution**: serves the server and client public keys
//!    as PEM. Private keys are never served.
//!
//! Key material is loaded once at startup. A missing or unreadable key aborts
//! the process before the listener binds.

mod api;
mod config;
mod response;
mod state;
mod supabase;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use clap::Parser;
use credseal_core::{
    IdentityProvider, KeyStore, Principal, PublicKeyDirectory, SecureLoginHandshake,
    StaticIdentityProvider, WireEncoding,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::{IdentityBackend, ServerConfig, DEFAULT_IDENTITY_TIMEOUT_SECS, DEFAULT_PORT};
use state::AppState;
use supabase::SupabaseIdentityProvider;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "credseal-server", version, about = "Secure credential envelope login server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "CREDSEAL_PORT")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "CREDSEAL_BIND")]
    bind: String,

    /// Directory holding {principal}_{private,public}_key.pem
    #[arg(long, default_value = "keys", env = "CREDSEAL_KEYS_DIR")]
    keys_dir: PathBuf,

    /// Text encoding of envelope fields (hex or base64)
    #[arg(long, default_value = "hex", env = "CREDSEAL_WIRE_ENCODING")]
    wire_encoding: WireEncoding,

    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,

    /// Supabase API key
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    supabase_key: Option<String>,

    /// JSON accounts file for the static identity provider
    #[arg(long, env = "CREDSEAL_ACCOUNTS_FILE")]
    accounts_file: Option<PathBuf>,

    /// Identity provider request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_IDENTITY_TIMEOUT_SECS, env = "CREDSEAL_IDENTITY_TIMEOUT_SECS")]
    identity_timeout_secs: u64,

    /// Offset from UTC, in minutes, for the `real_time` response field
    #[arg(long, default_value_t = 0, allow_hyphen_values = true, env = "CREDSEAL_LOCAL_UTC_OFFSET_MINUTES")]
    local_utc_offset_minutes: i32,

    /// Emit logs as JSON
    #[arg(long, env = "CREDSEAL_LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig, String> {
        Ok(ServerConfig {
            bind: self.bind,
            port: self.port,
            keys_dir: self.keys_dir,
            wire_encoding: self.wire_encoding,
            identity: IdentityBackend::resolve(
                self.supabase_url,
                self.supabase_key,
                self.accounts_file,
            )?,
            identity_timeout: Duration::from_secs(self.identity_timeout_secs),
            local_offset: config::offset_from_minutes(self.local_utc_offset_minutes)?,
        })
    }
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_json);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "credseal_server=info,credseal_core=info,tower_http=info".into()
    });

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(args: Args) -> Result<(), BoxError> {
    let config = args.into_config()?;

    let state = build_state(&config)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let app = api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = config.addr();
    tracing::info!(
        wire_encoding = %config.wire_encoding,
        identity = config.identity.name(),
        "credseal server starting on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Load keys and the identity backend. Any failure here is fatal.
fn build_state(config: &ServerConfig) -> Result<AppState, BoxError> {
    let store = KeyStore::new(&config.keys_dir);

    let server_private = store.load_private(Principal::Server)?;
    let server_public = store.load_public(Principal::Server)?;
    let client_public = store.load_public(Principal::Client)?;

    if server_private.public_key() != server_public {
        return Err(format!(
            "Server key files in {} do not form a pair",
            config.keys_dir.display()
        )
        .into());
    }

    tracing::info!(dir = %config.keys_dir.display(), "Loaded server and client keys");

    let identity: Arc<dyn IdentityProvider> = match &config.identity {
        IdentityBackend::Supabase { url, api_key } => Arc::new(SupabaseIdentityProvider::new(
            url.as_str(),
            api_key.as_str(),
            config.identity_timeout,
        )?),
        IdentityBackend::Static { accounts_file } => {
            Arc::new(StaticIdentityProvider::from_accounts_file(accounts_file)?)
        }
    };

    let public_keys = PublicKeyDirectory::new(&server_public, &client_public)?;
    let handshake = SecureLoginHandshake::new(
        server_private,
        client_public,
        config.wire_encoding,
        identity,
    );

    Ok(AppState::new(handshake, public_keys, config.local_offset))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
