//! Sigil CLI - provision keys, sign and verify gateway requests.
//!
//! # Usage
//!
//! ```text
//! sigil keygen --out-dir /etc/sigil
//! SIGNATURE_SECRET=s3cr3t sigil sign --method POST --path /api/v1/workflows/submit --body-file job.json
//! SIGNATURE_SECRET=s3cr3t sigil verify --method POST --path /api/v1/workflows/submit \
//!     --body-file job.json --signature <hex> --timestamp <unix>
//! ```
//!
//! Key material and the algorithm come from the same environment variables the
//! gateway reads (see [`sigil_auth::config`]); `--algorithm` overrides
//! `SIGNATURE_ALGORITHM`.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LOG_LEVEL` | `warn` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use sigil_auth::keys::{DEFAULT_KEY_BITS, generate_keypair};
use sigil_auth::{
    KeyMaterial, QueryParams, ReplayGuard, SignatureAlgorithm, SignatureConfig, SignatureEnvelope,
    SigningRequest, sign, verify,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const PRIVATE_KEY_FILE: &str = "private.pem";
const PUBLIC_KEY_FILE: &str = "public.pem";

#[derive(Parser)]
#[clap(name = "sigil", version, about = "Sign and verify Sigil gateway requests")]
struct Cli {
    /// Log level used when `RUST_LOG` is unset
    #[clap(long, env = "LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate an RSA keypair as PKCS#8 / SubjectPublicKeyInfo PEM files
    Keygen(KeygenArgs),
    /// Sign a request and print the transport headers
    Sign(SignArgs),
    /// Verify a request signature
    Verify(VerifyArgs),
}

#[derive(Args)]
struct KeygenArgs {
    /// RSA modulus size in bits (at least 2048)
    #[clap(long, default_value_t = DEFAULT_KEY_BITS)]
    bits: usize,

    /// Directory receiving `private.pem` and `public.pem`
    #[clap(long, default_value = ".")]
    out_dir: PathBuf,

    /// Overwrite existing key files
    #[clap(long)]
    force: bool,
}

#[derive(Args)]
struct RequestArgs {
    /// Signing algorithm; defaults to `SIGNATURE_ALGORITHM`
    #[clap(long)]
    algorithm: Option<SignatureAlgorithm>,

    /// HTTP method
    #[clap(long, default_value = "GET")]
    method: String,

    /// Request path without host or query string
    #[clap(long)]
    path: String,

    /// Query parameter as `key=value`; repeatable
    #[clap(long = "query", value_parser = parse_query_pair)]
    query: Vec<(String, String)>,

    /// File holding the exact request body bytes
    #[clap(long)]
    body_file: Option<PathBuf>,
}

#[derive(Args)]
struct SignArgs {
    #[clap(flatten)]
    request: RequestArgs,

    /// Unix timestamp to sign; defaults to now
    #[clap(long)]
    timestamp: Option<i64>,

    /// Nonce to sign (RSA-PSS); defaults to a random one
    #[clap(long)]
    nonce: Option<String>,

    /// Print the envelope as JSON instead of headers
    #[clap(long)]
    json: bool,
}

#[derive(Args)]
struct VerifyArgs {
    #[clap(flatten)]
    request: RequestArgs,

    /// Value of `X-Signature`
    #[clap(long)]
    signature: String,

    /// Value of `X-Timestamp`
    #[clap(long)]
    timestamp: String,

    /// Value of `X-Nonce`
    #[clap(long)]
    nonce: Option<String>,

    /// Check the signature only, not the timestamp window
    #[clap(long)]
    ignore_timestamp: bool,
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    Ok(())
}

fn parse_query_pair(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw.split_once('=').unwrap_or((raw, ""));
    if key.is_empty() {
        return Err(format!("query parameter {raw:?} has an empty key"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

fn load_config(algorithm: Option<SignatureAlgorithm>) -> Result<SignatureConfig> {
    let mut config = SignatureConfig::from_env().context("failed to read signature configuration")?;
    if let Some(algorithm) = algorithm {
        config.algorithm = algorithm;
    }
    Ok(config)
}

fn build_request(args: &RequestArgs, algorithm: SignatureAlgorithm) -> Result<SigningRequest> {
    let query: QueryParams = args.query.iter().cloned().collect();
    let mut request =
        SigningRequest::new(algorithm, &args.method, args.path.clone()).with_query(query);

    if let Some(path) = &args.body_file {
        let body = fs::read(path)
            .with_context(|| format!("failed to read body file {}", path.display()))?;
        request = request.with_body(body);
    }

    Ok(request)
}

fn write_key_file(path: &Path, contents: &str, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("failed to restrict permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

fn run_keygen(args: &KeygenArgs) -> Result<()> {
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;

    let (private_pem, public_pem) =
        generate_keypair(args.bits).context("failed to generate RSA keypair")?;

    let private_path = args.out_dir.join(PRIVATE_KEY_FILE);
    let public_path = args.out_dir.join(PUBLIC_KEY_FILE);
    write_key_file(&private_path, &private_pem, args.force)?;
    restrict_permissions(&private_path)?;
    write_key_file(&public_path, &public_pem, args.force)?;

    info!(bits = args.bits, dir = %args.out_dir.display(), "wrote RSA keypair");
    println!("{}", private_path.display());
    println!("{}", public_path.display());
    Ok(())
}

fn run_sign(args: &SignArgs) -> Result<()> {
    let config = load_config(args.request.algorithm)?;
    let key = KeyMaterial::from_config(&config).context("failed to load signing key")?;

    let mut request = build_request(&args.request, config.algorithm)?;
    request = match args.timestamp {
        Some(ts) => request.with_timestamp(ts),
        None => request.with_current_timestamp(),
    };
    if let Some(nonce) = &args.nonce {
        request = request.with_nonce(nonce.clone());
    }

    let envelope = sign(&request, &key).context("failed to sign request")?;
    debug!(algorithm = %config.algorithm, "signed request");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else {
        println!("X-Signature: {}", envelope.signature);
        println!("X-Timestamp: {}", envelope.timestamp);
        if let Some(nonce) = &envelope.nonce {
            println!("X-Nonce: {nonce}");
        }
    }
    Ok(())
}

/// Verify `args` against `config`, ignoring `config.enabled`.
///
/// The window is skipped for `--ignore-timestamp` or a configured tolerance of 0.
fn verify_with_config(args: &VerifyArgs, config: &SignatureConfig) -> Result<()> {
    let request = build_request(&args.request, config.algorithm)?;
    let envelope = SignatureEnvelope {
        signature: args.signature.clone(),
        timestamp: args.timestamp.clone(),
        nonce: args.nonce.clone(),
    };
    let key = KeyMaterial::from_config(config).context("failed to load verification key")?;

    let verdict = verify(&request, &envelope, &key).and_then(|()| {
        if args.ignore_timestamp || config.timestamp_tolerance_secs == 0 {
            return Ok(());
        }
        ReplayGuard::new(config.timestamp_tolerance_secs).check(envelope.parsed_timestamp()?)
    });

    match verdict {
        Ok(()) => Ok(()),
        Err(e) => bail!("{}: {e}", e.kind()),
    }
}

fn run_verify(args: &VerifyArgs) -> Result<()> {
    let config = load_config(args.request.algorithm)?;
    if !config.enabled {
        warn!("SIGNATURE_ENABLED is false; verifying anyway");
    }
    verify_with_config(args, &config)?;
    println!("ok");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match &cli.command {
        Command::Keygen(args) => run_keygen(args),
        Command::Sign(args) => run_sign(args),
        Command::Verify(args) => run_verify(args),
    }
}
