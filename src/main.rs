use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tang::{
    generate_exchange_key, generate_signing_key, make_thumbprint, reverse_handshake, serve,
    write_key, JwkSet, KeySet, Result, ServerConfig, ThpHashAlg,
};

#[derive(Debug, Parser)]
#[command(name = "tang", about = "Network-bound disk encryption key server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate a signing and an exchange key under a directory
    Create {
        dir: PathBuf,
        /// File name for the signing key (defaults to its thumbprint)
        sig: Option<String>,
        /// File name for the exchange key (defaults to its thumbprint)
        exc: Option<String>,
    },
    /// Print the default advertisement for the given keys
    Adv {
        /// Write the advertisement to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(required = true)]
        keys: Vec<PathBuf>,
    },
    /// Print key thumbprints
    Thp {
        /// Hash algorithm
        #[arg(long, default_value = "sha256", value_parser = ["sha1", "sha256"])]
        alg: String,
        key: PathBuf,
    },
    /// Run the tang HTTP server
    Server {
        /// Http port
        #[arg(long, default_value_t = 80)]
        port: u16,
        /// Private key file or directory, may be repeated
        #[arg(long = "key", required = true)]
        keys: Vec<PathBuf>,
    },
    /// Unlock a remote client via the reverse handshake
    Unlock {
        address: String,
        #[arg(required = true)]
        keys: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Create { dir, sig, exc } => create(&dir, sig.as_deref(), exc.as_deref()),
        Commands::Adv { output, keys } => advertisement(output.as_deref(), &keys),
        Commands::Thp { alg, key } => thumbprints(&alg, &key),
        Commands::Server { port, keys } => {
            let keys = KeySet::load_paths(&keys)?;
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            serve(ServerConfig { addr, keys }).await
        }
        Commands::Unlock { address, keys } => {
            let keys = KeySet::load_paths(&keys)?;
            reverse_handshake(&address, &keys).await
        }
    }
}

fn create(dir: &Path, sig: Option<&str>, exc: Option<&str>) -> Result<()> {
    let signing = generate_signing_key()?;
    write_key(dir, sig, &signing)?;
    let exchange = generate_exchange_key()?;
    write_key(dir, exc, &exchange)?;
    Ok(())
}

fn advertisement(output: Option<&Path>, keys: &[PathBuf]) -> Result<()> {
    let set = KeySet::load_paths(keys)?;
    match output {
        Some(path) => fs::write(path, set.default_advertisement())?,
        None => println!("{}", String::from_utf8_lossy(set.default_advertisement())),
    }
    Ok(())
}

fn thumbprints(alg: &str, key: &Path) -> Result<()> {
    let alg = ThpHashAlg::from_name(alg)?;
    let data = fs::read(key)?;
    for jwk in JwkSet::parse(&data)?.keys() {
        println!("{}", make_thumbprint(jwk, alg)?);
    }
    Ok(())
}
