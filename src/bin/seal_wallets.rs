//! Seal wallet keys into the encrypted vault
//! Usage: cargo run --bin seal_wallets [--keys-file PATH] [--vault-path PATH] [--rpc-api-key KEY]
//!        cargo run --bin seal_wallets --generate-key

use multibuy_operator::vault::{self, Vault, VaultSecrets};
use multibuy_operator::wallets;
use std::path::PathBuf;

struct Args {
    keys_file: Option<PathBuf>,
    vault_path: PathBuf,
    rpc_api_key: Option<String>,
    generate_key: bool,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        keys_file: None,
        vault_path: PathBuf::from(vault::vault_path()),
        rpc_api_key: std::env::var("MULTIBUY_RPC__API_KEY").ok(),
        generate_key: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--keys-file" | "--vault-path" | "--rpc-api-key" => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("ERROR: {} requires a value", args[i]);
                    std::process::exit(1);
                };
                match args[i].as_str() {
                    "--keys-file" => parsed.keys_file = Some(PathBuf::from(value)),
                    "--vault-path" => parsed.vault_path = PathBuf::from(value),
                    _ => parsed.rpc_api_key = Some(value.clone()),
                }
                i += 2;
            }
            "--generate-key" => {
                parsed.generate_key = true;
                i += 1;
            }
            "--help" | "-h" => {
                println!("Usage: seal_wallets [--keys-file PATH] [--vault-path PATH] [--rpc-api-key KEY]");
                println!("       seal_wallets --generate-key");
                println!("  --keys-file PATH    One wallet key per line (default: MULTIBUY_WALLETS__PRIVATE_KEYS)");
                println!("  --vault-path PATH   Vault file to write (default: {})", vault::DEFAULT_VAULT_PATH);
                println!("  --rpc-api-key KEY   RPC API key to store alongside the wallets");
                println!("  --generate-key      Print a new vault key and exit");
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                std::process::exit(1);
            }
        }
    }

    parsed
}

fn read_keys(keys_file: Option<&PathBuf>) -> anyhow::Result<Vec<String>> {
    let raw = match keys_file {
        Some(path) => std::fs::read_to_string(path)?,
        None => std::env::var("MULTIBUY_WALLETS__PRIVATE_KEYS")
            .map_err(|_| anyhow::anyhow!("No --keys-file given and MULTIBUY_WALLETS__PRIVATE_KEYS is unset"))?
            .replace(',', "\n"),
    };

    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let args = parse_args();

    if args.generate_key {
        println!("{}", Vault::generate_key()?);
        return Ok(());
    }

    println!("=== Multibuy Wallet Vault ===");
    println!("Vault file: {}", args.vault_path.display());
    println!();

    let secrets = VaultSecrets {
        wallet_private_keys: read_keys(args.keys_file.as_ref())?,
        rpc_api_key: args.rpc_api_key,
    };

    // Reject anything the operator would refuse at startup
    let loaded = match wallets::load_wallets(&secrets) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let vault = Vault::from_env()?;
    if let Some(parent) = args.vault_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    vault.save_secrets(&secrets, &args.vault_path)?;

    println!("Sealed {} wallets:", loaded.len());
    for wallet in &loaded {
        println!("  - {}", wallet.address());
    }
    if secrets.rpc_api_key.is_some() {
        println!("  RPC API key stored");
    }

    Ok(())
}
