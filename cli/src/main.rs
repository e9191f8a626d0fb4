//! chainscope CLI: inspect EVM contracts from the terminal.
//!
//! Usage:
//! ```bash
//! # Fetch verified metadata and sources
//! chainscope fetch-contract --address 0xA0b8...eB48 --network mainnet
//!
//! # Call a read-only function
//! chainscope call --address 0xA0b8...eB48 --function "balanceOf(address)" \
//!     --args '["0xd8dA...6045"]' --decimals 6
//!
//! # Convert units
//! chainscope convert --value 1000000000000000000 --from wei --to eth
//! ```
//!
//! Configuration comes from the environment (ETHERSCAN_API_KEY is
//! required). Results print as JSON on stdout; failures print one line on
//! stderr and exit non-zero.

use std::env;
use std::process;

use anyhow::{anyhow, Context, Result};
use serde_json::Value;

use chainscope_service::ContractService;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "version" | "--version" | "-V" => {
            println!("chainscope {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        command => run(command, &args[2..]).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(command: &str, args: &[String]) -> Result<()> {
    let service = ContractService::from_env()?;

    let output = match command {
        "fetch-contract" => {
            let address = require(args, "--address")?;
            service
                .fetch_contract(
                    &address,
                    flag(args, "--network").as_deref(),
                    parse_number(args, "--inline-limit")?,
                    has_flag(args, "--force-inline"),
                )
                .await?
        }
        "get-source-file" => {
            let address = require(args, "--address")?;
            let filename = require(args, "--filename")?;
            service
                .get_source_file(
                    &address,
                    &filename,
                    flag(args, "--network").as_deref(),
                    parse_number(args, "--offset")?,
                    parse_number(args, "--length")?,
                )
                .await?
        }
        "creation" => {
            let address = require(args, "--address")?;
            service
                .get_contract_creation(&address, flag(args, "--network").as_deref())
                .await?
        }
        "proxy" => {
            let address = require(args, "--address")?;
            service.detect_proxy(&address, flag(args, "--network").as_deref()).await?
        }
        "txs" => {
            let address = require(args, "--address")?;
            service
                .list_transactions(
                    &address,
                    flag(args, "--network").as_deref(),
                    flag(args, "--start-block").as_deref(),
                    flag(args, "--end-block").as_deref(),
                    parse_number(args, "--page")?,
                    parse_number(args, "--offset")?,
                    flag(args, "--sort").as_deref(),
                )
                .await?
        }
        "transfers" => {
            let address = require(args, "--address")?;
            service
                .list_token_transfers(
                    &address,
                    flag(args, "--network").as_deref(),
                    flag(args, "--token-type").as_deref(),
                    flag(args, "--start-block").as_deref(),
                    flag(args, "--end-block").as_deref(),
                    parse_number(args, "--page")?,
                    parse_number(args, "--offset")?,
                    flag(args, "--sort").as_deref(),
                )
                .await?
        }
        "logs" => {
            let address = require(args, "--address")?;
            let topics = vec![
                flag(args, "--topic0"),
                flag(args, "--topic1"),
                flag(args, "--topic2"),
                flag(args, "--topic3"),
            ];
            service
                .query_logs(
                    &address,
                    flag(args, "--network").as_deref(),
                    &topics,
                    flag(args, "--from-block").as_deref(),
                    flag(args, "--to-block").as_deref(),
                    parse_number(args, "--page")?,
                    parse_number(args, "--offset")?,
                )
                .await?
        }
        "storage" => {
            let address = require(args, "--address")?;
            let slot = require(args, "--slot")?;
            service
                .get_storage_at(
                    &address,
                    &slot,
                    flag(args, "--network").as_deref(),
                    flag(args, "--block-tag").as_deref(),
                )
                .await?
        }
        "call" => {
            let address = require(args, "--address")?;
            let call_args = parse_json_flag(args, "--args")?
                .map(|value| {
                    value
                        .as_array()
                        .cloned()
                        .ok_or_else(|| anyhow!("--args must be a JSON array"))
                })
                .transpose()?;
            let decimals = parse_json_flag(args, "--decimals")?;
            service
                .call_function(
                    &address,
                    flag(args, "--network").as_deref(),
                    flag(args, "--data").as_deref(),
                    flag(args, "--function").as_deref(),
                    call_args.as_deref(),
                    flag(args, "--block-tag").as_deref(),
                    decimals.as_ref(),
                )
                .await?
        }
        "encode" => {
            let function = require(args, "--function")?;
            let call_args = match parse_json_flag(args, "--args")? {
                Some(value) => value
                    .as_array()
                    .cloned()
                    .ok_or_else(|| anyhow!("--args must be a JSON array"))?,
                None => Vec::new(),
            };
            service.encode_function_data(&function, &call_args)?
        }
        "tx" => {
            let hash = require(args, "--hash")?;
            service.get_transaction(&hash, flag(args, "--network").as_deref()).await?
        }
        "block" => {
            let block = require(args, "--block")?;
            service
                .get_block(
                    &block,
                    flag(args, "--network").as_deref(),
                    has_flag(args, "--full"),
                    has_flag(args, "--hashes-only"),
                )
                .await?
        }
        "block-time" => {
            let block = require(args, "--block")?;
            service.get_block_time(&block, flag(args, "--network").as_deref()).await?
        }
        "keccak" => {
            let value = require(args, "--value")?;
            let input: Value = match parse_json_flag(args, "--json-value")? {
                Some(json_value) => json_value,
                None => Value::String(value),
            };
            service.keccak(&input, flag(args, "--type").as_deref())?
        }
        "convert" => {
            let value = require(args, "--value")?;
            let from = require(args, "--from")?;
            let to = require(args, "--to")?;
            let decimals = parse_json_flag(args, "--decimals")?;
            service.convert(&Value::String(value), &from, &to, decimals.as_ref())?
        }
        "chains" => service.list_chains(!has_flag(args, "--exclude-degraded")).await?,
        "resolve" => {
            let network = require(args, "--network")?;
            service.resolve_network(&network).await?
        }
        other => {
            print_usage();
            return Err(anyhow!("Unknown command: {other}"));
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_usage() {
    println!("chainscope {}", env!("CARGO_PKG_VERSION"));
    println!("Inspect verified EVM contracts via Etherscan-compatible explorers and JSON-RPC\n");
    println!("USAGE:");
    println!("    chainscope <COMMAND> [FLAGS]\n");
    println!("COMMANDS:");
    println!("    fetch-contract   Verified ABI, sources, compiler, proxy hints");
    println!("    get-source-file  One source file, optionally windowed (--offset/--length)");
    println!("    creation         Contract creation provenance (explorer, RPC fallback)");
    println!("    proxy            EIP-1967 proxy detection");
    println!("    txs              Normal transactions for an address");
    println!("    transfers        Token transfers (--token-type erc20|erc721|erc1155)");
    println!("    logs             Event logs (--topic0..--topic3)");
    println!("    storage          Read a storage slot (--slot)");
    println!("    call             Read-only call (--function + --args, or --data)");
    println!("    encode           Encode call data without sending");
    println!("    tx               Transaction + receipt by hash (--hash)");
    println!("    block            Block by number or tag (--block, --full, --hashes-only)");
    println!("    block-time       Block timestamp (raw, hex, ISO-8601)");
    println!("    keccak           Keccak-256 of a value (--value, --type text|hex|bytes)");
    println!("    convert          Unit conversion (--value --from --to, hex|dec|human|wei|gwei|eth)");
    println!("    chains           List known chains (--exclude-degraded)");
    println!("    resolve          Resolve a network label (--network)");
    println!("    version          Print version");
    println!("    help             Print this help\n");
    println!("ENVIRONMENT:");
    println!("    ETHERSCAN_API_KEY      required");
    println!("    ETHERSCAN_BASE_URL     explorer endpoint (default: api.etherscan.io/v2/api)");
    println!("    NETWORK / CHAIN_ID     default chain (default: mainnet)");
    println!("    RPC_URL, RPC_URL_<id>  optional JSON-RPC endpoints");
}

fn flag(args: &[String], name: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == name)?;
    args.get(pos + 1).cloned()
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

fn require(args: &[String], name: &str) -> Result<String> {
    flag(args, name).ok_or_else(|| anyhow!("{name} is required"))
}

fn parse_number<T: std::str::FromStr>(args: &[String], name: &str) -> Result<Option<T>> {
    match flag(args, name) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{name} must be a number, got '{raw}'")),
    }
}

fn parse_json_flag(args: &[String], name: &str) -> Result<Option<Value>> {
    match flag(args, name) {
        None => Ok(None),
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .with_context(|| format!("{name} must be valid JSON")),
    }
}
