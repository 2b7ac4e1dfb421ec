use std::io::{Read, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use spendlens_core::hex_util::{decode_hex, strip_0x};
use spendlens_core::text::{parse, unparse};
use spendlens_core::{decode, encode};
use spendlens_eval::run_program;
use spendlens_inspect::{
    inspect_bundle, load_block_input, load_coin_input, load_mempool_input, DEFAULT_MAX_COST,
};

#[derive(Debug, Parser)]
#[command(
    name = "spendlens",
    about = "Inspect spend bundles and CLVM puzzle behavior"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, default_value_t = false)]
    pretty: bool,

    #[arg(long, default_value = "-")]
    output: String,

    #[arg(long, default_value_t = DEFAULT_MAX_COST)]
    max_cost: u64,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Inspect a mempool item or spend bundle document
    Mempool {
        #[arg(long)]
        blob_json: String,
    },
    /// Inspect block spend data from a coin spend list
    Block {
        #[arg(long)]
        spends_json: String,
    },
    /// Inspect a single coin spend payload
    Coin {
        #[arg(long)]
        coin_spend_json: String,
    },
    /// Decode serialized CLVM hex to readable text
    Decode { input: String },
    /// Encode readable CLVM text to hex
    Encode { input: String },
    /// Run a CLVM program against an environment
    Run {
        #[arg(long)]
        program: String,
        #[arg(long, default_value = "()")]
        env: String,
        #[arg(long, default_value_t = false)]
        cost: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Mempool { blob_json } => {
            let (source, bundle, notes) = load_mempool_input(&read_input(blob_json)?)?;
            emit_report(&cli, source, bundle, notes)
        }
        Command::Block { spends_json } => {
            let (source, bundle, notes) = load_block_input(&read_input(spends_json)?)?;
            emit_report(&cli, source, bundle, notes)
        }
        Command::Coin { coin_spend_json } => {
            let (source, bundle, notes) = load_coin_input(&read_input(coin_spend_json)?)?;
            emit_report(&cli, source, bundle, notes)
        }
        Command::Decode { input } => {
            let bytes = decode_hex(input).context("failed to decode hex input")?;
            let value = decode(&bytes)?;
            write_output(&cli.output, &unparse(&value))
        }
        Command::Encode { input } => {
            let value = parse(input)?;
            write_output(&cli.output, &format!("0x{}", hex::encode(encode(&value))))
        }
        Command::Run { program, env, cost } => {
            let program = parse_program_input(program)?;
            let env = parse_program_input(env)?;
            let (result, used) = run_program(&program, &env, cli.max_cost)?;
            let mut lines = unparse(&result);
            if *cost {
                lines = format!("cost = {used}\n{lines}");
            }
            write_output(&cli.output, &lines)
        }
    }
}

fn emit_report(
    cli: &Cli,
    source: spendlens_inspect::InputSource,
    bundle: spendlens_core::SpendBundle,
    notes: Vec<String>,
) -> Result<()> {
    let report = inspect_bundle(source, bundle, notes, cli.max_cost);
    let serialized = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    write_output(&cli.output, &serialized)
}

/// Program arguments accept either serialized hex or readable text.
fn parse_program_input(input: &str) -> Result<std::rc::Rc<spendlens_core::Value>> {
    if looks_like_hex(input) {
        let bytes = decode_hex(input).context("failed to decode hex input")?;
        return Ok(decode(&bytes)?);
    }
    Ok(parse(input)?)
}

fn looks_like_hex(input: &str) -> bool {
    let raw = strip_0x(input);
    !raw.is_empty() && raw.len() % 2 == 0 && raw.bytes().all(|b| b.is_ascii_hexdigit())
}

fn read_input(path_or_stdin: &str) -> Result<String> {
    if path_or_stdin == "-" {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        return Ok(input);
    }
    std::fs::read_to_string(path_or_stdin)
        .with_context(|| format!("failed to read {path_or_stdin}"))
}

fn write_output(path_or_stdout: &str, data: &str) -> Result<()> {
    if path_or_stdout == "-" {
        let mut stdout = std::io::stdout();
        stdout.write_all(data.as_bytes())?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
        return Ok(());
    }
    std::fs::write(path_or_stdout, format!("{data}\n"))?;
    Ok(())
}
