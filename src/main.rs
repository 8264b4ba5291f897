//! poseidon-gen CLI.
//!
//! Emits the Poseidon contract artifacts and exposes the native hash for
//! scripting and cross-checking.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use poseidon_gen::conformance::Corpus;
use poseidon_gen::poseidon::{self, DEFAULT_SECURITY_LEVEL, DEFAULT_WIDTH};
use poseidon_gen::{evm, DiffTestHarness, ErrorCode, Fr, PermutationConfig};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const ABI_FILE: &str = "poseidon.abi";
const BIN_FILE: &str = "poseidon.bin";

#[derive(Parser)]
#[command(name = "poseidon-gen")]
#[command(about = "Poseidon over BN254: native hash and EVM contract emitter", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct ParamArgs {
    /// State width t (rate is t - 1)
    #[arg(long, env = "POSEIDON_WIDTH", default_value_t = DEFAULT_WIDTH)]
    width: usize,

    /// Security level in bits
    #[arg(long, env = "POSEIDON_SECURITY", default_value_t = DEFAULT_SECURITY_LEVEL)]
    security: u32,
}

impl ParamArgs {
    fn load(&self) -> Result<&'static PermutationConfig, ErrorCode> {
        poseidon::load(self.width, self.security)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write poseidon.abi and poseidon.bin
    Generate {
        #[command(flatten)]
        params: ParamArgs,

        /// Output directory
        #[arg(long, env = "POSEIDON_OUT_DIR", default_value = ".")]
        out_dir: PathBuf,

        /// Write raw bytes instead of hex to poseidon.bin
        #[arg(long)]
        raw: bool,
    },

    /// Hash field elements (decimal or 0x hex) and print the result as JSON
    Hash {
        #[command(flatten)]
        params: ParamArgs,

        /// Input elements
        inputs: Vec<String>,
    },

    /// Dump the parameter set as JSON
    ExportParams {
        #[command(flatten)]
        params: ParamArgs,
    },

    /// Run the conformance corpus against the emitted contract
    Verify {
        #[command(flatten)]
        params: ParamArgs,

        /// Corpus JSON file; the built-in corpus is used when omitted
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Directory for mismatch reports
        #[arg(long)]
        repro_dir: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Generate {
            params,
            out_dir,
            raw,
        }) => cmd_generate(&params, &out_dir, raw),
        Some(Commands::Hash { params, inputs }) => Ok(cmd_hash(&params, &inputs)),
        Some(Commands::ExportParams { params }) => cmd_export_params(&params),
        Some(Commands::Verify {
            params,
            corpus,
            repro_dir,
        }) => cmd_verify(&params, corpus.as_deref(), repro_dir.as_deref()),
        Some(Commands::Version) | None => {
            println!("poseidon-gen v{}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_generate(params: &ParamArgs, out_dir: &Path, raw: bool) -> anyhow::Result<ExitCode> {
    let config = params.load()?;
    let artifact = evm::emit(config)?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let abi_path = out_dir.join(ABI_FILE);
    let abi = artifact
        .interface()
        .to_json()
        .context("serializing interface")?;
    fs::write(&abi_path, abi).with_context(|| format!("writing {}", abi_path.display()))?;

    let bin_path = out_dir.join(BIN_FILE);
    let bin = if raw {
        artifact.bytecode().to_vec()
    } else {
        hex::encode(artifact.bytecode()).into_bytes()
    };
    fs::write(&bin_path, bin).with_context(|| format!("writing {}", bin_path.display()))?;

    log::info!(
        "{}: {} bytes creation code, {} bytes runtime",
        config.id(),
        artifact.bytecode().len(),
        artifact.runtime().len()
    );
    println!("{}", abi_path.display());
    println!("{}", bin_path.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_hash(params: &ParamArgs, inputs: &[String]) -> ExitCode {
    let digest = params.load().and_then(|config| {
        let elements = inputs
            .iter()
            .map(|s| Fr::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        poseidon::hash(&elements, config)
    });

    match digest {
        Ok(d) => {
            println!("{}", json!({ "ok": { "hash": d.to_decimal() } }));
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", json!({ "err": { "code": e.code(), "name": e.name() } }));
            ExitCode::FAILURE
        }
    }
}

fn cmd_export_params(params: &ParamArgs) -> anyhow::Result<ExitCode> {
    let config = params.load()?;
    let to_hex = |row: &Vec<Fr>| row.iter().map(Fr::to_hex).collect::<Vec<_>>();

    let dump = json!({
        "id": config.id(),
        "width": config.width(),
        "rate": config.rate(),
        "capacity": config.capacity(),
        "full_rounds": config.full_rounds(),
        "partial_rounds": config.partial_rounds(),
        "alpha": config.alpha(),
        "security_level": config.security_level(),
        "round_constants": config.all_round_constants().iter().map(to_hex).collect::<Vec<_>>(),
        "mds": config.mds().iter().map(to_hex).collect::<Vec<_>>(),
    });

    println!(
        "{}",
        serde_json::to_string_pretty(&dump).context("serializing parameters")?
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_verify(
    params: &ParamArgs,
    corpus_path: Option<&Path>,
    repro_dir: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    let config = params.load()?;
    let corpus = match corpus_path {
        Some(path) => Corpus::load(path)
            .with_context(|| format!("loading corpus {}", path.display()))?,
        None => Corpus::builtin(config),
    };
    if corpus.width != config.width() || corpus.security_level != config.security_level() {
        bail!(
            "corpus is for width {} security {}, parameters are {}",
            corpus.width,
            corpus.security_level,
            config.id()
        );
    }

    let harness = DiffTestHarness::new(config)?;
    let report = harness.run_corpus(&corpus);

    for (id, verdict) in report.problems() {
        println!("FAIL {}: {}", id, verdict);
    }

    if let Some(dir) = repro_dir {
        let written = report
            .save_repros(dir)
            .with_context(|| format!("writing repro bundles to {}", dir.display()))?;
        for path in written {
            log::info!("wrote {}", path.display());
        }
    }

    println!("{}: {}", config.id(), report.summary());
    if report.all_passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
