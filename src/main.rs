use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Parser;

#[derive(Parser, Debug)]
struct Cli {
    /// Working directory, with config file.
    #[clap(short, long, default_value = "data")]
    dir: PathBuf,

    #[clap(subcommand)]
    cmd: Cmd,
}

#[derive(clap::Subcommand, Debug)]
enum Cmd {
    /// Serve the usage API.
    Server,

    /// Print one usage report to stdout, without starting the server.
    Generate {
        /// Overrides the seed from the config file.
        #[clap(short, long)]
        seed: Option<u64>,

        #[clap(short, long, default_value_t = false)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    human_panic_setup();
    let cli = Cli::parse();
    set_current_dir(&cli.dir)?;
    copilot_usage::conf::init()?;
    copilot_usage::tracing::init()?;
    tracing::debug!(?cli, "Starting.");
    match &cli.cmd {
        Cmd::Server => copilot_usage::server::run().await,
        Cmd::Generate { seed, pretty } => {
            let conf = copilot_usage::conf::global();
            let entropy =
                copilot_usage::generator::Entropy::from_seed(seed.or(conf.seed));
            let now = chrono::Local::now();
            let data =
                copilot_usage::generator::generate(&mut entropy.rng(), now);
            let report =
                copilot_usage::types::UsageReport::success(data, now.to_rfc3339());
            let encoded = if *pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{encoded}");
            Ok(())
        }
    }
}

fn set_current_dir(path: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(path)
        .context(format!("Failed to create directory path: {path:?}"))?;
    env::set_current_dir(path)
        .context(format!("Failed to set current directory to {path:?}"))?;
    Ok(())
}

fn human_panic_setup() {
    macro_rules! repo {
        () => {
            env!("CARGO_PKG_REPOSITORY")
        };
    }
    human_panic::setup_panic!(human_panic::Metadata::new(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
    .authors(env!("CARGO_PKG_AUTHORS"))
    .homepage(repo!())
    .support(concat!("- Submit an issue at ", repo!(), "/issues")));
}
