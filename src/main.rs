use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tomlweave::config::{LoadOptions, Loader, to_json};

#[derive(Parser)]
#[command(name = "tomlweave")]
#[command(
	author,
	version,
	about = "Load TOML configuration with variable substitution and file includes"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Show debug logs on stderr
	#[arg(short, long, global = true)]
	verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
	/// Load the configuration and report whether it is valid
	Validate(LoadArgs),
	/// Print the loaded configuration as JSON
	Render(LoadArgs),
}

#[derive(Args)]
struct LoadArgs {
	/// TOML file to load [default: $TOMLWEAVE_TOML_FILE or env.toml]
	#[arg(long = "toml", value_name = "PATH")]
	toml_file: Option<PathBuf>,

	/// Variable file to read [default: $TOMLWEAVE_ENV_FILE or .env]
	#[arg(long, value_name = "PATH", conflicts_with = "no_env_file")]
	env_file: Option<PathBuf>,

	/// Do not read a variable file
	#[arg(long)]
	no_env_file: bool,

	/// Fail on undefined variables and include problems (default)
	#[arg(long, overrides_with = "no_strict")]
	strict: bool,

	/// Keep unresolved placeholders and skip broken includes
	#[arg(long, overrides_with = "strict")]
	no_strict: bool,

	/// Do not use the process environment as a variable source
	#[arg(long)]
	no_environ: bool,
}

impl LoadArgs {
	fn options(&self) -> LoadOptions {
		let mut options = LoadOptions::new()
			.strict(!self.no_strict)
			.include_environment(!self.no_environ);

		if let Some(ref path) = self.toml_file {
			options = options.toml_file(path);
		}
		if self.no_env_file {
			options = options.no_env_file();
		} else if let Some(ref path) = self.env_file {
			options = options.env_file(path);
		}

		options
	}
}

fn main() -> ExitCode {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	match run(cli.command) {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn init_logging(verbose: bool) {
	let default_level = if verbose { "debug" } else { "warn" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr))
		.init();
}

fn run(command: Commands) -> Result<ExitCode> {
	match command {
		Commands::Validate(args) => handle_validate(&args),
		Commands::Render(args) => handle_render(&args),
	}
}

fn load(args: &LoadArgs) -> Result<Loader> {
	let options = args.options();
	let target = options
		.toml_file
		.as_ref()
		.map(|p| p.display().to_string())
		.unwrap_or_else(|| "configuration".to_string());

	Loader::new(options).with_context(|| format!("Failed to load {target}"))
}

fn handle_validate(args: &LoadArgs) -> Result<ExitCode> {
	let loader = load(args)?;
	tracing::debug!(
		source = %loader.source().display(),
		strict = loader.strict(),
		"configuration loaded"
	);

	println!("Validation successful.");
	Ok(ExitCode::SUCCESS)
}

fn handle_render(args: &LoadArgs) -> Result<ExitCode> {
	let loader = load(args)?;
	let rendered =
		serde_json::to_string_pretty(&to_json(loader.raw())).context("Failed to render JSON")?;

	println!("{rendered}");
	Ok(ExitCode::SUCCESS)
}
