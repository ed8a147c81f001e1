use std::path::PathBuf;

use clap::Parser;

use stack2arm_converter::{convert_template, Config, ConvertError};

#[derive(Parser, Debug)]
#[command(
    name = "stack2arm",
    version,
    about = "OpenStack Heat / AWS CloudFormation to Azure ARM template converter"
)]
struct Cli {
    /// Path to the Heat or CloudFormation template to convert
    input: PathBuf,

    /// ARM template output path (default: stdout)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Path to an optional configuration file
    #[arg(long)]
    config_file: Option<PathBuf>,
}

fn run(cli: Cli) -> Result<(), ConvertError> {
    let config = match &cli.config_file {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let source = std::fs::read_to_string(&cli.input)?;
    let result = convert_template(&source, &config)?;

    for diag in &result.diagnostics {
        eprintln!("{}", diag);
    }

    let rendered = serde_json::to_string_pretty(&result.document)?;
    match &cli.out {
        Some(path) => std::fs::write(path, rendered)?,
        None => println!("{}", rendered),
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
