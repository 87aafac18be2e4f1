use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "polyspace-justify",
    version,
    about = "Transcribe justified findings from a Polyspace HTML report into source comments"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Annotate(AnnotateArgs),
    Extract(ExtractArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AnnotateArgs {
    #[arg(long)]
    pub html_path: PathBuf,

    #[arg(long = "source", required = true)]
    pub sources: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = FailurePolicy::Abort)]
    pub failure_policy: FailurePolicy,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long)]
    pub summary_path: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum FailurePolicy {
    Abort,
    Continue,
}

impl FailurePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::Continue => "continue",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long)]
    pub html_path: PathBuf,

    #[arg(long)]
    pub output_path: Option<PathBuf>,
}
