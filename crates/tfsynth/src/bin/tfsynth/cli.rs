//! tfsynth cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;
use tfsynth::render::NullLiteral;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; tfsynth ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Synthesize terraform json for every stack
    ///
    /// Reads a manifest from stdin unless any other source is provided (via --input-*)
    Synth(SynthCommand),

    /// Render a single wire expression
    Render(RenderCommand),
}

#[derive(Parser, Debug)]
pub struct SynthCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,

    #[clap(flatten)]
    pub render: RenderArgs,
}

#[derive(Parser, Debug)]
pub struct RenderCommand {
    #[clap(flatten)]
    pub render: RenderArgs,

    /// Value in wire format, e.g. '{"$binary": "mul", "left": 2, "right": 3}'
    pub expression: String,
}

#[derive(Parser, Debug)]
pub struct InputArgs {
    /// Load manifests (*stack.json) from work directory
    #[clap(short = 'w', long = "input-workdir")]
    pub workdir: bool,

    /// Load a manifest
    #[clap(short = 'f', long = "input-file")]
    pub files: Vec<PathBuf>,

    /// Load manifests (*stack.json) from given directory
    #[clap(short = 'd', long = "input-dir")]
    pub directories: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    /// Write one <stack>.tf.json per stack into this directory instead of printing
    #[clap(short = 'o', long = "output-dir")]
    pub directory: Option<PathBuf>,

    /// Format used when printing to stdout
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// How `null` is written inside expressions
    #[arg(long = "null-literal", default_value_t)]
    pub null_literal: NullLiteralArg,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Default, Debug)]
pub enum NullLiteralArg {
    #[default]
    Undefined,
    Null,
}

impl std::fmt::Display for NullLiteralArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(NullLiteral::from(*self).as_str())
    }
}

impl From<NullLiteralArg> for NullLiteral {
    fn from(value: NullLiteralArg) -> Self {
        match value {
            NullLiteralArg::Undefined => NullLiteral::Undefined,
            NullLiteralArg::Null => NullLiteral::Null,
        }
    }
}
