mod cli;

use indexmap::IndexMap;
use tfsynth::manifest::Manifests;
use tfsynth::render::RenderOptions;
use tfsynth::resolve::Resolver;
use tfsynth::token::{ScopeId, TokenRegistry};
use tfsynth::tree::Node;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("TFSYNTH_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Synth(synth_cli) => synth(synth_cli),
        cli::Command::Render(render_cli) => render(render_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn synth(cli: cli::SynthCommand) -> anyhow::Result<()> {
    let manifests = load(&cli.input)?;
    let stacks = manifests.build(&render_options(&cli.render))?;

    // nothing is written unless every stack synthesizes
    let mut documents = IndexMap::new();
    for stack in &stacks {
        documents.insert(stack.artifact_file(), (stack, stack.to_json()?));
    }

    match &cli.output.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            for (file_name, (_, json)) in &documents {
                let path = directory.join(file_name);
                std::fs::write(&path, json)?;
                tracing::info!(path=%path.display(), "wrote stack");
            }
        }
        None => {
            let mut by_stack = serde_json::Map::new();
            for (stack, json) in documents.values() {
                by_stack.insert(stack.id().to_string(), serde_json::from_str(json)?);
            }
            output(&cli.output, &serde_json::Value::Object(by_stack))?;
        }
    }

    Ok(())
}

pub fn render(cli: cli::RenderCommand) -> anyhow::Result<()> {
    let json: serde_json::Value = serde_json::from_str(&cli.expression)?;

    let tokens = TokenRegistry::new();
    let value = tfsynth::wire::from_wire(&json, &tokens)?;

    let options = render_options(&cli.render);
    let resolved = Resolver::new(ScopeId::new(), &tokens, &options).resolve(&value)?;

    match resolved {
        serde_json::Value::String(text) => println!("{text}"),
        other => println!("{}", serde_json::to_string_pretty(&other)?),
    }

    Ok(())
}

fn render_options(args: &cli::RenderArgs) -> RenderOptions {
    RenderOptions::new(args.null_literal.into())
}

fn load(input: &cli::InputArgs) -> anyhow::Result<Manifests> {
    let mut manifests = Manifests::default();

    if !input.workdir && input.files.is_empty() && input.directories.is_empty() {
        let stdin = std::io::read_to_string(std::io::stdin())?;
        manifests.insert_str(&stdin, None)?;
        return Ok(manifests);
    }

    if input.workdir {
        manifests.load_directory(&std::env::current_dir()?)?;
    }

    for file_path in &input.files {
        manifests.load_file(file_path)?;
    }

    for dir_path in &input.directories {
        manifests.load_directory(dir_path)?;
    }

    anyhow::ensure!(manifests.source_count() > 0, "No files loaded");

    Ok(manifests)
}

fn output(output: &cli::OutputArgs, value: &serde_json::Value) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => {
            serde_json::to_writer_pretty(std::io::stdout(), value)?;
            println!();
        }
    };

    Ok(())
}
