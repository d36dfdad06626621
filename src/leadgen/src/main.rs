//! Leadgen segment tool: compiles rule-builder rulesets into search queries.
//!
//! The query document goes to stdout; logs go to stderr.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use leadgen_core::config::{AppConfig, LogFormat};
use leadgen_core::LeadgenResult;
use leadgen_segmentation::{CompilerOptions, RulesetCompiler};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "leadgen")]
#[command(about = "Compile customer segment rulesets into search queries")]
#[command(version)]
struct Cli {
    /// TOML config file (environment variables still apply on top)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Maximum group nesting depth (overrides config)
    #[arg(long, global = true, env = "LEADGEN__SEGMENTATION__MAX_DEPTH")]
    max_depth: Option<usize>,

    /// Interaction relation name (overrides config)
    #[arg(long, global = true, env = "LEADGEN__SEGMENTATION__RELATION")]
    relation: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a ruleset and print the query document
    Compile {
        /// Ruleset JSON file (default: stdin)
        file: Option<PathBuf>,

        /// Pretty-print the query
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },

    /// Validate a ruleset and print its shape
    Check {
        /// Ruleset JSON file (default: stdin)
        file: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(max_depth) = cli.max_depth {
        config.segmentation.max_depth = max_depth;
    }
    if let Some(relation) = cli.relation {
        config.segmentation.relation = relation;
    }

    init_tracing(config.log_format);
    debug!(
        node_id = %config.node_id,
        max_depth = config.segmentation.max_depth,
        relation = %config.segmentation.relation,
        "Configuration loaded"
    );

    let compiler = RulesetCompiler::new(CompilerOptions::from(&config.segmentation));

    match cli.command {
        Commands::Compile { file, pretty } => cmd_compile(&compiler, file.as_deref(), pretty),
        Commands::Check { file } => cmd_check(&compiler, file.as_deref()),
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "leadgen=info,leadgen_segmentation=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.compact().init(),
    }
}

fn read_input(path: Option<&Path>) -> LeadgenResult<String> {
    match path {
        Some(path) if path != Path::new("-") => Ok(std::fs::read_to_string(path)?),
        _ => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn render(value: &impl serde::Serialize, pretty: bool) -> LeadgenResult<String> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}

fn compile_text(compiler: &RulesetCompiler, text: &str, pretty: bool) -> anyhow::Result<String> {
    let query = compiler.compile_json(text).context("ruleset rejected")?;
    let out = if pretty {
        query.to_json_pretty()?
    } else {
        query.to_json()?
    };
    Ok(out)
}

fn cmd_compile(compiler: &RulesetCompiler, file: Option<&Path>, pretty: bool) -> anyhow::Result<()> {
    let text = read_input(file).context("failed to read ruleset")?;
    println!("{}", compile_text(compiler, &text, pretty)?);
    Ok(())
}

fn cmd_check(compiler: &RulesetCompiler, file: Option<&Path>) -> anyhow::Result<()> {
    let text = read_input(file).context("failed to read ruleset")?;
    let ruleset = compiler.parse_json(&text).context("ruleset rejected")?;
    compiler.compile(&ruleset).context("ruleset rejected")?;

    let summary = ruleset.summary();
    info!(
        groups = summary.groups,
        leaves = summary.leaves,
        depth = summary.depth,
        max_depth = compiler.options().max_depth,
        "Ruleset is valid"
    );
    println!("{}", render(&summary, true)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadgen_segmentation::Ruleset;

    #[test]
    fn test_parse_compile_with_overrides() {
        let cli = Cli::try_parse_from([
            "leadgen",
            "compile",
            "segment.json",
            "--pretty",
            "--max-depth",
            "8",
        ])
        .unwrap();
        assert_eq!(cli.max_depth, Some(8));
        match cli.command {
            Commands::Compile { file, pretty } => {
                assert_eq!(file, Some(PathBuf::from("segment.json")));
                assert!(pretty);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_check_reads_stdin_by_default() {
        let cli = Cli::try_parse_from(["leadgen", "check"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { file: None }));
    }

    #[test]
    fn test_compile_text_outputs() {
        let compiler = RulesetCompiler::default();
        assert_eq!(
            compile_text(&compiler, "null", false).unwrap(),
            r#"{"query":{"constant_score":{"filter":{"match_all":{}}}}}"#
        );
        let pretty = compile_text(&compiler, "{}", true).unwrap();
        assert!(pretty.contains('\n'));
        assert!(compile_text(&compiler, r#"{"id": "created_at-d"}"#, false).is_err());
    }

    #[test]
    fn test_render_summary() {
        let summary = Ruleset::empty().summary();
        assert_eq!(
            render(&summary, false).unwrap(),
            r#"{"groups":0,"leaves":0,"depth":0}"#
        );
    }
}
