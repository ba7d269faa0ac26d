//! CLI surface (spec.md §6) and the `RunConfig` it builds. Argument parsing
//! and the concrete output destinations are this crate's only opinion about
//! "the enclosing program"; the pipeline itself (`lib.rs`) knows nothing
//! about `clap`.

use crate::error::{Error, Result};
use crate::gatherer::RawInputs;
use crate::output::FlagDialect;
use clap::Parser;
use std::path::PathBuf;

/// Prunes a SystemVerilog/Verilog file list down to the files required to
/// elaborate a top module.
#[derive(Debug, Parser)]
#[command(name = "svprune", version, about)]
pub struct Args {
    /// Top module name; exactly one is required.
    #[arg(long)]
    pub top: String,

    /// Optional cache file path.
    #[arg(long = "cache-to")]
    pub cache_to: Option<PathBuf>,

    /// Destination file for the pruned list.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Alternative sink emitting flag strings instead of bare paths.
    #[arg(long = "output-flags-to")]
    pub output_flags_to: Option<PathBuf>,

    /// When emitting flags, restrict to a Verific-compatible subset.
    #[arg(long = "verific-compat")]
    pub verific_compat: bool,

    /// Source files plus the standard front-end argument surface (`-v`,
    /// `-y`, `-Y`/`+libext+`, `+incdir+`, `+define+`, `-f`, `-C`), forwarded
    /// to the adapter verbatim.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub front_end_args: Vec<String>,
}

/// The forwarded front-end argument surface, expanded into structured
/// `RawInputs`, plus the destinations and dialect the output sinks need.
pub struct RunConfig {
    pub top_module: String,
    pub cache_to: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub output_flags_to: Option<PathBuf>,
    pub dialect: FlagDialect,
    pub raw_inputs: RawInputs,
}

impl RunConfig {
    pub fn from_args(args: Args) -> Result<Self> {
        let raw_inputs = parse_front_end_args(&args.front_end_args)?;
        let dialect = if args.verific_compat {
            FlagDialect::VerificCompat
        } else {
            FlagDialect::Standard
        };
        Ok(Self {
            top_module: args.top,
            cache_to: args.cache_to,
            output: args.output,
            output_flags_to: args.output_flags_to,
            dialect,
            raw_inputs,
        })
    }
}

/// Tokenizes the forwarded front-end argument surface into [`RawInputs`].
/// Value-taking flags (`-v`, `-y`, `-Y`, `-f`, `-C`) consume the following
/// token; `+incdir+`, `+define+`, `+libext+` are self-contained single
/// tokens; everything else is a source file.
fn parse_front_end_args(tokens: &[String]) -> Result<RawInputs> {
    let mut raw = RawInputs::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        match token {
            "-v" => {
                let value = next_value(tokens, &mut i, "-v")?;
                match value.split_once('=') {
                    Some((name, path)) => raw.library_files.push((PathBuf::from(path), Some(name.to_string()))),
                    None => raw.library_files.push((PathBuf::from(value), None)),
                }
            }
            "-y" => raw.library_dirs.push(PathBuf::from(next_value(tokens, &mut i, "-y")?)),
            "-Y" => raw.library_exts.push(next_value(tokens, &mut i, "-Y")?.trim_start_matches('.').to_string()),
            "-f" | "-C" => raw.command_files.push(PathBuf::from(next_value(tokens, &mut i, token)?)),
            _ if token.starts_with("+incdir+") => {
                raw.incdirs.push(PathBuf::from(&token["+incdir+".len()..]));
            }
            _ if token.starts_with("+libext+") => {
                raw.library_exts.push(token["+libext+".len()..].trim_start_matches('.').to_string());
            }
            _ if token.starts_with("+define+") => {
                let body = &token["+define+".len()..];
                match body.split_once('=') {
                    Some((name, value)) => raw.defines.push((name.to_string(), Some(value.to_string()))),
                    None => raw.defines.push((body.to_string(), None)),
                }
            }
            _ => raw.sources.push(PathBuf::from(token)),
        }
        i += 1;
    }
    Ok(raw)
}

fn next_value(tokens: &[String], i: &mut usize, flag: &str) -> Result<String> {
    *i += 1;
    tokens
        .get(*i)
        .cloned()
        .ok_or_else(|| Error::msg(format!("`{flag}` requires a value")))
}
