//! Tabula CLI - apply a script of cell edits and print the sheet
//!
//! A script has one edit per line: a cell position, whitespace, then the raw
//! text for that cell. Blank lines and lines starting with `#` are skipped.
//!
//! ```text
//! B2 =5
//! A1 =B2 * 2
//! C1 =Sum(A1:B2)
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tabula::prelude::*;
use tabula::{tokenize, tokens_to_string};

#[derive(Parser)]
#[command(name = "tabula")]
#[command(author, version, about = "Spreadsheet formula engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a script of edits and print every stored cell
    Run {
        /// Script file (default: stdin)
        input: Option<PathBuf>,

        /// Print the store as JSON
        #[arg(short, long)]
        json: bool,

        /// Re-evaluate each dependent once per edit, in dependency order
        #[arg(short, long)]
        worklist: bool,

        /// Record edges for formulas that name their own cell
        #[arg(long)]
        self_references: bool,

        /// Rebuild and re-evaluate the whole sheet after the script
        #[arg(short, long)]
        recalculate: bool,

        /// Report per-edit statistics on stderr
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the tokens of a piece of cell text
    Tokens {
        /// Raw cell text
        text: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            json,
            worklist,
            self_references,
            recalculate,
            verbose,
        } => {
            let options = CalculationOptions {
                propagation: if worklist {
                    Propagation::Worklist
                } else {
                    Propagation::Recursive
                },
                record_self_references: self_references,
                ..Default::default()
            };
            run(input.as_deref(), options, json, recalculate, verbose)
        }
        Commands::Tokens { text } => {
            println!("{}", tokens_to_string(&tokenize(&text)));
            Ok(())
        }
    }
}

fn run(
    input: Option<&Path>,
    options: CalculationOptions,
    json: bool,
    recalculate: bool,
    verbose: bool,
) -> Result<()> {
    let script = read_script(input)?;
    let mut sheet = Sheet::with_options(options);

    for (index, line) in script.lines().enumerate() {
        let Some((position, raw)) = parse_line(line)
            .with_context(|| format!("Invalid script line {}: '{}'", index + 1, line))?
        else {
            continue;
        };

        let stats = sheet.edit_position(position, raw);
        if verbose {
            eprintln!(
                "{} = {:?}: {} evaluated, {} changed",
                position,
                raw,
                stats.cells_evaluated,
                stats.changed.len()
            );
        }
        if stats.has_cycles() {
            let members: Vec<String> = stats.cyclic_cells.iter().map(|p| p.to_string()).collect();
            eprintln!("Warning: reference cycle at {}", members.join(", "));
        }
        if stats.truncated {
            eprintln!("Warning: propagation from {} stopped early", position);
        }
    }

    if recalculate {
        let stats = sheet.recalculate();
        if verbose {
            eprintln!("Recalculated {} cells", stats.cells_evaluated);
        }
    }

    let output = if json {
        render_json(&sheet)?
    } else {
        render_table(&sheet)
    };
    io::stdout()
        .write_all(output.as_bytes())
        .context("Failed to write to stdout")?;

    Ok(())
}

fn read_script(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display())),
        None => {
            let mut script = String::new();
            io::stdin()
                .read_to_string(&mut script)
                .context("Failed to read stdin")?;
            Ok(script)
        }
    }
}

/// Split a script line into its position and raw text
///
/// Returns `None` for blank lines and comments.
fn parse_line(line: &str) -> Result<Option<(CellPosition, &str)>> {
    let line = line.trim_start();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (position, raw) = match line.split_once(char::is_whitespace) {
        Some((position, raw)) => (position, raw.trim_start()),
        None => (line, ""),
    };
    if position.is_empty() {
        bail!("missing cell position");
    }

    let position: CellPosition = position.parse()?;
    Ok(Some((position, raw)))
}

fn render_table(sheet: &Sheet) -> String {
    let mut output = String::new();
    for (position, cell) in sheet.cells() {
        output.push_str(&format!(
            "{}\t{}\t{}\n",
            position,
            cell.raw,
            cell.display_value()
        ));
    }
    output
}

fn render_json(sheet: &Sheet) -> Result<String> {
    let cells: BTreeMap<CellPosition, &DataCell> = sheet.cells().collect();
    let mut json = serde_json::to_string_pretty(&cells).context("Failed to serialize sheet")?;
    json.push('\n');
    Ok(json)
}
