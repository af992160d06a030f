//! Merge a DOCX template with a JSON instruction list.
//!
//! Usage:
//!   docx-merge --template template.docx --data data.json -o output.docx
//!   docx-merge --template-uri template.txt --data data.json --emit-uri -o output.txt

use anyhow::{bail, Context, Result};
use clap::Parser;
use docx_mail_merge::{Content, Instruction, MailMerge, MergeConfig};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "docx-merge", about = "Fill DOCX template placeholders with text, images and tables")]
struct Cli {
    /// Template DOCX file
    #[arg(long, conflicts_with = "template_uri", required_unless_present = "template_uri")]
    template: Option<PathBuf>,

    /// Text file holding the template as a DOCX data URI
    #[arg(long)]
    template_uri: Option<PathBuf>,

    /// Instruction list (JSON array of {type, placeholder, content})
    #[arg(long)]
    data: PathBuf,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    /// Write the result as a DOCX data URI instead of raw DOCX bytes
    #[arg(long)]
    emit_uri: bool,

    /// Image width in centimeters when an instruction gives none
    #[arg(long, env = "DOCX_MERGE_DEFAULT_WIDTH_CM", default_value_t = 3.0)]
    default_width_cm: f64,

    /// Image height in centimeters when an instruction gives none
    #[arg(long, env = "DOCX_MERGE_DEFAULT_HEIGHT_CM", default_value_t = 3.0)]
    default_height_cm: f64,
}

// ─── Input ──────────────────────────────────────────────────────────────────

fn read_text(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}: {}", what, path.display()))
}

fn load_instructions(path: &Path) -> Result<Vec<Instruction>> {
    let json = read_text(path, "instructions")?;
    let instructions = Instruction::parse_list(&json)
        .with_context(|| format!("Invalid instruction list: {}", path.display()))?;

    let (mut text, mut image, mut table, mut other) = (0, 0, 0, 0);
    for instruction in &instructions {
        match instruction.content {
            Content::Text(_) => text += 1,
            Content::Image { .. } => image += 1,
            Content::Table(_) => table += 1,
            Content::Unsupported(_) => other += 1,
        }
    }
    println!(
        "  {} instructions ({} text, {} image, {} table, {} unsupported)",
        instructions.len(),
        text,
        image,
        table,
        other
    );
    Ok(instructions)
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn run(cli: &Cli) -> Result<()> {
    if cli.default_width_cm <= 0.0 || cli.default_height_cm <= 0.0 {
        bail!(
            "Default image size must be positive (got {} x {} cm)",
            cli.default_width_cm,
            cli.default_height_cm
        );
    }
    let config = MergeConfig::default()
        .with_default_image_size(cli.default_width_cm, cli.default_height_cm);
    let engine = MailMerge::with_config(config);

    println!("Loading instructions: {}", cli.data.display());
    let instructions = load_instructions(&cli.data)?;

    let merged: Vec<u8> = match (&cli.template, &cli.template_uri) {
        (Some(path), _) => {
            println!("\nOpening DOCX: {}", path.display());
            let template = std::fs::read(path)
                .with_context(|| format!("Failed to open DOCX: {}", path.display()))?;
            let merged = engine
                .merge_docx(&template, &instructions)
                .with_context(|| format!("Merge failed for {}", path.display()))?;
            if cli.emit_uri {
                docx_mail_merge::envelope::encode_docx(&merged).into_bytes()
            } else {
                merged
            }
        }
        (None, Some(path)) => {
            println!("\nOpening DOCX data URI: {}", path.display());
            let uri = read_text(path, "template data URI")?;
            let merged = engine
                .merge_data_uri(uri.trim(), &instructions)
                .with_context(|| format!("Merge failed for {}", path.display()))?;
            if cli.emit_uri {
                merged.into_bytes()
            } else {
                docx_mail_merge::envelope::decode_docx(&merged)?
            }
        }
        (None, None) => bail!("Either --template or --template-uri is required"),
    };

    std::fs::write(&cli.output, &merged)
        .with_context(|| format!("Failed to create output: {}", cli.output.display()))?;
    println!("\nSaved to: {} ({} bytes)", cli.output.display(), merged.len());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    run(&cli)
}
