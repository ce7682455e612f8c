mod db;
mod heuristics;
mod ingest;
mod model;
mod render;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::warn;

#[derive(Parser)]
#[command(
    name = "catalog_builder",
    about = "Heuristic product-catalog extraction from document text"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a source document (txt/html/pdf/docx) and store its text
    Ingest {
        file: PathBuf,
    },
    /// Split text into candidate product blocks
    Segment {
        /// Decode this file instead of reading a stored extract
        #[arg(short, long, conflicts_with = "extract")]
        file: Option<PathBuf>,
        /// Stored extract id
        #[arg(short, long)]
        extract: Option<String>,
        /// Minimum line count for a candidate block
        #[arg(long, default_value_t = heuristics::DEFAULT_MIN_LINES)]
        min_lines: usize,
    },
    /// Map blocks to product records and print them as JSON
    Map {
        /// Decode this file instead of reading a stored extract
        #[arg(short, long, conflicts_with = "extract")]
        file: Option<PathBuf>,
        /// Stored extract id
        #[arg(short, long)]
        extract: Option<String>,
        #[arg(long, default_value_t = heuristics::DEFAULT_MIN_LINES)]
        min_lines: usize,
    },
    /// Manage catalog templates
    #[command(subcommand)]
    Template(TemplateCmd),
    /// Validate records against a template and render an HTML catalog
    Generate {
        /// Stored template id
        #[arg(short, long)]
        template: String,
        /// Stored extract id to map and render
        #[arg(short, long, conflicts_with = "products")]
        extract: Option<String>,
        /// JSON file with pre-mapped product records
        #[arg(short, long)]
        products: Option<PathBuf>,
        /// Output format (html only)
        #[arg(long, default_value = "html")]
        format: String,
        /// Also write the catalog to this path
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(long, default_value_t = heuristics::DEFAULT_MIN_LINES)]
        min_lines: usize,
    },
    /// Print or save a previously generated catalog
    Export {
        /// Generated catalog id
        id: String,
        /// Write to this path instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Ingest + map + validate + render, one catalog per input file
    Run {
        files: Vec<PathBuf>,
        /// Stored template id
        #[arg(short, long)]
        template: String,
        #[arg(long, default_value = "catalogs")]
        out_dir: PathBuf,
        #[arg(long, default_value_t = heuristics::DEFAULT_MIN_LINES)]
        min_lines: usize,
    },
    /// Show store statistics
    Stats,
}

#[derive(Subcommand)]
enum TemplateCmd {
    /// Create a template with the default field contract
    Generate {
        #[arg(short, long)]
        name: String,
        /// Store it and print the assigned id
        #[arg(long)]
        persist: bool,
    },
    /// Store a template from a JSON file
    Persist {
        file: PathBuf,
    },
    /// List stored templates
    List,
    /// Print one stored template as JSON
    Show {
        id: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ingest { file } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let filename = display_name(&file);
            let bytes = std::fs::read(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let format = ingest::detect_format(&filename);
            let text = ingest::decode(&bytes, &filename)?;
            let id = db::insert_extract(&conn, &filename, format.as_str(), &text)?;
            println!(
                "Stored extract {} ({}, {} chars)",
                id,
                format.as_str(),
                text.chars().count()
            );
            Ok(())
        }
        Commands::Segment { file, extract, min_lines } => {
            let raw = match (&file, &extract) {
                (Some(path), None) => read_and_decode(path)?,
                (None, Some(id)) => {
                    let conn = db::connect()?;
                    db::init_schema(&conn)?;
                    let row = db::fetch_extract(&conn, id)?
                        .with_context(|| format!("extract {} not found", id))?;
                    println!("Source: {} ({})\n", row.filename, row.format);
                    row.text
                }
                _ => bail!("pass exactly one of --file or --extract"),
            };
            let text = heuristics::normalize(&raw);
            let blocks = heuristics::split_blocks(&text, min_lines);
            if blocks.is_empty() {
                println!("No blocks found.");
                return Ok(());
            }
            println!("{:>3} | {:>7} | {:>7} | {:>5} | {}", "#", "start", "end", "lines", "preview");
            println!("{}", "-".repeat(92));
            for (i, b) in blocks.iter().enumerate() {
                let lines = text[b.start..b.end].matches('\n').count() + 1;
                println!(
                    "{:>3} | {:>7} | {:>7} | {:>5} | {}",
                    i + 1,
                    b.start,
                    b.end,
                    lines,
                    b.preview.replace('\n', " ")
                );
            }
            println!("\n{} blocks", blocks.len());
            Ok(())
        }
        Commands::Map { file, extract, min_lines } => {
            let raw = load_text(file.as_deref(), extract.as_deref())?;
            let products = heuristics::products_from_text(&raw, min_lines);
            println!("{}", serde_json::to_string_pretty(&products)?);
            Ok(())
        }
        Commands::Template(cmd) => run_template_cmd(cmd),
        Commands::Generate { template, extract, products, format, out, min_lines } => {
            if format != "html" {
                bail!("unsupported format: {} (html only)", format);
            }
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let tpl = db::fetch_template(&conn, &template)?
                .with_context(|| format!("template {} not found", template))?;

            let (records, extract_id) = match (&extract, &products) {
                (Some(id), None) => {
                    let row = db::fetch_extract(&conn, id)?
                        .with_context(|| format!("extract {} not found", id))?;
                    (heuristics::products_from_text(&row.text, min_lines), Some(row.id))
                }
                (None, Some(path)) => {
                    let json = std::fs::read_to_string(path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    (serde_json::from_str::<Vec<model::Product>>(&json)?, None)
                }
                _ => bail!("pass exactly one of --extract or --products"),
            };

            let report = heuristics::validate(&tpl, &records);
            if !report.passed() {
                for v in &report.violations {
                    println!("row {:>3}  missing {}", v.row, v.field);
                }
                bail!(
                    "validation failed: {} missing required fields, batch rejected",
                    report.violations.len()
                );
            }

            let html = render::render_html(&tpl, &records);
            let doc_id =
                db::insert_generated(&conn, &template, extract_id.as_deref(), &format, &html)?;
            if let Some(path) = &out {
                std::fs::write(path, &html)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
            println!("Generated catalog {} ({} products)", doc_id, records.len());
            Ok(())
        }
        Commands::Export { id, out } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let row = db::fetch_generated(&conn, &id)?
                .with_context(|| format!("generated catalog {} not found", id))?;
            match &out {
                Some(path) => {
                    std::fs::write(path, &row.html)
                        .with_context(|| format!("writing {}", path.display()))?;
                    let source = row
                        .extract_id
                        .map(|e| format!(", extract {}", e))
                        .unwrap_or_default();
                    println!(
                        "Wrote {} ({} catalog {}, template {}{})",
                        path.display(),
                        row.format,
                        row.id,
                        row.template_id,
                        source
                    );
                }
                None => print!("{}", row.html),
            }
            Ok(())
        }
        Commands::Run { files, template, out_dir, min_lines } => {
            run_pipeline(&files, &template, &out_dir, min_lines)
        }
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Extracts:  {}", s.extracts);
            println!("Templates: {}", s.templates);
            println!("Generated: {}", s.generated);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn run_template_cmd(cmd: TemplateCmd) -> anyhow::Result<()> {
    match cmd {
        TemplateCmd::Generate { name, persist } => {
            let template = model::Template::new(name);
            if persist {
                let conn = db::connect()?;
                db::init_schema(&conn)?;
                let id = db::upsert_template(&conn, &template)?;
                println!("Stored template {}", id);
            } else {
                println!("{}", serde_json::to_string_pretty(&template)?);
            }
            Ok(())
        }
        TemplateCmd::Persist { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let template: model::Template = serde_json::from_str(&json)?;
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let id = db::upsert_template(&conn, &template)?;
            println!("Stored template {}", id);
            Ok(())
        }
        TemplateCmd::List => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let templates = db::list_templates(&conn)?;
            if templates.is_empty() {
                println!("No templates stored.");
                return Ok(());
            }
            println!("{:<36} | {:<20} | {:<20} | {}", "id", "name", "required", "optional");
            println!("{}", "-".repeat(110));
            for t in &templates {
                println!(
                    "{:<36} | {:<20} | {:<20} | {}",
                    t.id.as_deref().unwrap_or("-"),
                    truncate(&t.name, 20),
                    truncate(&t.required.join(","), 20),
                    t.optional.join(","),
                );
            }
            println!("\n{} templates", templates.len());
            Ok(())
        }
        TemplateCmd::Show { id } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let template = db::fetch_template(&conn, &id)?
                .with_context(|| format!("template {} not found", id))?;
            println!("{}", serde_json::to_string_pretty(&template)?);
            Ok(())
        }
    }
}

/// Decode + map every input in parallel, then store, validate, and render
/// sequentially. A file that fails to decode is skipped, not fatal; a batch
/// that fails validation is rejected whole and produces no catalog.
fn run_pipeline(
    files: &[PathBuf],
    template_id: &str,
    out_dir: &Path,
    min_lines: usize,
) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    if files.is_empty() {
        bail!("no input files");
    }
    let conn = db::connect()?;
    db::init_schema(&conn)?;
    let tpl = db::fetch_template(&conn, template_id)?
        .with_context(|| format!("template {} not found", template_id))?;
    std::fs::create_dir_all(out_dir)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mapped: Vec<_> = files
        .par_iter()
        .map(|path| {
            let outcome = map_file(path, min_lines);
            pb.inc(1);
            (path, outcome)
        })
        .collect();
    pb.finish_and_clear();

    let mut generated = 0usize;
    let mut rejected = 0usize;
    let mut failed = 0usize;

    for (path, outcome) in mapped {
        let filename = display_name(path);
        let (format, text, products) = match outcome {
            Ok(v) => v,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping file");
                failed += 1;
                continue;
            }
        };

        let extract_id = db::insert_extract(&conn, &filename, format.as_str(), &text)?;
        let report = heuristics::validate(&tpl, &products);
        if !report.passed() {
            println!("{}: rejected ({} missing required fields)", filename, report.violations.len());
            for v in &report.violations {
                println!("    row {:>3}  missing {}", v.row, v.field);
            }
            rejected += 1;
            continue;
        }

        let html = render::render_html(&tpl, &products);
        db::insert_generated(&conn, template_id, Some(&extract_id), "html", &html)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| extract_id.clone());
        let out_path = out_dir.join(format!("{}.html", stem));
        std::fs::write(&out_path, &html)
            .with_context(|| format!("writing {}", out_path.display()))?;
        println!("{} -> {} ({} products)", filename, out_path.display(), products.len());
        generated += 1;
    }

    println!("Done: {} generated, {} rejected, {} failed.", generated, rejected, failed);
    Ok(())
}

fn map_file(
    path: &Path,
    min_lines: usize,
) -> anyhow::Result<(ingest::SourceFormat, String, Vec<model::Product>)> {
    let filename = display_name(path);
    let bytes =
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let format = ingest::detect_format(&filename);
    let text = ingest::decode(&bytes, &filename)?;
    let products = heuristics::products_from_text(&text, min_lines);
    Ok((format, text, products))
}

fn read_and_decode(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(ingest::decode(&bytes, &display_name(path))?)
}

fn load_text(file: Option<&Path>, extract: Option<&str>) -> anyhow::Result<String> {
    match (file, extract) {
        (Some(path), None) => read_and_decode(path),
        (None, Some(id)) => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let row = db::fetch_extract(&conn, id)?
                .with_context(|| format!("extract {} not found", id))?;
            Ok(row.text)
        }
        _ => bail!("pass exactly one of --file or --extract"),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
