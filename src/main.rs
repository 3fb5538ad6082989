//! ebook – command-line ebook generator.
//!
//! Usage:
//!   ebook <content.json> [-o ebook.pdf] [--config cfg.json] [--engine wkhtmltopdf]
//!
//! Flags override values from the config file, which overrides the defaults.

use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::{Parser, ValueEnum};

use ebook_forge::{
    EbookContent, EbookError, EbookPipeline, EngineKind, Length, Margins, PageSize,
    RenderConfiguration, DEFAULT_OUTPUT,
};

/// Generate a PDF ebook from structured content via a Markdown template
#[derive(Parser, Debug)]
#[command(name = "ebook", version, about)]
struct Cli {
    /// JSON file with `title`, `author` and `chapters`
    content: PathBuf,

    /// Output PDF path
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// JSON render configuration (template dir, stylesheet, page options, engine)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Template directory
    #[arg(long, value_name = "DIR")]
    templates: Option<PathBuf>,

    /// Template file name inside the template directory
    #[arg(long, value_name = "NAME")]
    template: Option<String>,

    /// Stylesheet inlined into the HTML
    #[arg(long, value_name = "FILE", conflicts_with = "no_css")]
    css: Option<PathBuf>,

    /// Render without a stylesheet
    #[arg(long, default_value_t = false)]
    no_css: bool,

    /// Page size (A3, A4, A5, Letter, Legal)
    #[arg(long)]
    page_size: Option<PageSize>,

    /// Margin applied to all four sides, e.g. 10mm or 0.5in
    #[arg(long)]
    margin: Option<Length>,

    /// HTML → PDF engine
    #[arg(long, value_enum)]
    engine: Option<EngineArg>,

    /// Path to the wkhtmltopdf binary (implies --engine wkhtmltopdf)
    #[arg(long, value_name = "PATH")]
    wkhtmltopdf: Option<PathBuf>,

    /// Also write the filled Markdown to this file
    #[arg(long, value_name = "FILE")]
    emit_markdown: Option<PathBuf>,

    /// Also write the complete HTML document to this file
    #[arg(long, value_name = "FILE")]
    emit_html: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineArg {
    Builtin,
    Wkhtmltopdf,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), EbookError> {
    let content = EbookContent::from_json_file(&cli.content)?;
    let config = match &cli.config {
        Some(path) => RenderConfiguration::from_json_file(path)?,
        None => RenderConfiguration::default(),
    };
    let config = apply_overrides(config, &cli);
    let pipeline = EbookPipeline::new(config)?;

    if let Some(path) = &cli.emit_markdown {
        write_text(path, &pipeline.render_markup(&content)?)?;
    }
    if let Some(path) = &cli.emit_html {
        write_text(path, &pipeline.build_html(&content)?)?;
    }

    let report = pipeline.generate(&content, &cli.output)?;
    eprintln!(
        "Wrote '{}' ({} bytes, {} chapter{}, {} engine)",
        report.path.display(),
        report.bytes,
        report.chapters,
        if report.chapters == 1 { "" } else { "s" },
        report.engine
    );
    Ok(())
}

fn apply_overrides(mut config: RenderConfiguration, cli: &Cli) -> RenderConfiguration {
    if let Some(dir) = &cli.templates {
        config.template_dir = dir.clone();
    }
    if let Some(name) = &cli.template {
        config.template_name = name.clone();
    }
    if cli.no_css {
        config.stylesheet = None;
    } else if let Some(css) = &cli.css {
        config.stylesheet = Some(css.clone());
    }
    if let Some(size) = cli.page_size {
        config.page.page_size = size;
    }
    if let Some(margin) = cli.margin {
        config.page.margins = Margins::uniform(margin);
    }
    let use_wkhtmltopdf = match cli.engine {
        Some(EngineArg::Builtin) => false,
        Some(EngineArg::Wkhtmltopdf) => true,
        None => cli.wkhtmltopdf.is_some(),
    };
    if use_wkhtmltopdf {
        let configured = match &config.engine {
            EngineKind::Wkhtmltopdf { program } => program.clone(),
            EngineKind::Builtin => None,
        };
        config.engine = EngineKind::Wkhtmltopdf {
            program: cli.wkhtmltopdf.clone().or(configured),
        };
    } else if cli.engine == Some(EngineArg::Builtin) {
        config.engine = EngineKind::Builtin;
    }
    config
}

fn write_text(path: &Path, text: &str) -> Result<(), EbookError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| EbookError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    fs::write(path, text).map_err(|source| EbookError::Io {
        path: path.to_path_buf(),
        source,
    })
}
