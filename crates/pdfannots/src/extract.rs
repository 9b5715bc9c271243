use std::io::Write;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use pdf::AnnotatedPdf;
use pdfannots_core::{render_org, OrgOptions, ResolvedAnnotation, Section};
use serde::Serialize;

use crate::prelude::{eprintln, *};

#[derive(Debug, Clone, clap::Args)]
pub struct Options {
    /// PDF files to process
    #[arg(required = true)]
    pub infiles: Vec<PathBuf>,

    /// Show a progress bar while pages are read
    #[arg(short, long)]
    pub progress: bool,

    /// Output file, `-` for stdout (default: one `<name>.org` or `<name>.json` per input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of text columns per page, used to order annotations
    #[arg(short = 'n', long = "cols", env = "PDFANNOTS_COLUMNS", default_value = "2")]
    pub columns: NonZeroUsize,

    /// Sections to print, in this order
    #[arg(
        short,
        long,
        value_enum,
        num_args = 1..,
        default_values = ["highlights", "comments", "nits"]
    )]
    pub sections: Vec<SectionArg>,

    /// Print annotations in reading order instead of grouping them into sections
    #[arg(long)]
    pub no_group: bool,

    /// Print the file name before each document's annotations
    #[arg(long)]
    pub print_filename: bool,

    /// Wrap text at this many columns
    #[arg(short, long, env = "PDFANNOTS_WRAP")]
    pub wrap: Option<usize>,

    /// Output format
    #[arg(long, value_enum, env = "PDFANNOTS_FORMAT", default_value = "org")]
    pub format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Org,
    Json,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Org => "org",
            Format::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SectionArg {
    Highlights,
    Comments,
    Nits,
}

impl From<SectionArg> for Section {
    fn from(arg: SectionArg) -> Self {
        match arg {
            SectionArg::Highlights => Section::Highlights,
            SectionArg::Comments => Section::Comments,
            SectionArg::Nits => Section::Nits,
        }
    }
}

/// Where rendered documents are written.
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    Stdout,
    /// Every document into one file.
    File(PathBuf),
    /// One `<stem>.<ext>` file per input inside this directory.
    PerInput(PathBuf),
}

impl Destination {
    pub fn from_arg(output: Option<&Path>, cwd: PathBuf) -> Self {
        match output {
            Some(path) if path == Path::new("-") => Destination::Stdout,
            Some(path) => Destination::File(path.to_path_buf()),
            None => Destination::PerInput(cwd),
        }
    }
}

/// The annotations read from one input file, in reading order.
#[derive(Debug, Clone)]
pub struct Annotated {
    pub file: PathBuf,
    pub title: Option<String>,
    pub annotations: Vec<ResolvedAnnotation>,
}

#[derive(Debug, Serialize)]
struct JsonDocument<'a> {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    annotations: &'a [ResolvedAnnotation],
}

impl<'a> From<&'a Annotated> for JsonDocument<'a> {
    fn from(doc: &'a Annotated) -> Self {
        JsonDocument {
            file: doc.file.display().to_string(),
            title: doc.title.as_deref(),
            annotations: &doc.annotations,
        }
    }
}

pub fn run(options: Options, global: crate::Global) -> Result<()> {
    let destination = Destination::from_arg(options.output.as_deref(), std::env::current_dir()?);
    process_all(&options, &destination, global.verbose)
}

/// Process every input, write what succeeded, then report failures.
fn process_all(options: &Options, destination: &Destination, verbose: bool) -> Result<()> {
    let total = options.infiles.len();
    let mut documents = Vec::with_capacity(total);
    let mut failed = 0;

    for path in &options.infiles {
        match read_annotations(path, options, verbose) {
            Ok(doc) => documents.push(doc),
            Err(err) => {
                failed += 1;
                eprintln!("{} {:#}", "error:".red().bold(), err);
            }
        }
    }

    write_documents(&documents, destination, options)?;

    if failed > 0 {
        return Err(Error::FailedDocuments { failed, total }.into());
    }

    Ok(())
}

/// Extract and resolve the annotations of one PDF.
pub fn read_annotations(path: &Path, options: &Options, verbose: bool) -> Result<Annotated> {
    let pdf = AnnotatedPdf::open(path).wrap_err_with(|| f!("failed to open {}", path.display()))?;

    let bar = options
        .progress
        .then(|| progress_bar(path, pdf.page_count()));
    let extracted = pdf.extract(|done, _| {
        if let Some(bar) = &bar {
            bar.set_position(done as u64);
        }
    });
    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }
    let extracted = extracted
        .wrap_err_with(|| f!("failed to extract annotations from {}", path.display()))?;

    let annotations = extracted
        .document
        .resolve(options.columns)
        .wrap_err_with(|| f!("invalid annotation in {}", path.display()))?;

    if verbose {
        let stats = extracted.stats;
        eprintln!(
            "{} {}: {} annotation(s) on {} page(s), {} laid out, {} outline(s)",
            "info:".cyan().bold(),
            path.display(),
            annotations.len(),
            stats.pages,
            stats.pages_laid_out,
            stats.outlines
        );
    }

    Ok(Annotated {
        file: path.to_path_buf(),
        title: extracted.document.title,
        annotations,
    })
}

fn progress_bar(path: &Path, pages: usize) -> ProgressBar {
    let bar = ProgressBar::new(pages as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {pos}/{len} pages")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(path.display().to_string());
    bar
}

fn write_documents(
    documents: &[Annotated],
    destination: &Destination,
    options: &Options,
) -> Result<()> {
    match destination {
        Destination::PerInput(dir) => {
            for doc in documents {
                let path = output_path(&doc.file, dir, options.format)?;
                let body = match options.format {
                    Format::Org => render_org_document(doc, options),
                    Format::Json => serde_json::to_string_pretty(&JsonDocument::from(doc))? + "\n",
                };
                std::fs::write(&path, body)
                    .wrap_err_with(|| f!("failed to write {}", path.display()))?;
                log::info!("wrote {}", path.display());
            }
        }
        Destination::File(path) => {
            std::fs::write(path, render_combined(documents, options)?)
                .wrap_err_with(|| f!("failed to write {}", path.display()))?;
        }
        Destination::Stdout => {
            let mut stdout = anstream::stdout();
            stdout.write_all(render_combined(documents, options)?.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// All documents as one output: concatenated org text, or a JSON array.
pub fn render_combined(documents: &[Annotated], options: &Options) -> Result<String> {
    Ok(match options.format {
        Format::Org => documents
            .iter()
            .map(|doc| render_org_document(doc, options))
            .collect(),
        Format::Json => {
            let docs: Vec<JsonDocument> = documents.iter().map(JsonDocument::from).collect();
            serde_json::to_string_pretty(&docs)? + "\n"
        }
    })
}

pub fn render_org_document(doc: &Annotated, options: &Options) -> String {
    let mut out = String::new();
    if options.print_filename && !doc.annotations.is_empty() {
        out.push_str(&f!("# File: {}\n\n", doc.file.display()));
    }
    out.push_str(&render_org(&doc.annotations, &org_options(doc, options)));
    out
}

fn org_options(doc: &Annotated, options: &Options) -> OrgOptions {
    let mut sections: Vec<Section> = Vec::with_capacity(options.sections.len());
    for section in options.sections.iter().copied().map(Section::from) {
        if !sections.contains(&section) {
            sections.push(section);
        }
    }

    OrgOptions {
        wrap: options.wrap.filter(|w| *w > 0),
        sections,
        group: !options.no_group,
        title: doc.title.clone(),
    }
}

/// `<dir>/<input stem>.<ext>`
pub fn output_path(input: &Path, dir: &Path, format: Format) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| Error::OutputName(input.display().to_string()))?;

    let mut name = stem.to_os_string();
    name.push(".");
    name.push(format.extension());
    Ok(dir.join(name))
}
