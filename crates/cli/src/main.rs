mod echo;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use qiitadl_core::{
    ExtractConfig, FetchConfig, Fetcher, PipelineConfig, PreparedArticle, QIITA_DOMAIN, build_package, fetch_file,
    prepare_article, prepare_article_from_html, validate_article_url, write_article_tree,
};
use serde_json::json;
use url::Url;

use crate::echo::{
    format_size, print_banner, print_detail, print_step, print_success, print_timing_summary, print_warning,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Save a Qiita article as Markdown with its images, packed into a zip archive
#[derive(Parser, Debug)]
#[command(name = "qiitadl")]
#[command(version)]
#[command(about = "Save Qiita articles as Markdown with local images", long_about = None)]
struct Args {
    /// Article URL, saved HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Directory to write the article into
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    output: PathBuf,

    /// URL relative image sources are resolved against (file and stdin input)
    #[arg(long, default_value = "https://qiita.com/", value_name = "URL")]
    base_url: String,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Images downloaded at once
    #[arg(long, default_value = "4", value_name = "NUM")]
    concurrency: usize,

    /// Write the article directory only, without the zip archive
    #[arg(long)]
    no_archive: bool,

    /// Print a JSON summary to stdout
    #[arg(long)]
    json: bool,

    /// Print progress and timings
    #[arg(short, long)]
    verbose: bool,
}

enum Input {
    Url(Url),
    File(String),
    Stdin,
}

impl Input {
    fn from_arg(arg: &str) -> anyhow::Result<Self> {
        if arg == "-" {
            Ok(Self::Stdin)
        } else if arg.starts_with("http://") || arg.starts_with("https://") {
            let url = validate_article_url(arg, QIITA_DOMAIN).context("Not a Qiita article URL")?;
            Ok(Self::Url(url))
        } else {
            Ok(Self::File(arg.to_string()))
        }
    }
}

async fn prepare(
    input: &Input, args: &Args, fetcher: &Fetcher, config: &PipelineConfig,
) -> anyhow::Result<PreparedArticle> {
    match input {
        Input::Url(url) => prepare_article(fetcher, url, config).await.context("Failed to download article"),
        Input::File(path) => {
            let base = Url::parse(&args.base_url).context("Invalid --base-url")?;
            let source = fetch_file(path, base).with_context(|| format!("Failed to read file: {}", path))?;
            prepare_article_from_html(&source.html(), &source.url, fetcher, config)
                .await
                .context("Failed to extract article")
        }
        Input::Stdin => {
            let base = Url::parse(&args.base_url).context("Invalid --base-url")?;
            let mut html = String::new();
            io::stdin().read_to_string(&mut html).context("Failed to read from stdin")?;
            prepare_article_from_html(&html, &base, fetcher, config)
                .await
                .context("Failed to extract article")
        }
    }
}

fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let started = Instant::now();
    let mut timings = Vec::new();

    if args.verbose {
        print_banner();
    }

    let input = Input::from_arg(&args.input)?;
    let fetch_config = FetchConfig {
        timeout: args.timeout,
        user_agent: args.user_agent.clone().unwrap_or_else(|| FetchConfig::default().user_agent),
        ..Default::default()
    };
    let fetcher = Fetcher::new(fetch_config).context("Failed to build HTTP client")?;
    let config = PipelineConfig {
        extract: ExtractConfig { asset_concurrency: args.concurrency, ..Default::default() },
        ..Default::default()
    };

    if args.verbose {
        let source = match &input {
            Input::Url(url) => format!("Fetching {}", url.as_str().bright_white().underline()),
            Input::File(path) => format!("Reading {}", path.bright_white()),
            Input::Stdin => "Reading from stdin".to_string(),
        };
        print_step(1, 2, &source);
    }

    let step = Instant::now();
    let prepared = prepare(&input, &args, &fetcher, &config).await?;
    timings.push(("Extract", step.elapsed()));

    if args.verbose {
        print_detail("Title", &prepared.title);
        print_detail("Images", &prepared.assets.len().to_string());
        eprintln!();
        print_step(2, 2, &format!("Writing to {}", args.output.display()));
    }

    for url in &prepared.unresolved {
        print_warning(&format!("Could not download image, keeping remote URL: {}", url));
    }

    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory: {}", args.output.display()))?;

    let step = Instant::now();
    let (tree, archive_path) = if args.no_archive {
        let tree = write_article_tree(&args.output, &prepared.title, &prepared.markdown, &prepared.assets)
            .context("Failed to write article")?;
        (tree, None)
    } else {
        let package = build_package(&args.output, &prepared.title, &prepared.markdown, &prepared.assets)
            .context("Failed to package article")?;
        (package.tree, Some(package.archive_path))
    };
    timings.push(("Write", step.elapsed()));

    if args.json {
        let summary = json!({
            "title": prepared.title,
            "markdown_path": tree.markdown_path,
            "images_dir": tree.images_dir,
            "images": tree.image_count,
            "unresolved": prepared.unresolved,
            "archive_path": archive_path,
        });
        println!("{}", serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?);
    }

    match &archive_path {
        Some(path) => print_success(&format!(
            "Saved {} ({})",
            path.display().bright_white(),
            format_size(file_size(path))
        )),
        None => print_success(&format!("Saved {}", tree.article_dir.display().bright_white())),
    }

    if args.verbose {
        eprintln!();
        print_timing_summary(started.elapsed(), &timings);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_kinds() {
        assert!(matches!(Input::from_arg("-").unwrap(), Input::Stdin));
        assert!(matches!(Input::from_arg("page.html").unwrap(), Input::File(_)));
        assert!(matches!(Input::from_arg("https://qiita.com/alice/items/abc").unwrap(), Input::Url(_)));
        assert!(Input::from_arg("https://example.com/alice/items/abc").is_err());
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["qiitadl", "page.html"]).unwrap();

        assert_eq!(args.output, PathBuf::from("."));
        assert_eq!(args.base_url, "https://qiita.com/");
        assert_eq!(args.concurrency, 4);
        assert!(!args.no_archive);
    }
}
