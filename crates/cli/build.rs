use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("qiitadl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Save Qiita articles as Markdown with local images")
        .arg(clap::arg!(<INPUT> "Article URL, saved HTML file, or '-' for stdin"))
        .arg(
            clap::arg!(-o --output <DIR> "Directory to write the article into")
                .default_value(".")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(--"base-url" <URL> "URL relative image sources are resolved against")
                .default_value("https://qiita.com/"),
        )
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(clap::arg!(--"user-agent" <UA> "Custom User-Agent for HTTP requests"))
        .arg(clap::arg!(--concurrency <NUM> "Images downloaded at once").default_value("4"))
        .arg(clap::arg!(--"no-archive" "Write the article directory only, without the zip archive"))
        .arg(clap::arg!(--json "Print a JSON summary to stdout"))
        .arg(clap::arg!(-v --verbose "Print progress and timings"));

    for shell in [
        clap_complete::Shell::Bash,
        clap_complete::Shell::Zsh,
        clap_complete::Shell::Fish,
        clap_complete::Shell::PowerShell,
    ] {
        clap_complete::generate_to(shell, &mut cmd, "qiitadl", &completions_dir).unwrap();
    }

    println!("cargo:warning=Shell completions generated in: {}", completions_dir.display());
}
