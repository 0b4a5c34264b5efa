use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use formbind_config::{ConfigStore as _, FsConfigStore};
use tracing_subscriber::EnvFilter;

/// Submit a form of a page config and print the rendered result.
///
/// Exits with a non-zero status if the submission failed.
#[derive(Parser, Debug)]
#[command(name = "formbind-submit", version)]
struct Args {
    /// Page config file (.json, .yaml or .yml), or the name of a stored page.
    #[arg(long, short)]
    page: String,

    /// Directory of stored pages. Defaults to `~/.config/formbind`.
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Store the page under its name, so later runs can refer to it by name.
    #[arg(long)]
    save: bool,

    /// Transport URI. Overrides the endpoint of the page.
    ///
    /// eg: http://localhost:8777, memory://
    #[arg(long, short)]
    endpoint: Option<String>,

    /// List the forms of the page and exit.
    #[arg(long)]
    list: bool,

    /// Action of the form to submit.
    #[arg(required_unless_present_any = ["list", "save"])]
    action: Option<String>,

    /// Input values as name=value, replacing the page defaults.
    #[arg(value_parser = formbind_demos::parse_assignment)]
    values: Vec<(String, String)>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<ExitCode, anyhow::Error> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let store = match args.config_dir {
        Some(dir) => FsConfigStore::new(dir),
        None => FsConfigStore::new_default()?,
    };
    let page = rt.block_on(formbind_demos::resolve_page(&store, &args.page))?;

    if args.save {
        let saved = rt.block_on(store.save_page(page.clone()))?;
        if let Some(source) = &saved.source {
            eprintln!("saved page '{}' to {}", page.name, source);
        }
    }
    if args.list {
        print!("{}", formbind_demos::describe_page(&page));
        return Ok(ExitCode::SUCCESS);
    }
    let Some(action) = args.action else {
        return Ok(ExitCode::SUCCESS);
    };

    let endpoint = args
        .endpoint
        .or_else(|| page.endpoint.clone())
        .unwrap_or_else(|| formbind_demos::DEFAULT_ENDPOINT.to_string());
    tracing::info!(%endpoint, %action, "submitting");

    // The HTTP client needs a tokio context; the binder itself runs on a
    // local executor.
    let _guard = rt.enter();
    let transport = formbind_demos::build_transport(&endpoint)?;
    let outcome = formbind_demos::submit_form(&page, transport, &action, &args.values)?;

    println!("{}", outcome.view.text);
    if outcome.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
