use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use snappy_cloud_image::cli::{Action, Cli, Settings};
use snappy_cloud_image::cloud::Client;
use snappy_cloud_image::image::store::SnapStore;
use snappy_cloud_image::image::UdfQcow2;
use snappy_cloud_image::process::ShellCommander;
use snappy_cloud_image::{config, logging, pipeline, preflight};

fn main() {
    if let Err(e) = run_main() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run_main() -> Result<()> {
    let cli = Cli::parse();
    let file = config::load_optional(cli.config.as_deref())?;
    let settings = cli.resolve(file).context("invalid options")?;

    logging::initialize_tracing(&settings.log_level)?;
    run(settings)
}

fn run(settings: Settings) -> Result<()> {
    let Settings {
        action, options, ..
    } = settings;
    info!(
        ?action,
        release = %options.release,
        channel = %options.channel,
        arch = %options.arch,
        "starting"
    );

    preflight::check_action(action)?;
    let client = Client::new(ShellCommander);

    match action {
        Action::Latest => {
            let latest = client
                .get_latest_version(&options.release, &options.channel, &options.arch)
                .context("getting latest version")?;
            println!("{latest}");
        }
        Action::Build => {
            let driver = UdfQcow2::new(ShellCommander, SnapStore::new(ShellCommander));
            let built = pipeline::build_next(&client, &driver, &options)?;
            println!("{}", built.path.display());
        }
        Action::Create => {
            let driver = UdfQcow2::new(ShellCommander, SnapStore::new(ShellCommander));
            let name = pipeline::create_and_publish(&client, &driver, &options)?;
            println!("{name}");
        }
    }

    Ok(())
}
