use std::io;
use std::process::ExitCode;

use clap::Parser;
use logseq_roam::{source, util, Cli, MigrationEngine};

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> io::Result<()> {
    let config = cli.config();
    log::debug!("configuration: {:?}", config);

    let notes = source::discover(&cli.input)?;
    let assets = source::AssetDir;
    let output = MigrationEngine::new(&config, &assets).run(notes);

    if cli.dry_run {
        log::info!("dry run: {} files not written", output.files.len());
    } else {
        let written = source::write_outputs(&cli.output, &output.files)?;
        log::info!("wrote {} files to {}", written, util::display_path(&cli.output));
        if !cli.no_assets {
            let copied = source::copy_assets(&cli.input, &cli.output)?;
            log::info!("copied {} assets", copied);
        }
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output.summary)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        println!("{}", json);
    } else {
        print!("{}", output.summary.render_report());
    }

    Ok(())
}
