use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use clap::{Arg, ArgAction, Command, value_parser};
use context_lingo::PassReport;
use context_lingo::dom::Document;
use context_lingo_sync::{
    CatalogStore, HttpCatalogSource, Settings, parse_percentage, start_session,
    start_session_with_refresh,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("context-lingo")
        .version("0.1.0")
        .about("Swap known phrases in an HTML document for their target-language variants")
        .arg(
            Arg::new("input")
                .help("HTML file to process, or - for stdin")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("catalog")
                .long("catalog")
                .short('c')
                .help("Catalog snapshot (default: catalog.json)")
                .default_value("catalog.json"),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .short('s')
                .help("Settings JSON file"),
        )
        .arg(
            Arg::new("percentage")
                .long("percentage")
                .short('p')
                .help("Share of matches to replace, 0-100")
                .value_parser(parse_percentage),
        )
        .arg(
            Arg::new("username")
                .long("username")
                .short('u')
                .help("User identifier sent with catalog refreshes"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Seed for reproducible sampling and substitution")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("append")
                .long("append")
                .short('a')
                .help("HTML fragment appended to the body after the initial pass (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Write the result here instead of stdout"),
        )
        .arg(
            Arg::new("refresh")
                .long("refresh")
                .short('r')
                .help("Refresh the catalog snapshot from the remote endpoint")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log every substitution decision")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    let input = matches
        .get_one::<String>("input")
        .ok_or("missing input")?;
    let catalog_path = matches
        .get_one::<String>("catalog")
        .ok_or("missing catalog path")?;

    // 1. Settings: file, then environment, then flags
    let mut settings = Settings::load(matches.get_one::<String>("settings").map(Path::new))?;
    if let Some(username) = matches.get_one::<String>("username") {
        settings.username = username.clone();
    }
    if let Some(&percentage) = matches.get_one::<u8>("percentage") {
        settings.replacement_percentage = percentage;
    }

    // 2. Session over the current snapshot; a refresh only starts once it is loaded
    let store = CatalogStore::new(catalog_path);
    let seed = matches.get_one::<u64>("seed").copied();
    let (mut session, refresh) = if matches.get_flag("refresh") {
        let source = Arc::new(HttpCatalogSource::new(&settings.catalog_url)?);
        let (session, refresh) = start_session_with_refresh(&store, &settings, seed, source)?;
        (session, Some(refresh))
    } else {
        (start_session(&store, &settings, seed)?, None)
    };

    // 3. Initial pass
    let html = if input == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)
            .map_err(|e| format!("Failed to read '{}': {}", input, e))?
    };
    let mut doc = Document::parse(&html);
    let mut total = session.run_initial_pass(&mut doc);

    // 4. Later insertions go through the mutation watcher
    if let Some(fragments) = matches.get_many::<String>("append") {
        for fragment in fragments {
            let body = doc.body();
            doc.append_html(body, fragment)?;
            total.merge(session.settle(&mut doc));
        }
    }

    // 5. Output
    let result = doc.inner_html(doc.root());
    match matches.get_one::<String>("output") {
        Some(path) => fs::write(path, &result)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(result.as_bytes())?;
            stdout.flush()?;
        }
    }
    log_summary(&total);

    if let Some(handle) = refresh {
        handle.await?;
    }

    Ok(())
}

fn log_summary(report: &PassReport) {
    info!(
        "{} region(s): {} substituted, {} kept, {} unresolved, {} skipped",
        report.regions,
        report.substituted,
        report.kept,
        report.unresolved,
        report.skipped_regions
    );
}
