use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};

use kennel::controller::Controller;
use kennel::domain::{AppConfig, DEFAULT_API_URL, KennelError};
use kennel::entity::{EntityKind, EntityProfile};
use kennel::logging;
use kennel::model::{Model, Status};
use kennel::paginator::DEFAULT_PAGE_SIZES;
use kennel::session::Session;
use kennel::source::{FileSource, HttpSource, RecordSource};
use kennel::table::TableController;
use kennel::ui::TableUI;

#[derive(Parser, Debug)]
#[command(version, about = "Browse, filter and export shelter records in the terminal.")]
struct Args {
    /// Which list to open.
    #[arg(short, long, value_enum, default_value_t = EntityKind::Animals)]
    entity: EntityKind,

    /// Base url of the shelter api.
    #[arg(short, long, env = "KENNEL_API_URL")]
    url: Option<String>,

    /// Read records from a local json, csv, parquet or arrow file instead of the api.
    #[arg(short, long)]
    file: Option<String>,

    #[arg(long, default_value = ".")]
    export_dir: String,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZES[0])]
    page_size: usize,

    /// Widest column of the document export.
    #[arg(long, default_value_t = 40)]
    max_column_width: usize,

    #[arg(long, default_value = "kennel.log")]
    log_file: String,

    #[arg(long, default_value = "~/.kennel-session.json")]
    session_file: String,

    /// Log in as this user before starting.
    #[arg(long)]
    user: Option<String>,

    /// Remove the stored session and exit.
    #[arg(long)]
    logout: bool,
}

fn expand_path(path: &str) -> Result<PathBuf, KennelError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| KennelError::Config(format!("{path}: {e}")))
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            error!("Exiting with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: Args) -> Result<(), KennelError> {
    logging::init(&expand_path(&args.log_file)?, logging::DEFAULT_FILTER)?;
    info!("Starting kennel {:?}", args);

    let config = AppConfig::default()
        .page_size(args.page_size)
        .max_column_width(args.max_column_width)
        .export_dir(expand_path(&args.export_dir)?)
        .session_file(expand_path(&args.session_file)?);

    let mut session = Session::init(&config.session_file)?;
    if args.logout {
        session.teardown()?;
        println!("Logged out.");
        return Ok(());
    }
    if let Some(user) = args.user {
        session.login(user)?;
    }

    let profile = EntityProfile::for_kind(args.entity);
    let source: Box<dyn RecordSource> = match (args.file, args.url) {
        (Some(file), _) => Box::new(FileSource::new(expand_path(&file)?)),
        (None, url) => Box::new(HttpSource::new(
            url.as_deref().unwrap_or(DEFAULT_API_URL),
            profile.path,
        )?),
    };
    let table = TableController::new(profile, &config)?;
    let mut model = Model::init(&config, table, source, session);

    let mut terminal = ratatui::init();
    let result = event_loop(&config, &mut model, &mut terminal);
    ratatui::restore();
    result
}

fn event_loop(config: &AppConfig, model: &mut Model, terminal: &mut DefaultTerminal) -> Result<(), KennelError> {
    let mut ui = TableUI::new(config);
    let controller = Controller::new(config);

    while model.status != Status::Quitting {
        // Render the current view
        terminal.draw(|f| ui.draw(model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(model)?;
        model.update(message)?;
    }
    info!("Bye");
    Ok(())
}
