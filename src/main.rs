//! ketto: shows the commits of a Git repository grouped into inferred branches

use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ketto::{
    app::App,
    config::ConfigStore,
    git::{Git2Source, GitSource},
    keybindings::map_key_to_action,
    print::render_text,
    search::search_view,
    service::RepoService,
    tui, ui,
    view::{project, ProjectOptions},
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Parser)]
#[command(name = "ketto", version, about)]
struct Cli {
    /// Repository path (defaults to the current directory)
    path: Option<PathBuf>,

    /// Print the graph to stdout instead of starting the viewer
    #[arg(long)]
    print: bool,

    /// Branches to show when printing, the defaults when empty
    #[arg(short, long = "branch", value_name = "NAME")]
    branches: Vec<String>,

    /// Print the commits matching a text instead of the graph
    #[arg(short, long, value_name = "TEXT")]
    search: Option<String>,

    /// Print without colors
    #[arg(long)]
    no_color: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// Log to stderr when printing, to a file under the cache directory otherwise.
/// Set RUST_LOG=debug for verbose logging.
fn init_logging(print: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if print {
        builder.with_writer(std::io::stderr).init();
        return Ok(());
    }

    let Some(dir) = dirs::cache_dir().map(|d| d.join("ketto")) else {
        // Nowhere to write, the terminal belongs to the viewer
        return Ok(());
    };
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {:?}", dir))?;
    let file = File::create(dir.join("ketto.log")).context("failed to create log file")?;
    builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.print)?;

    let config = match &cli.config {
        Some(path) => ConfigStore::load_from(path.clone()),
        None => ConfigStore::load(),
    };
    let path = match &cli.path {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };
    let git = Git2Source::discover(&path)?;
    info!("Opened repository {:?}", git.repo_path());

    if cli.print {
        print_repo(cli, git, config)
    } else {
        run_viewer(RepoService::new(git, config))
    }
}

fn print_repo(cli: Cli, git: Git2Source, config: ConfigStore) -> Result<()> {
    let options = ProjectOptions {
        elide_synced_locals: config.settings().elide_synced_locals,
        branch_colors: config.repo(git.repo_path()).branch_colors(),
    };
    let service = RepoService::new(git, config);
    let view = service.load()?;
    let aug = service.aug_repo().context("repository not loaded")?;

    let text = if let Some(search) = &cli.search {
        render_text(&search_view(&aug, search), !cli.no_color)
    } else if !cli.branches.is_empty() {
        render_text(&project(&aug, &cli.branches, &options), !cli.no_color)
    } else {
        render_text(&view, !cli.no_color)
    };
    print!("{}", text);
    Ok(())
}

fn run_viewer(service: RepoService<Git2Source>) -> Result<()> {
    // Restore the terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = tui::restore();
        original_hook(panic_info);
    }));

    let mut app = App::new(service);
    app.start();

    let mut terminal = tui::init()?;
    let result = run_loop(&mut terminal, &mut app);

    app.shutdown();
    tui::restore()?;
    result
}

fn run_loop(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    loop {
        app.update_repo();
        app.update_diff_cache();

        terminal.draw(|frame| {
            ui::draw(frame, app);
        })?;

        if app.should_quit {
            return Ok(());
        }

        // Repo changes are drained between polls
        let Some(key) = tui::next_key(POLL_INTERVAL)? else {
            continue;
        };
        if let Some(action) = map_key_to_action(key, &app.mode) {
            if let Err(e) = app.handle_action(action) {
                app.show_error(format!("{}", e));
            }
        }
    }
}
