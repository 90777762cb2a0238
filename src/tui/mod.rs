pub mod app;
pub mod event;
pub mod layout;

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::app::Result;
use crate::cli::RunSettings;
use crate::fetcher::HttpPageSource;
use crate::i18n;
use crate::pipeline;
use crate::store::SqliteStore;

use self::app::{ActivePane, TuiApp};
use self::event::{Action, AppEvent, EventHandler};

type Tui = Terminal<CrosstermBackend<Stdout>>;

pub async fn run(store: Arc<SqliteStore>, settings: RunSettings) -> Result<()> {
    // Build the source and run the first pipeline pass before touching the
    // terminal, so auth/config failures print as plain errors.
    let source = HttpPageSource::new(&settings.creds, &settings.fetch)?;
    let initial = pipeline::run_pipeline(
        store.as_ref(),
        &source,
        &settings.creds,
        &settings.fetch,
        &settings.filter,
        &settings.cache,
        None,
    )
    .await?;

    let mut tui_app = TuiApp::new();
    tui_app.set_groups(initial.groups);
    if let Some(warning) = initial.warnings.first() {
        tui_app.set_status(warning.clone());
    }

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut tui_app, &store, &source, &settings).await;
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app(
    terminal: &mut Tui,
    tui_app: &mut TuiApp,
    store: &Arc<SqliteStore>,
    source: &HttpPageSource,
    settings: &RunSettings,
) -> Result<()> {
    let event_handler = EventHandler::new(Duration::from_millis(100));

    loop {
        terminal.draw(|frame| layout::render(frame, tui_app))?;

        match event_handler.next()? {
            AppEvent::Key(key) => match Action::from(key) {
                Action::Quit => {
                    tui_app.should_quit = true;
                }
                Action::MoveUp => {
                    tui_app.move_up();
                }
                Action::MoveDown => {
                    tui_app.move_down();
                }
                Action::NextPane => {
                    tui_app.active_pane = tui_app.active_pane.next();
                }
                Action::PrevPane => {
                    tui_app.active_pane = tui_app.active_pane.prev();
                }
                Action::Select => {
                    if tui_app.active_pane == ActivePane::Creators
                        && tui_app.selected_group().is_some()
                    {
                        tui_app.active_pane = ActivePane::Posts;
                    }
                }
                Action::Summarize => {
                    let Some(group) = tui_app.selected_group().cloned() else {
                        continue;
                    };
                    tui_app.is_busy = true;
                    tui_app.set_status(i18n::t("tui_summarizing"));
                    terminal.draw(|frame| layout::render(frame, tui_app))?;

                    let (result, warning) =
                        pipeline::get_summary(&group, &settings.summary).await;
                    tui_app.summary = Some(result);
                    tui_app.is_busy = false;
                    tui_app.status_message = warning
                        .map(|reason| i18n::tf("summary_warning", &[("reason", reason)]));
                    tui_app.active_pane = ActivePane::Preview;
                    tui_app.preview_scroll = 0;
                }
                Action::OpenInBrowser => {
                    let url = tui_app.selected_post().map(|p| p.url.clone());
                    if let Some(url) = url.filter(|u| !u.is_empty()) {
                        if let Err(e) = open::that(&url) {
                            tui_app.set_status(format!("Failed to open browser: {e}"));
                        }
                    }
                }
                Action::Refresh => {
                    tui_app.is_busy = true;
                    tui_app.set_status(i18n::t("tui_refreshing"));
                    terminal.draw(|frame| layout::render(frame, tui_app))?;

                    match pipeline::run_pipeline(
                        store.as_ref(),
                        source,
                        &settings.creds,
                        &settings.fetch,
                        &settings.filter,
                        &settings.cache,
                        None,
                    )
                    .await
                    {
                        Ok(output) => {
                            tui_app.set_groups(output.groups);
                            tui_app.summary = None;
                            tui_app.status_message = output.warnings.into_iter().next();
                        }
                        Err(e) => {
                            tui_app.set_status(e.to_string());
                        }
                    }
                    tui_app.is_busy = false;
                }
                Action::None => {}
            },
            AppEvent::Tick => {}
        }

        if tui_app.should_quit {
            break;
        }
    }

    Ok(())
}
