use std::io::BufRead;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tracing_subscriber::EnvFilter;
use url::Url;

use podguid::{
    ApiClient, Clipboard, DEFAULT_BASE_URL, Event, Fetch, HttpClient, Message, ReqwestClient,
    SelectionState, Session, SessionOptions, SystemClipboard,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static KEY: Emoji<'_, '_> = Emoji("🔑 ", "[k] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static CLIPBOARD: Emoji<'_, '_> = Emoji("📋 ", "[c] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");

/// Browse Podigee podcasts and copy episode GUIDs to the clipboard
#[derive(Parser, Debug)]
#[command(name = "podguid")]
#[command(about = "Browse Podigee podcasts and copy episode GUIDs to the clipboard")]
#[command(version)]
struct Args {
    /// Podigee API key (prompted for when omitted)
    #[arg(short, long, env = "PODIGEE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Base URL of the Podigee API
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: Url,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

type AppSession = Session<ReqwestClient, SystemClipboard>;

/// A line typed by the user, interpreted against the current screen
#[derive(Debug, PartialEq, Eq)]
enum Command {
    ChangeKey,
    Back,
    Reload,
    Pick(usize),
    Unknown,
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    match line {
        "x" => Command::ChangeKey,
        "b" => Command::Back,
        "r" => Command::Reload,
        _ => match line.parse::<usize>() {
            Ok(n) if n > 0 => Command::Pick(n - 1),
            _ => Command::Unknown,
        },
    }
}

/// Terminal rendering of the session
struct View {
    spinner: Option<ProgressBar>,
}

impl View {
    fn new() -> Self {
        Self { spinner: None }
    }

    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn start_spinner(&mut self, message: &str) {
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    /// Redraw the current screen, or show a spinner while data is loading
    fn refresh(&mut self, session: &AppSession) {
        self.stop_spinner();

        match session.state() {
            SelectionState::Unauthenticated => {
                println!("\n{KEY}Enter your Podigee API key ({} to quit):", "q".cyan());
            }

            SelectionState::Authenticated {
                credential,
                podcasts,
            } => {
                println!("\n{KEY}API key: {}", credential.masked().dimmed());
                match podcasts {
                    Fetch::Pending { .. } => self.start_spinner("Loading podcasts..."),
                    Fetch::Failed(error) => print_error(&error.to_string()),
                    Fetch::Ready(podcasts) if podcasts.is_empty() => {
                        println!("  {}", "No podcasts found".yellow());
                    }
                    Fetch::Ready(podcasts) => {
                        for (index, podcast) in podcasts.iter().enumerate() {
                            println!("  {:>3}  {}", (index + 1).to_string().cyan(), podcast.title);
                        }
                    }
                }
                if !podcasts.is_pending() {
                    print_hint("number: select podcast • r: reload • x: change API key • q: quit");
                }
            }

            SelectionState::PodcastSelected {
                credential,
                podcast,
                episodes,
                ..
            } => {
                println!("\n{KEY}API key: {}", credential.masked().dimmed());
                println!("{HEADPHONES}Podcast: {}", podcast.title.bold().green());
                match episodes {
                    Fetch::Pending { .. } => self.start_spinner("Loading episodes..."),
                    Fetch::Failed(error) => print_error(&error.to_string()),
                    Fetch::Ready(episodes) if episodes.is_empty() => {
                        println!("  {}", "No episodes found".yellow());
                    }
                    Fetch::Ready(episodes) => {
                        println!(
                            "  {:>3}  {:>8}  {:<40}  {}",
                            "#".dimmed(),
                            "ID".dimmed(),
                            "Title".dimmed(),
                            "GUID".dimmed()
                        );
                        for (index, episode) in episodes.iter().enumerate() {
                            println!(
                                "  {:>3}  {:>8}  {:<40}  {}",
                                (index + 1).to_string().cyan(),
                                episode.id,
                                truncate_title(&episode.title, 40),
                                episode.guid.yellow()
                            );
                        }
                    }
                }
                if !episodes.is_pending() {
                    print_hint(
                        "number: copy GUID • b: back to podcasts • r: reload • x: change API key • q: quit",
                    );
                }
            }
        }
    }

    fn show_notification(&self, session: &AppSession) {
        if let Some(notification) = session.notification() {
            println!("{CLIPBOARD}{}", notification.text.green());
        }
    }
}

fn print_error(message: &str) {
    println!("  {FAILURE}{}", message.red());
}

fn print_hint(hint: &str) {
    println!("{}", hint.dimmed());
}

fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        title.to_string()
    } else {
        let cut: String = title.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

/// Apply a typed line; returns `false` when the user wants to quit
///
/// On the key prompt the whole line is the API key, whatever it looks like.
fn handle_line<C, K>(session: &mut Session<C, K>, line: &str) -> bool
where
    C: HttpClient + 'static,
    K: Clipboard + 'static,
{
    let line = line.trim();
    if matches!(line, "q" | "quit") {
        return false;
    }

    if matches!(session.state(), SelectionState::Unauthenticated) {
        session.dispatch(Event::SubmitCredential(line.to_string()));
        return true;
    }

    let command = parse_command(line);
    match session.state() {
        SelectionState::Unauthenticated => {}

        SelectionState::Authenticated { podcasts, .. } => match command {
            Command::Pick(index) => {
                let id = podcasts.ready().and_then(|p| p.get(index)).map(|p| p.id);
                match id {
                    Some(id) => session.dispatch(Event::SelectPodcast(id)),
                    None => print_error("No podcast with that number"),
                }
            }
            Command::ChangeKey => session.dispatch(Event::ResetCredential),
            Command::Reload => session.dispatch(Event::Reload),
            _ => {}
        },

        SelectionState::PodcastSelected { .. } => match command {
            Command::Pick(index) => {
                let id = session
                    .state()
                    .episodes()
                    .and_then(|episodes| episodes.get(index))
                    .map(|episode| episode.id);
                if !id.is_some_and(|id| session.copy_guid(id)) {
                    print_error("No episode with that number");
                }
            }
            Command::Back => session.dispatch(Event::ResetPodcast),
            Command::ChangeKey => session.dispatch(Event::ResetCredential),
            Command::Reload => session.dispatch(Event::Reload),
            _ => {}
        },
    }
    true
}

/// Read stdin lines on a dedicated thread; the channel closes on EOF
fn spawn_input_reader() -> UnboundedReceiver<String> {
    let (sender, receiver) = unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if sender.send(line).is_err() {
                break;
            }
        }
    });
    receiver
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "podguid=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    println!(
        "\n{}{} {}",
        MICROPHONE,
        "podguid".bold().magenta(),
        "- Podigee GUID Browser".dimmed()
    );

    let http = ReqwestClient::with_client(
        reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?,
    );
    let api = ApiClient::with_base_url(http, args.base_url.as_str());
    let mut session = Session::new(api, SystemClipboard, SessionOptions::default());

    if let Some(token) = args.token {
        session.dispatch(Event::SubmitCredential(token));
    }

    let mut input = spawn_input_reader();
    let mut view = View::new();
    view.refresh(&session);

    loop {
        tokio::select! {
            line = input.recv() => {
                let Some(line) = line else { break };
                if !handle_line(&mut session, &line) {
                    break;
                }
                view.refresh(&session);
            }
            Some(message) = session.next_message() => {
                let was_loading = session.state().is_loading();
                let copied = matches!(message, Message::Copied { .. });
                session.apply(message);

                if copied {
                    view.show_notification(&session);
                } else if was_loading && !session.state().is_loading() {
                    view.refresh(&session);
                }
            }
        }
    }

    view.stop_spinner();
    Ok(())
}
