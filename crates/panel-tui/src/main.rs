use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use panel_core::{
    build_turn_taker, filter_interviews, resolve_model, ClaudeClient, Config, InterviewDraft,
    InterviewStats, OllamaClient, OpenAIClient, PanelApi, Provider,
};
use panel_core::ai::ollama::DEFAULT_OLLAMA_URL;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "panel")]
#[command(about = "Run chat-driven expertise evaluations and schedule interviews")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a candidate's skills interactively (default)
    Evaluate(EvaluateArgs),
    /// Show scheduled interviews with pending and completed counts
    Interviews {
        /// Only show interviews whose subject or candidate contains this text
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// List the panel's subject-matter experts
    Experts,
    /// Log in to the panel API and store the token. The password is read
    /// from PANEL_PASSWORD, or from stdin when that is unset
    Login {
        #[arg(short, long)]
        username: String,
    },
    /// List models available to the configured provider
    Models {
        /// Provider to query instead of the configured one
        #[arg(long)]
        provider: Option<String>,
    },
}

#[derive(Args, Default)]
struct EvaluateArgs {
    /// Skills to evaluate, comma separated
    #[arg(short, long, default_value = "")]
    skills: String,
    /// Interview subject
    #[arg(long, default_value = "")]
    subject: String,
    /// Candidate name
    #[arg(short, long, default_value = "")]
    candidate: String,
    /// Interview date (YYYY-MM-DD)
    #[arg(short, long, default_value = "")]
    date: String,
    /// endpoint, ollama, claude or openai
    #[arg(long)]
    provider: Option<String>,
    #[arg(short, long)]
    model: Option<String>,
}

/// Log to a file beside the config; the terminal belongs to the TUI
fn init_logging() -> Result<()> {
    let dir = Config::config_dir()?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("panel.log"))
        .context("Failed to open panel.log")?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_secs()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn resolve_provider(name: Option<&str>, config: &Config) -> Result<Provider> {
    match name {
        Some(name) => Provider::from_str(name).ok_or_else(|| {
            let known: Vec<&str> = Provider::all().iter().map(|p| p.as_str()).collect();
            anyhow!("Unknown provider '{}' (expected one of: {})", name, known.join(", "))
        }),
        None => Provider::from_config(config),
    }
}

fn panel_api(config: &Config) -> Option<PanelApi> {
    let base = config.api_base_url.as_deref()?;
    let token = std::env::var("PANEL_API_TOKEN")
        .ok()
        .or_else(|| config.api_token.clone());
    Some(PanelApi::new(base).with_token(token))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("Logging disabled: {:#}", e);
    }

    let config = Config::load()?;

    match cli.command {
        None => run_tui(EvaluateArgs::default(), config).await,
        Some(Commands::Evaluate(args)) => run_tui(args, config).await,
        Some(Commands::Interviews { search }) => list_interviews(&config, &search).await,
        Some(Commands::Experts) => list_experts(&config).await,
        Some(Commands::Login { username }) => {
            let password = read_password(std::env::var("PANEL_PASSWORD").ok(), io::stdin().lock())?;
            login(config, &username, &password).await
        }
        Some(Commands::Models { provider }) => list_models(provider.as_deref(), &config).await,
    }
}

async fn run_tui(args: EvaluateArgs, config: Config) -> Result<()> {
    let provider = resolve_provider(args.provider.as_deref(), &config)?;
    let taker = build_turn_taker(provider, args.model.as_deref(), &config)?;
    let model = resolve_model(provider, args.model.as_deref(), &config);
    let label = if model.is_empty() {
        provider.display_name().to_string()
    } else {
        format!("{} ({})", provider.display_name(), model)
    };

    let api = panel_api(&config);
    if api.is_none() {
        warn!("api_base_url not set; interviews will not be submitted");
    }

    let draft = InterviewDraft {
        subject: args.subject,
        date: args.date,
        candidate_name: args.candidate,
        required_expertise: args.skills,
    };
    info!("Starting evaluation of {:?} with {}", draft.skills(), label);

    let mut app = App::new(
        draft,
        taker,
        label,
        config.turn_timeout(),
        config.rating_scale()?,
        api,
    );

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;

    if let Some(id) = &app.submitted_id {
        println!("Interview created: {}", id);
    }
    result
}

async fn list_interviews(config: &Config, search: &str) -> Result<()> {
    let api = panel_api(config)
        .ok_or_else(|| anyhow!("No api_base_url configured. Set it in the config file."))?;
    let interviews = api.list_interviews().await?;
    let stats = InterviewStats::from_interviews(&interviews);

    println!(
        "Total: {}  Pending assignments: {}  Completed: {}",
        stats.total, stats.pending_assignments, stats.completed
    );

    if interviews.is_empty() {
        println!("No interviews scheduled. Run `panel evaluate` to create one.");
        return Ok(());
    }

    let shown = filter_interviews(&interviews, search);
    if shown.is_empty() {
        println!("No interviews match '{}'", search);
    }
    for interview in shown {
        println!(
            "  • {}  {} with {} [{}] ({})",
            interview.date,
            interview.subject,
            interview.candidate_name,
            interview.required_expertise,
            interview.status
        );
    }
    Ok(())
}

/// The login password, from the environment or the first line of `input`
fn read_password(from_env: Option<String>, mut input: impl BufRead) -> Result<String> {
    if let Some(password) = from_env.filter(|p| !p.is_empty()) {
        return Ok(password);
    }

    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    input.read_line(&mut line).context("reading password from stdin")?;

    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        return Err(anyhow!("No password given (set PANEL_PASSWORD or pipe it on stdin)"));
    }
    Ok(password.to_string())
}

async fn list_experts(config: &Config) -> Result<()> {
    let api = panel_api(config)
        .ok_or_else(|| anyhow!("No api_base_url configured. Set it in the config file."))?;
    let experts = api.list_experts().await?;

    if experts.is_empty() {
        println!("No experts found");
        return Ok(());
    }

    for expert in experts {
        println!(
            "  • {} ({}, {} years)",
            expert.name, expert.expertise, expert.experience
        );
    }
    Ok(())
}

async fn login(mut config: Config, username: &str, password: &str) -> Result<()> {
    let api = panel_api(&config)
        .ok_or_else(|| anyhow!("No api_base_url configured. Set it in the config file."))?;
    let token = api.login(username, password).await?;

    config.api_token = Some(token);
    config.save()?;
    println!("Logged in as {}", username);
    Ok(())
}

async fn list_models(provider: Option<&str>, config: &Config) -> Result<()> {
    let provider = resolve_provider(provider, config)?;
    println!("Models for {}:", provider.display_name());

    let models = match provider {
        Provider::Ollama => {
            let url = config.ollama_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
            match OllamaClient::new(url).list_models().await {
                Ok(models) => models,
                Err(e) => {
                    println!("Error connecting to Ollama: {:#}", e);
                    println!("Make sure Ollama is running: ollama serve");
                    return Ok(());
                }
            }
        }
        Provider::Claude => ClaudeClient::list_models(),
        Provider::OpenAI => OpenAIClient::list_models(),
        Provider::Endpoint => {
            println!("  The chat endpoint chooses its own model");
            return Ok(());
        }
    };

    if models.is_empty() {
        println!("No models found. Pull a model with: ollama pull llama3.2");
    }
    for model in models {
        println!("  • {}", model);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_prefers_environment() {
        let password = read_password(Some("from-env".to_string()), "from-stdin\n".as_bytes());
        assert_eq!(password.unwrap(), "from-env");
    }

    #[test]
    fn password_falls_back_to_stdin_line() {
        let password = read_password(None, "s3cret pass\r\n".as_bytes()).unwrap();
        assert_eq!(password, "s3cret pass");

        let password = read_password(Some(String::new()), "typed\n".as_bytes()).unwrap();
        assert_eq!(password, "typed");
    }

    #[test]
    fn empty_password_is_rejected() {
        assert!(read_password(None, "\n".as_bytes()).is_err());
        assert!(read_password(None, "".as_bytes()).is_err());
    }

    #[test]
    fn login_takes_no_password_flag() {
        assert!(Cli::try_parse_from(["panel", "login", "-u", "admin", "-p", "x"]).is_err());
        assert!(Cli::try_parse_from(["panel", "login", "-u", "admin"]).is_ok());
        assert!(Cli::try_parse_from(["panel", "interviews", "--search", "sam"]).is_ok());
    }
}
