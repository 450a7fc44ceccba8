use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use medassyst::chat::{ControllerContext, RevealEngine};
use medassyst::config::{Config, Theme};
use medassyst::gateway::ChatGateway;
use medassyst::notify::ConsoleNotifier;
use medassyst::session::SessionStore;
use medassyst::stats::Period;
use medassyst::ui::{self, Palette, format_chat_list};

#[derive(Parser)]
#[command(name = "medassyst")]
#[command(version = "0.1.0")]
#[command(about = "Terminal client for the MedAssyst medical consultation assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive consultation (default)
    Chat,
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account
    Register {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// List your consultations
    Chats,
    /// Show usage statistics (admins only)
    Stats {
        #[arg(long, default_value = "month", value_parser = parse_period)]
        period: Period,
    },
    /// Switch the color theme
    Theme { theme: String },
}

fn parse_period(value: &str) -> Result<Period, String> {
    Period::from_str(value).map_err(|_| format!("unknown period '{}', expected day, week, month or year", value))
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line).context("Failed to read input")?;
    Ok(line.trim().to_string())
}

fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => prompt(label),
    }
}

/// Like `value_or_prompt`, but the typed input is read through `read_hidden`
/// so it never echoes
fn secret_or_prompt<F>(value: Option<String>, read_hidden: F) -> Result<String>
where
    F: FnOnce(&str) -> std::io::Result<String>,
{
    match value {
        Some(value) => Ok(value),
        None => read_hidden("Password: ").context("Failed to read password"),
    }
}

fn password_or_prompt(value: Option<String>) -> Result<String> {
    secret_or_prompt(value, |label| rpassword::prompt_password(label))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    init_tracing(&config);

    let palette = Palette::for_theme(config.ui.theme);
    let mut session = SessionStore::new(&config)?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Login { email, password } => {
            let email = value_or_prompt(email, "Email")?;
            let password = password_or_prompt(password)?;
            let identity = session.login(&email, &password).await?;
            println!("✅ Signed in as {}", identity.display_name);
        }
        Commands::Register { name, email, password } => {
            let name = value_or_prompt(name, "Name")?;
            let email = value_or_prompt(email, "Email")?;
            let password = password_or_prompt(password)?;
            let identity = session.register(&name, &email, &password).await?;
            println!("✅ Account created for {}", identity.display_name);
        }
        Commands::Logout => {
            session.logout()?;
            println!("👋 Signed out");
        }
        Commands::Theme { theme } => {
            let theme = Theme::from_str(&theme.to_lowercase())
                .map_err(|_| anyhow::anyhow!("unknown theme '{}', expected dark or light", theme))?;
            config.ui.theme = theme;
            config.save()?;
            println!("🎨 Theme set to {}", theme.as_ref());
        }
        Commands::Whoami => match session.bootstrap(&config).await? {
            Some(identity) => println!(
                "{} <{}> ({:?})",
                identity.display_name,
                identity.email.as_deref().unwrap_or("no email"),
                identity.role
            ),
            None => println!("Not signed in. Run 'medassyst login' first."),
        },
        Commands::Chats => {
            let Some(identity) = session.bootstrap(&config).await?.cloned() else {
                bail!("Not signed in. Run 'medassyst login' first.");
            };
            let client = session.client().context("No authenticated client")?;
            let chats = client
                .list_chats(&identity)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("Could not load chat history")))?;
            print!("{}", format_chat_list(&chats, None));
        }
        Commands::Stats { period } => {
            if session.bootstrap(&config).await?.is_none() {
                bail!("Not signed in. Run 'medassyst login' first.");
            }
            if !session.is_admin() {
                bail!("Statistics are available to administrators only");
            }
            let client = session.client().context("No authenticated client")?;
            ui::run_stats(client, period, palette).await?;
        }
        Commands::Chat => {
            let Some(identity) = session.bootstrap(&config).await?.cloned() else {
                bail!("Not signed in. Run 'medassyst login' or 'medassyst register' first.");
            };
            let client = session.client().context("No authenticated client")?;

            // Admins land on the statistics screen instead of the chat
            if identity.is_admin() {
                return ui::run_stats(client, Period::default(), palette).await;
            }

            let context = ControllerContext {
                gateway: Arc::new(client.clone()),
                notifier: Arc::new(ConsoleNotifier),
                identity,
                engine: RevealEngine::new(&config.reveal),
            };
            ui::run_chat(context, palette).await?;
        }
    }

    Ok(())
}
