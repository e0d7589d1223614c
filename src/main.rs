use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::error;

use sessiontron::config::{config_schema, load_config};
use sessiontron::gateway::IdentityProviderGateway;
use sessiontron::prompt::ConsolePrompt;
use sessiontron::store::create_store;
use sessiontron::utils::logger::init_logging;
use sessiontron::utils::value::value_to_string;
use sessiontron::{AuthSession, Session, SessionStatus};

#[derive(Parser)]
#[command(version, about = "Sign in to an OAuth2 identity provider with PKCE and keep the session")]
struct Cli {
    /// Path to the YAML configuration.
    #[arg(short, long, default_value = "./config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in through the provider's authorization page.
    Login {
        /// Print the authorization URL instead of opening a browser.
        #[arg(long)]
        no_browser: bool,
    },
    /// Forget the stored session.
    Logout,
    /// Show the current session.
    Status,
    /// Print the access token; exits non-zero when signed out.
    Token,
    /// Print the configuration JSON schema.
    Schema,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Command::Schema = cli.command {
        println!("{}", config_schema());
        return ExitCode::SUCCESS;
    }

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let gateway = match IdentityProviderGateway::new(&config.provider) {
        Ok(gateway) => gateway,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let open_browser = !matches!(cli.command, Command::Login { no_browser: true });
    let session = AuthSession::new(
        gateway,
        Arc::new(ConsolePrompt::new(open_browser)),
        create_store(&config.store),
    );
    session.restore_session().await;

    match cli.command {
        Command::Login { .. } => match session.login().await {
            Ok(snapshot) => {
                print_session(&snapshot);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Login failed: {}", e);
                ExitCode::FAILURE
            }
        },
        Command::Logout => match session.logout().await {
            Ok(()) => {
                println!("Logged out.");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Logged out, but {}", e);
                ExitCode::FAILURE
            }
        },
        Command::Status => {
            print_session(&session.snapshot());
            ExitCode::SUCCESS
        }
        Command::Token => match session.get_access_token() {
            Some(token) => {
                println!("{}", token);
                ExitCode::SUCCESS
            }
            None => {
                eprintln!("Not logged in.");
                ExitCode::FAILURE
            }
        },
        Command::Schema => ExitCode::SUCCESS,
    }
}

fn print_session(session: &Session) {
    println!("status: {:?}", session.status);
    if let Some(error) = &session.error {
        println!("error: {}", error);
    }
    if session.status != SessionStatus::Authenticated {
        return;
    }
    if let Some(user) = &session.user {
        for (key, value) in user.attributes() {
            println!("{}: {}", key, value_to_string(value));
        }
    }
}
