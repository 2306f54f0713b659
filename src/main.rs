use std::path::PathBuf;

use authgate::app::{App, View};
use authgate::config::{ClientConfig, ConfigError};
use authgate::net::api::ApiError;
use authgate::state::form::{AuthMode, Field, SubmitOutcome};
use authgate::state::session::SessionError;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("form has {0} invalid field(s)")]
    Invalid(usize),
    #[error("{0}")]
    Rejected(String),
    #[error("another submission is already in progress")]
    Busy,
    #[error("not signed in")]
    NotSignedIn,
    #[error("redirect task failed: {0}")]
    Redirect(#[from] tokio::task::JoinError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "authgate", about = "Sign in, sign up and inspect the current session")]
struct Cli {
    #[arg(long, env = "AUTH_API_URL")]
    api_url: Option<String>,

    #[arg(long, env = "AUTH_TOKEN_PATH")]
    token_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Restore the session from the stored token and show the current view.
    Status,
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long, env = "AUTH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "AUTH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    /// Re-fetch the signed-in user.
    Profile,
    /// List every registered user.
    Users,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("authgate=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(token_path) = cli.token_path {
        config.token_path = token_path;
    }

    let app = App::from_config(&config)?;
    let _listener = app.start().await;

    match cli.command {
        Command::Status => {
            print_view(&app.view())?;
            Ok(())
        }
        Command::Signin { email, password } => {
            let values = [(Field::Email, email), (Field::Password, password)];
            run_form(&app, AuthMode::SignIn, values).await
        }
        Command::Signup { name, email, password } => {
            let values = [(Field::Name, name), (Field::Email, email), (Field::Password, password)];
            run_form(&app, AuthMode::SignUp, values).await
        }
        Command::Logout => {
            app.logout().await;
            println!("Logged out");
            Ok(())
        }
        Command::Profile => {
            if !app.session().snapshot().is_authenticated() {
                return Err(CliError::NotSignedIn);
            }
            let user = app.session().fetch_profile().await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
            Ok(())
        }
        Command::Users => {
            let users = app.users().await?;
            println!("{}", serde_json::to_string_pretty(&users)?);
            Ok(())
        }
    }
}

async fn run_form<const N: usize>(app: &App, mode: AuthMode, values: [(Field, String); N]) -> Result<(), CliError> {
    let form = app.form();
    if form.snapshot().mode != mode {
        form.toggle_mode();
    }
    for (field, value) in values {
        form.set_field(field, value);
    }

    match form.submit().await {
        SubmitOutcome::Invalid(errors) => {
            for (field, message) in &errors {
                eprintln!("{field}: {message}");
            }
            Err(CliError::Invalid(errors.len()))
        }
        SubmitOutcome::Busy => Err(CliError::Busy),
        SubmitOutcome::Failed(message) => Err(CliError::Rejected(message)),
        SubmitOutcome::Succeeded { redirect } => {
            if let Some(message) = form.snapshot().success {
                println!("{message}");
            }
            redirect.await?;
            print_view(&app.view())
        }
    }
}

fn print_view(view: &View) -> Result<(), CliError> {
    match view {
        View::Loading => println!("Loading..."),
        View::AuthForm(form) => {
            println!("Not signed in ({:?} form)", form.mode);
            if let Some(message) = form.general_error() {
                println!("{message}");
            }
        }
        View::Application { user, greeting } => {
            println!("{greeting}");
            println!("{}", serde_json::to_string_pretty(user)?);
        }
    }
    Ok(())
}
