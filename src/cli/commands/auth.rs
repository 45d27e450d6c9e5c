use clap::Subcommand;
use serde_json::json;

use crate::cli::config::{api_client, open_session};
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login to server")]
    Login {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Logout from server")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Show current user information")]
    Whoami,

    #[command(about = "Register new user")]
    Register {
        #[arg(help = "Full name")]
        name: String,
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { email, password } => {
            let password = value_or_prompt(password, "Password: ")?;
            let mut session = open_session()?;
            let client = api_client(&session)?;

            let credentials = client.login(&email, &password).await?;
            let role = credentials.user.role;
            let name = credentials.user.display_name().to_string();
            session.sign_in(credentials)?;

            output_success(
                &output_format,
                &format!("Logged in as {} ({})", name, role),
                Some(json!({
                    "role": role,
                    "landing": role.landing_path(),
                })),
            )
        }
        AuthCommands::Logout => {
            let mut session = open_session()?;
            if session.is_authenticated() {
                if let Err(e) = api_client(&session)?.logout().await {
                    tracing::warn!("server logout failed, clearing local session anyway: {}", e);
                }
            }
            session.clear()?;
            output_success(&output_format, "Logged out", None)
        }
        AuthCommands::Status => {
            let session = open_session()?;
            let expires_at = session.token_expiry();

            match output_format {
                OutputFormat::Json => output_json(&json!({
                    "authenticated": session.is_authenticated(),
                    "expired": session.is_expired(),
                    "role": session.role(),
                    "user": session.user(),
                    "signed_in_at": session.signed_in_at(),
                    "expires_at": expires_at,
                })),
                OutputFormat::Text => {
                    if !session.is_authenticated() {
                        println!("Not logged in");
                        return Ok(());
                    }
                    if let Some(user) = session.user() {
                        println!("User: {} <{}>", user.display_name(), user.email);
                    }
                    if let Some(role) = session.role() {
                        println!("Role: {} (landing: {})", role, role.landing_path());
                    }
                    if let Some(at) = session.signed_in_at() {
                        println!("Signed in: {}", at.format("%Y-%m-%d %H:%M"));
                    }
                    match expires_at {
                        Some(exp) if session.is_expired() => {
                            println!("Token: expired at {}", exp.format("%Y-%m-%d %H:%M"))
                        }
                        Some(exp) => println!("Token: valid until {}", exp.format("%Y-%m-%d %H:%M")),
                        None => println!("Token: present (expiry unknown)"),
                    }
                    Ok(())
                }
            }
        }
        AuthCommands::Whoami => {
            let session = open_session()?;
            let profile = api_client(&session)?.profile().await?;

            match output_format {
                OutputFormat::Json => output_json(&profile),
                OutputFormat::Text => {
                    println!("Name: {}", profile.display_name());
                    println!("Email: {}", profile.email);
                    println!("Role: {}", profile.role);
                    Ok(())
                }
            }
        }
        AuthCommands::Register { name, email, password } => {
            let password = value_or_prompt(password, "Password: ")?;
            let session = open_session()?;
            let message = api_client(&session)?
                .register(&name, &email, &password)
                .await?
                .unwrap_or_else(|| format!("Registered {}", email));

            output_success(&output_format, &message, Some(json!({ "email": email })))
        }
    }
}
