//! One-time userbot login
//!
//! Signs the worker's Telegram account in and writes the session file the
//! worker reuses. Prompts for the login code and, if the account has one,
//! the two-step verification password.

use anyhow::{anyhow, Context, Result};
use dialoguer::{Input, Password};
use freelance_core::config::Config;
use freelance_core::kernel::telegram_client::connect_client;
use freelance_core::telemetry;
use grammers_client::SignInError;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;
    let api = config.telegram_api()?;
    let session_file = &config.telegram_session_file;

    let client = connect_client(&api, session_file).await?;

    if client
        .is_authorized()
        .await
        .context("Failed to check authorization")?
    {
        println!("Session {} is already authorized.", session_file.display());
        return Ok(());
    }

    let phone = match config.telegram_phone.clone() {
        Some(phone) => phone,
        None => Input::<String>::new()
            .with_prompt("Phone number (international format)")
            .interact_text()?,
    };

    let token = client
        .request_login_code(phone.trim())
        .await
        .context("Failed to request login code")?;

    let code = Input::<String>::new()
        .with_prompt("Login code from Telegram")
        .interact_text()?;

    let user = match client.sign_in(&token, code.trim()).await {
        Ok(user) => user,
        Err(SignInError::PasswordRequired(password_token)) => {
            let prompt = match password_token.hint() {
                Some(hint) => format!("Two-step verification password (hint: {})", hint),
                None => "Two-step verification password".to_string(),
            };
            let password = Password::new().with_prompt(prompt).interact()?;
            client
                .check_password(password_token, password.trim())
                .await
                .map_err(|e| anyhow!("Password check failed: {}", e))?
        }
        Err(e) => return Err(anyhow!("Sign in failed: {}", e)),
    };

    client
        .session()
        .save_to_file(session_file)
        .with_context(|| format!("Failed to save session {}", session_file.display()))?;

    tracing::info!(user_id = user.id(), "Userbot authorized");
    println!(
        "Signed in as {}. Session saved to {}.",
        user.first_name(),
        session_file.display()
    );
    Ok(())
}
