/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `chat`: Interactive chat mode
- `ask`: One question, one answer
- `history`: Browse, delete and export stored chats
- `schema`: Browse databases and tables
- `account`: Login, registration, password reset, logout

Handlers build an [`ApiClient`] from configuration and drive a
[`ChatController`]; they own nothing but terminal I/O.
*/

use crate::api::ApiClient;
use crate::auth::{open_store, AuthContext};
use crate::chat::{ChatController, DeleteOutcome, ExchangeOutcome};
use crate::config::Config;
use crate::error::{QuerychatError, Result};
use colored::Colorize;
use std::sync::Arc;

// Terminal rendering of messages and sessions
pub mod render;

// Special commands parser for the chat prompt
pub mod special_commands;

// Chat history management commands
pub mod history;

// Database browsing commands
pub mod schema;

/// Build the service client and its auth context from configuration
pub fn build_client(config: &Config) -> Result<ApiClient> {
    let store = open_store(&config.auth)?;
    let auth = Arc::new(AuthContext::init(store));
    ApiClient::new(&config.api, auth)
}

/// Fail early when no token is stored
pub fn require_login(client: &ApiClient) -> Result<()> {
    if client.auth().is_authenticated() {
        Ok(())
    } else {
        Err(QuerychatError::Authentication(
            "not signed in; run `querychat login` first".to_string(),
        )
        .into())
    }
}

/// Print a recoverable error; authentication errors are returned instead.
fn report(err: anyhow::Error) -> Result<()> {
    if QuerychatError::is_authentication(&err) {
        return Err(err);
    }
    eprintln!("{}", format!("Error: {}", err).red());
    Ok(())
}

fn print_outcome(controller: &ChatController<ApiClient>, outcome: &ExchangeOutcome, config: &Config) {
    match outcome {
        ExchangeOutcome::Succeeded => {
            if let Some(last) = controller.messages().last() {
                render::print_message(last, &config.display);
            }
        }
        ExchangeOutcome::Failed { notice } => {
            if let Some(last) = controller.messages().last() {
                render::print_message(last, &config.display);
            }
            eprintln!("{}", notice.dimmed());
        }
        ExchangeOutcome::Discarded => {
            tracing::debug!("Reply arrived for a chat no longer on screen");
        }
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! A reader thread feeds lines from rustyline into the async loop.
    //! Questions are sent from spawned tasks so the prompt stays usable
    //! (for `/switch`, `/new`, ...) while a reply is pending; replies come
    //! back through a channel and are applied by the loop, which is the only
    //! place chat state changes.

    use super::*;
    use crate::chat::{dispatch, ExchangeReply, PendingExchange};
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use tokio::sync::mpsc;

    const PROMPT: &str = "querychat> ";

    enum InputEvent {
        Line(String),
        Interrupted,
        Eof,
    }

    type Completion = (PendingExchange, Result<ExchangeReply>);

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `resume` - Chat id to open instead of starting a new chat
    pub async fn run_chat(config: Config, resume: Option<String>) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let client = build_client(&config)?;
        require_login(&client)?;

        let mut controller = ChatController::new(Arc::new(client));
        controller.load_history().await?;

        if let Some(id) = resume {
            match controller.select_session(&id).await {
                Ok(()) => render::print_messages(controller.messages(), &config.display),
                Err(e) => report(e)?,
            }
        }

        print_welcome_banner(&controller);

        let (input_tx, mut input_rx) = mpsc::unbounded_channel();
        spawn_reader(input_tx)?;
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();

        loop {
            tokio::select! {
                input = input_rx.recv() => {
                    match input {
                        Some(InputEvent::Line(line)) => {
                            if handle_line(&mut controller, &config, &line, &done_tx).await? {
                                break;
                            }
                        }
                        Some(InputEvent::Interrupted) => {
                            println!("CTRL-C");
                            break;
                        }
                        Some(InputEvent::Eof) | None => {
                            println!("CTRL-D");
                            break;
                        }
                    }
                }
                Some((pending, result)) = done_rx.recv() => {
                    let outcome = controller.complete_send(pending, result)?;
                    println!();
                    print_outcome(&controller, &outcome, &config);
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    fn spawn_reader(tx: mpsc::UnboundedSender<InputEvent>) -> Result<()> {
        std::thread::Builder::new()
            .name("readline".to_string())
            .spawn(move || {
                let mut rl = match DefaultEditor::new() {
                    Ok(rl) => rl,
                    Err(err) => {
                        tracing::error!("Readline init error: {:?}", err);
                        let _ = tx.send(InputEvent::Eof);
                        return;
                    }
                };
                loop {
                    let event = match rl.readline(PROMPT) {
                        Ok(line) => {
                            if !line.trim().is_empty() {
                                let _ = rl.add_history_entry(line.as_str());
                            }
                            InputEvent::Line(line)
                        }
                        Err(ReadlineError::Interrupted) => InputEvent::Interrupted,
                        Err(ReadlineError::Eof) => InputEvent::Eof,
                        Err(err) => {
                            tracing::error!("Readline error: {:?}", err);
                            InputEvent::Eof
                        }
                    };
                    let stop = !matches!(event, InputEvent::Line(_));
                    if tx.send(event).is_err() || stop {
                        break;
                    }
                }
            })?;
        Ok(())
    }

    /// Handle one input line; returns `true` when the user asked to leave.
    async fn handle_line(
        controller: &mut ChatController<ApiClient>,
        config: &Config,
        line: &str,
        done_tx: &mpsc::UnboundedSender<Completion>,
    ) -> Result<bool> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(false);
        }

        let command = match parse_special_command(trimmed) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e.to_string().red());
                return Ok(false);
            }
        };

        match command {
            SpecialCommand::Exit => return Ok(true),
            SpecialCommand::Help => print_help(),
            SpecialCommand::NewChat => {
                controller.create_session();
                println!("{}", "Started a new chat.".green());
            }
            SpecialCommand::ListSessions => {
                if let Err(e) = controller.load_history().await {
                    report(e)?;
                }
                render::print_sessions(controller.registry().sessions());
            }
            SpecialCommand::ShowHistory => {
                if let Some(err) = controller.load_error() {
                    eprintln!("{}", format!("Could not load this chat: {}", err).red());
                }
                render::print_messages(controller.messages(), &config.display);
            }
            SpecialCommand::Switch(reference) => {
                let Some(id) = resolve(controller, &reference) else {
                    eprintln!("{}", format!("No chat matches '{}'", reference).yellow());
                    return Ok(false);
                };
                match controller.select_session(&id).await {
                    Ok(()) => {
                        if let Some(session) = controller.current_session() {
                            println!("{}", format!("Opened: {}", session.title).green());
                        }
                        render::print_messages(controller.messages(), &config.display);
                    }
                    Err(e) => report(e)?,
                }
            }
            SpecialCommand::Delete(reference) => {
                let Some(id) = resolve(controller, &reference) else {
                    eprintln!("{}", format!("No chat matches '{}'", reference).yellow());
                    return Ok(false);
                };
                match controller.delete_session(&id).await {
                    Ok(DeleteOutcome::Refused) => {
                        println!("{}", "The only remaining chat cannot be deleted.".yellow());
                    }
                    Ok(DeleteOutcome::Removed { reselected }) => {
                        println!("{}", format!("Deleted chat {}", id).green());
                        if reselected.is_some() {
                            render::print_messages(controller.messages(), &config.display);
                        }
                    }
                    Err(e) => report(e)?,
                }
            }
            SpecialCommand::None => match controller.begin_send(trimmed) {
                Ok(pending) => {
                    println!("{}", "Thinking...".dimmed());
                    let api = controller.api();
                    let tx = done_tx.clone();
                    tokio::spawn(async move {
                        let result = dispatch(api.as_ref(), &pending).await;
                        let _ = tx.send((pending, result));
                    });
                }
                Err(e) => eprintln!("{}", e.to_string().yellow()),
            },
        }

        Ok(false)
    }

    fn resolve(controller: &ChatController<ApiClient>, reference: &str) -> Option<String> {
        controller
            .registry()
            .resolve(reference)
            .map(|session| session.id.clone())
    }

    fn print_welcome_banner(controller: &ChatController<ApiClient>) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║              Querychat - ask your data anything              ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        if let Some(user) = controller.api().auth().user() {
            if let Some(name) = user.username.or(user.email) {
                println!("Signed in as {}", name.cyan());
            }
        }
        match controller.current_session() {
            Some(session) => println!("Chat:   {}", session.title.cyan()),
            None => println!("Chat:   {}", "new".cyan()),
        }
        if let Some(database) = controller.api().database_type() {
            println!("Data:   {}", database.cyan());
        }
        println!("Chats:  {}", controller.registry().len());
        println!("\nType '/help' for available commands, 'exit' to quit\n");
    }
}

// Single-question handler
pub mod ask {
    //! Send one question and print the reply.

    use super::*;

    /// Ask `question`, continuing `chat` when given
    pub async fn run_ask(config: Config, question: String, chat: Option<String>) -> Result<()> {
        let client = build_client(&config)?;
        require_login(&client)?;

        let mut controller = ChatController::new(Arc::new(client));
        if let Some(id) = &chat {
            controller.load_history().await?;
            controller.select_session(id).await?;
        }

        let outcome = controller.send_message(&question).await?;
        print_outcome(&controller, &outcome, &config);

        if let ExchangeOutcome::Failed { notice } = outcome {
            return Err(anyhow::anyhow!("question failed: {}", notice));
        }

        if chat.is_none() {
            if let Some(id) = controller.current_session_id() {
                println!(
                    "\nContinue with {}",
                    format!("querychat ask --chat {} \"...\"", id).cyan()
                );
            }
        }
        Ok(())
    }
}

// Account handlers
pub mod account {
    //! Login, registration, password reset, and logout.

    use super::*;
    use crate::api::{RegisterRequest, Registration};
    use std::io::{self, BufRead, Write};

    fn prompt_line(label: &str) -> Result<String> {
        print!("{}", label);
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        let value = line.trim().to_string();
        if value.is_empty() {
            return Err(QuerychatError::InvalidInput(format!(
                "{} cannot be empty",
                label.trim().trim_end_matches(':')
            ))
            .into());
        }
        Ok(value)
    }

    fn prompt_new_password() -> Result<String> {
        let password = rpassword::prompt_password("New password: ")?;
        let confirm = rpassword::prompt_password("Confirm password: ")?;
        if password != confirm {
            return Err(QuerychatError::InvalidInput("passwords do not match".to_string()).into());
        }
        if password.is_empty() {
            return Err(QuerychatError::InvalidInput("password cannot be empty".to_string()).into());
        }
        Ok(password)
    }

    fn prompt_optional(label: &str) -> Result<Option<String>> {
        print!("{}", label);
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        let value = line.trim();
        Ok((!value.is_empty()).then(|| value.to_string()))
    }

    /// Sign in with username and password
    pub async fn login(config: Config, username: Option<String>) -> Result<()> {
        let client = build_client(&config)?;
        let username = match username {
            Some(username) => username,
            None => prompt_line("Username: ")?,
        };
        let password = rpassword::prompt_password("Password: ")?;

        let credentials = client.login(&username, &password).await?;
        let name = credentials
            .user
            .and_then(|u| u.full_name.or(u.username))
            .unwrap_or(username);
        println!("{}", format!("Signed in as {}", name).green());
        Ok(())
    }

    /// Create an account; email and full name are optional
    pub async fn register(
        config: Config,
        username: Option<String>,
        email: Option<String>,
        full_name: Option<String>,
    ) -> Result<()> {
        let client = build_client(&config)?;
        let interactive = username.is_none();
        let username = match username {
            Some(username) => username,
            None => prompt_line("Username: ")?,
        };
        let email = match email {
            Some(email) => Some(email),
            None if interactive => prompt_optional("Email (optional): ")?,
            None => None,
        };
        let full_name = match full_name {
            Some(name) => Some(name),
            None if interactive => prompt_optional("Full name (optional): ")?,
            None => None,
        };
        let password = prompt_new_password()?;

        let request = RegisterRequest {
            username,
            password,
            email,
            full_name,
        };
        match client.register(&request).await? {
            Registration::SignedIn(_) => println!("{}", "Account created and signed in.".green()),
            Registration::ConfirmationRequired => println!(
                "{}",
                "Account created. Confirm it from the email we sent, then run `querychat login`."
                    .yellow()
            ),
            Registration::Created => println!(
                "{}",
                "Account created. Sign in with `querychat login`.".green()
            ),
        }
        Ok(())
    }

    /// Request a password reset email
    pub async fn forgot_password(config: Config, email: String) -> Result<()> {
        let client = build_client(&config)?;
        let message = client.forgot_password(&email).await?;
        println!(
            "{}",
            message
                .unwrap_or_else(|| "If the account exists, a reset link is on its way.".to_string())
                .green()
        );
        Ok(())
    }

    /// Set a new password from a reset token
    pub async fn reset_password(config: Config, token: String) -> Result<()> {
        let client = build_client(&config)?;
        let password = prompt_new_password()?;
        let message = client.reset_password(&token, &password).await?;
        println!(
            "{}",
            message
                .unwrap_or_else(|| "Password updated. Sign in with `querychat login`.".to_string())
                .green()
        );
        Ok(())
    }

    /// End the session on the service and forget the stored token
    pub async fn logout(config: Config) -> Result<()> {
        let client = build_client(&config)?;
        client.logout().await?;
        println!("{}", "Signed out.".green());
        Ok(())
    }

    /// Show who is signed in
    pub fn whoami(config: Config) -> Result<()> {
        let auth = AuthContext::init(open_store(&config.auth)?);
        if !auth.is_authenticated() {
            println!("{}", "Not signed in.".yellow());
            return Ok(());
        }
        match auth.user() {
            Some(user) => {
                let email = user.email.unwrap_or_else(|| "-".to_string());
                match user.username {
                    Some(name) => println!("Signed in as {} <{}>", name.cyan(), email),
                    None => println!("Signed in as {}", email.cyan()),
                }
                if let Some(full_name) = user.full_name {
                    println!("Name: {}", full_name);
                }
            }
            None => println!("Signed in."),
        }
        Ok(())
    }
}
