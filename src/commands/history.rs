use crate::api::{ChatApi, ExportFormat};
use crate::chat::reconcile::session_from_summary;
use crate::chat::{fetch_messages, ChatController, ChatSession, DeleteOutcome};
use crate::cli::HistoryCommand;
use crate::commands::{build_client, render, require_login};
use crate::config::Config;
use crate::error::{QuerychatError, Result};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

/// File an export is written to when no `--output` is given
pub fn default_export_path(message_id: &str, format: ExportFormat) -> PathBuf {
    let stem: String = message_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    PathBuf::from(format!("query_results_{}.{}", stem, format.extension()))
}

/// Handle history commands
pub async fn handle_history(config: Config, command: HistoryCommand) -> Result<()> {
    let client = build_client(&config)?;
    require_login(&client)?;

    match command {
        HistoryCommand::List => {
            let sessions: Vec<ChatSession> = client
                .list_chats()
                .await?
                .into_iter()
                .map(session_from_summary)
                .collect();

            println!("\nChat History:");
            render::print_sessions(&sessions);
            if !sessions.is_empty() {
                println!();
                println!(
                    "Use {} to resume a chat.",
                    "querychat chat --resume <ID>".cyan()
                );
            }
            println!();
        }
        HistoryCommand::Show { id } => {
            let messages = fetch_messages(&client, &id).await?;
            render::print_messages(&messages, &config.display);
        }
        HistoryCommand::Delete { id } => {
            // Same rule as the interactive view: the last chat stays.
            let mut controller = ChatController::new(Arc::new(client));
            controller.load_history().await?;
            match controller.delete_session(&id).await? {
                DeleteOutcome::Refused => {
                    println!("{}", "The only remaining chat cannot be deleted.".yellow());
                }
                DeleteOutcome::Removed { .. } => {
                    println!("{}", format!("Deleted chat {}", id).green());
                }
            }
        }
        HistoryCommand::Export {
            message_id,
            format,
            output,
        } => {
            let bytes = client.download_message_data(&message_id, format).await?;
            let path = output.unwrap_or_else(|| default_export_path(&message_id, format));
            std::fs::write(&path, &bytes).map_err(|e| {
                QuerychatError::Storage(format!("Failed to write {}: {}", path.display(), e))
            })?;
            tracing::info!(path = %path.display(), size = bytes.len(), "Saved export");
            println!(
                "{}",
                format!("Saved {} export to {}", format, path.display()).green()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_export_path_uses_format_extension() {
        assert_eq!(
            default_export_path("42", ExportFormat::Excel),
            PathBuf::from("query_results_42.xlsx")
        );
        assert_eq!(
            default_export_path("a/b c", ExportFormat::Csv),
            PathBuf::from("query_results_a_b_c.csv")
        );
    }
}
