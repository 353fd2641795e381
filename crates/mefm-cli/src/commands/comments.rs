//! Comments command
//!
//! Read and write comments on a practitioner.

use anyhow::{anyhow, Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::Path;

use mefm_core::comment::{CommentBuilder, CommentLevel, CommentManager, DisplayEntry};
use mefm_core::types::{CommentId, PractitionerId, User};

use super::{open_manager, with_spinner};

/// Comments subcommands
#[derive(Debug, Subcommand)]
pub enum CommentsCommand {
    /// List the comment threads of a practitioner
    List {
        /// Practitioner ID
        practitioner: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Post a root comment
    Add {
        /// Practitioner ID
        practitioner: String,

        /// Comment text
        text: String,
    },

    /// Reply to a comment thread
    Reply {
        /// Practitioner ID
        practitioner: String,

        /// Comment to reply to; replies to a response go to its thread
        comment: String,

        /// Reply text
        text: String,
    },

    /// Flag a comment for moderator review
    Flag {
        /// Practitioner ID
        practitioner: String,

        /// Comment ID
        comment: String,
    },
}

/// Execute the comments command
pub async fn execute(cmd: CommentsCommand, config_path: &Path) -> Result<()> {
    let manager = open_manager(config_path)?;

    match cmd {
        CommentsCommand::List { practitioner, json } => {
            list_comments(&manager, &PractitionerId::from(practitioner), json).await
        }
        CommentsCommand::Add { practitioner, text } => {
            add_comment(&manager, PractitionerId::from(practitioner), None, text).await
        }
        CommentsCommand::Reply {
            practitioner,
            comment,
            text,
        } => {
            add_comment(
                &manager,
                PractitionerId::from(practitioner),
                Some(CommentId::from(comment)),
                text,
            )
            .await
        }
        CommentsCommand::Flag {
            practitioner,
            comment,
        } => flag_comment(&manager, &PractitionerId::from(practitioner), &CommentId::from(comment)).await,
    }
}

async fn load(manager: &CommentManager, practitioner: &PractitionerId) -> Result<usize> {
    with_spinner("Loading comments...", manager.load_practitioner(practitioner))
        .await
        .with_context(|| format!("Failed to load comments for practitioner {}", practitioner))
}

fn signed_in(manager: &CommentManager) -> Result<User> {
    manager.current_user().ok_or_else(|| {
        anyhow!("No user configured. Add an [identity] section with '{}'.", "mefm config init".cyan())
    })
}

async fn list_comments(manager: &CommentManager, practitioner: &PractitionerId, as_json: bool) -> Result<()> {
    load(manager, practitioner).await?;
    let entries = manager.display_entries(practitioner).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No comments on practitioner {}.", practitioner);
        return Ok(());
    }

    println!(
        "{} ({} threads, {} comments)",
        format!("Practitioner {}", practitioner).bold().underline(),
        manager.thread_count(practitioner).await,
        entries.len()
    );
    for entry in &entries {
        println!("{}", format_entry(entry));
    }

    Ok(())
}

fn format_entry(entry: &DisplayEntry) -> String {
    let comment = &entry.comment;
    let indent = match entry.level {
        CommentLevel::Root => "",
        CommentLevel::Response => "    ",
    };

    let mut header = format!(
        "{}{} {} {}",
        indent,
        format!("[{}]", comment.id).cyan(),
        comment.user_id.to_string().bold(),
        comment.date.format("%Y-%m-%d %H:%M").to_string().dimmed()
    );
    if entry.policy.flag_icon {
        header.push_str(&format!(" {}", "⚑ flagged".red()));
    }
    let status = comment.status.as_str().to_lowercase();
    header.push_str(&format!(" {}", format!("({})", status).dimmed()));

    let text = if entry.policy.text != comment.text {
        entry.policy.text.italic().dimmed().to_string()
    } else {
        entry.policy.text.clone()
    };

    let mut actions = Vec::new();
    if entry.policy.reply_action {
        actions.push("reply");
    }
    if entry.policy.flag_action {
        actions.push("flag");
    }

    let mut out = format!("{}\n{}  {}", header, indent, text);
    if !actions.is_empty() {
        out.push_str(&format!("\n{}  {}", indent, actions.join(" | ").dimmed()));
    }
    out
}

async fn add_comment(
    manager: &CommentManager,
    practitioner: PractitionerId,
    reply_to: Option<CommentId>,
    text: String,
) -> Result<()> {
    let user = signed_in(manager)?;

    let mut builder = CommentBuilder::by(&user, practitioner.clone()).text(text);
    if let Some(target) = reply_to {
        load(manager, &practitioner).await?;
        let root = manager.reply_target(&target).await?;
        builder = builder.reply_to(root);
    }

    let comment = with_spinner("Posting comment...", manager.add_comment(builder.build()?))
        .await
        .context("Failed to post comment")?;

    println!(
        "{} Comment {} submitted for review.",
        "✓".green(),
        comment.id.to_string().cyan()
    );
    Ok(())
}

async fn flag_comment(manager: &CommentManager, practitioner: &PractitionerId, id: &CommentId) -> Result<()> {
    load(manager, practitioner).await?;
    let comment = manager
        .get(id)
        .await
        .ok_or_else(|| anyhow!("Comment {} not found on practitioner {}", id, practitioner))?;

    let flagged = with_spinner("Flagging comment...", manager.flag_comment(&comment))
        .await
        .context("Failed to flag comment")?;

    println!(
        "{} Comment {} flagged for moderator review.",
        "✓".green(),
        flagged.id.to_string().cyan()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mefm_core::comment::{Comment, CommentStatus, BLOCKED_PLACEHOLDER};
    use mefm_core::types::UserId;

    fn entry(status: CommentStatus, level: CommentLevel) -> DisplayEntry {
        let comment = Comment {
            id: CommentId::from("c1"),
            parent_id: None,
            practitioner_id: PractitionerId::from("42"),
            user_id: UserId::from("7"),
            date: Utc::now(),
            text: "Very thorough".to_string(),
            status,
        };
        let policy = mefm_core::comment::DisplayPolicy::for_comment(&comment, level, BLOCKED_PLACEHOLDER);
        DisplayEntry {
            comment,
            level,
            policy,
        }
    }

    #[test]
    fn test_format_blocked_response() {
        colored::control::set_override(false);
        let out = format_entry(&entry(CommentStatus::Blocked, CommentLevel::Response));
        assert!(out.contains(BLOCKED_PLACEHOLDER));
        assert!(!out.contains("Very thorough"));
        assert!(out.lines().all(|line| line.starts_with("    ")));
        assert!(!out.contains("reply"));
    }

    #[test]
    fn test_format_flagged_root() {
        colored::control::set_override(false);
        let out = format_entry(&entry(CommentStatus::Flagged, CommentLevel::Root));
        assert!(out.contains("⚑ flagged"));
        assert!(out.contains("reply"));
        assert!(!out.contains("flag |") && !out.ends_with("| flag"));
    }
}
