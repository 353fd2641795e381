//! Moderate command
//!
//! Work through the moderation queue.

use anyhow::{bail, Context, Result};
use clap::{Subcommand, ValueEnum};
use colored::Colorize;
use std::path::Path;

use mefm_core::comment::{Comment, CommentManager, CommentStatus, ModerationDecision};
use mefm_core::types::{CommentId, PractitionerId};

use super::{open_manager, with_spinner};

/// Queue to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueueStatus {
    Pending,
    Flagged,
}

impl From<QueueStatus> for CommentStatus {
    fn from(status: QueueStatus) -> Self {
        match status {
            QueueStatus::Pending => CommentStatus::Pending,
            QueueStatus::Flagged => CommentStatus::Flagged,
        }
    }
}

/// Moderate subcommands
#[derive(Debug, Subcommand)]
pub enum ModerateCommand {
    /// Show comments waiting for review
    Queue {
        /// Which queue to show
        #[arg(long, value_enum, default_value = "flagged")]
        status: QueueStatus,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Approve comments: pending ones become visible, flagged and visible
    /// ones moderated. Visible comments are not queued; name their
    /// practitioner with --practitioner.
    Approve {
        /// Comment IDs
        #[arg(required = true)]
        ids: Vec<String>,

        /// Also look up comments on this practitioner outside the queue
        #[arg(long, short)]
        practitioner: Option<String>,
    },

    /// Block comments
    Block {
        /// Comment IDs
        #[arg(required = true)]
        ids: Vec<String>,

        /// Skip confirmation
        #[arg(long, short)]
        yes: bool,
    },
}

/// Execute the moderate command
pub async fn execute(cmd: ModerateCommand, config_path: &Path) -> Result<()> {
    let manager = open_manager(config_path)?;

    match cmd {
        ModerateCommand::Queue { status, json } => show_queue(&manager, status.into(), json).await,
        ModerateCommand::Approve { ids, practitioner } => {
            let practitioner = practitioner.map(PractitionerId::from);
            decide(&manager, &ids, practitioner.as_ref(), ModerationDecision::Approve).await
        }
        ModerateCommand::Block { ids, yes } => {
            if !yes {
                use dialoguer::Confirm;

                let confirmed = Confirm::new()
                    .with_prompt(format!("Block {} comment(s)?", ids.len()))
                    .default(false)
                    .interact()?;

                if !confirmed {
                    println!("Block cancelled.");
                    return Ok(());
                }
            }
            decide(&manager, &ids, None, ModerationDecision::Block).await
        }
    }
}

async fn show_queue(manager: &CommentManager, status: CommentStatus, as_json: bool) -> Result<()> {
    let queue = with_spinner("Fetching queue...", manager.moderation_queue(status))
        .await
        .context("Failed to fetch moderation queue")?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&queue)?);
        return Ok(());
    }

    if queue.is_empty() {
        println!("No {} comments.", status.as_str().to_lowercase());
        return Ok(());
    }

    println!(
        "{}",
        format!("{} comments ({})", status, queue.len()).bold().underline()
    );
    for comment in &queue {
        let kind = if comment.is_root() { "comment" } else { "reply" };
        println!(
            "{} {} on practitioner {} by {} {}",
            format!("[{}]", comment.id).cyan(),
            kind,
            comment.practitioner_id,
            comment.user_id.to_string().bold(),
            comment.date.format("%Y-%m-%d %H:%M").to_string().dimmed()
        );
        println!("  {}", comment.text);
    }

    Ok(())
}

/// Find the comments named by `ids` in the review queues, then among the
/// comments of `practitioner` when one is given
async fn pick(
    manager: &CommentManager,
    ids: &[String],
    practitioner: Option<&PractitionerId>,
) -> Result<Vec<Comment>> {
    let mut queued = with_spinner("Fetching queue...", async {
        let mut all = manager.moderation_queue(CommentStatus::Pending).await?;
        all.extend(manager.moderation_queue(CommentStatus::Flagged).await?);
        Ok::<_, mefm_core::MefmError>(all)
    })
    .await
    .context("Failed to fetch moderation queue")?;

    let mut loaded = false;
    let mut picked = Vec::with_capacity(ids.len());
    for id in ids {
        let id = CommentId::from(id.as_str());
        if let Some(pos) = queued.iter().position(|c| c.id == id) {
            picked.push(queued.swap_remove(pos));
            continue;
        }

        let Some(practitioner) = practitioner else {
            bail!("Comment {} is not waiting for review", id);
        };
        if !loaded {
            with_spinner("Loading comments...", manager.load_practitioner(practitioner))
                .await
                .with_context(|| format!("Failed to load comments for practitioner {}", practitioner))?;
            loaded = true;
        }
        match manager.get(&id).await {
            Some(comment) => picked.push(comment),
            None => bail!("Comment {} not found on practitioner {}", id, practitioner),
        }
    }
    Ok(picked)
}

async fn decide(
    manager: &CommentManager,
    ids: &[String],
    practitioner: Option<&PractitionerId>,
    decision: ModerationDecision,
) -> Result<()> {
    let comments = pick(manager, ids, practitioner).await?;
    let decisions: Vec<(Comment, ModerationDecision)> =
        comments.into_iter().map(|c| (c, decision)).collect();

    let resolved = with_spinner("Saving decisions...", manager.resolve(&decisions))
        .await
        .context("Failed to resolve comments")?;

    for comment in &resolved {
        println!(
            "{} {} -> {}",
            "✓".green(),
            comment.id.to_string().cyan(),
            comment.status
        );
    }
    Ok(())
}
