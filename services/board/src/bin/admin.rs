//! Operator commands for the bulletin board.
//!
//! ```bash
//! board-admin users --filter threedays
//! board-admin resend-activation --filter week
//! board-admin resend-activation --username alice --username bob
//! board-admin add-super-rubric --name Vehicles --order 1
//! board-admin add-sub-rubric --name Cars --order 1 --parent Vehicles
//! ```

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use sea_orm::Database;

use bboard::config::BoardConfig;
use bboard::domain::types::ActivationFilter;
use bboard::error::BoardServiceError;
use bboard::state::AppState;
use bboard::usecase::activation::{ListUsersUseCase, ResendActivationUseCase, ResendSelection};
use bboard::usecase::rubric::{CreateRubricInput, CreateRubricUseCase};
use bboard_core::config::Config;
use bboard_core::tracing::init_tracing;

#[derive(Parser)]
#[command(about = "Bulletin board administration")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List users by activation state: activated, threedays or week
    Users {
        #[arg(long)]
        filter: ActivationFilter,
    },
    /// Re-send activation letters to unactivated users
    ResendActivation {
        #[arg(long, conflicts_with = "username")]
        filter: Option<ActivationFilter>,
        #[arg(long)]
        username: Vec<String>,
    },
    /// Create a top-level rubric
    AddSuperRubric {
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 0)]
        order: i16,
    },
    /// Create a rubric under an existing super-rubric
    AddSubRubric {
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 0)]
        order: i16,
        /// Name of the super-rubric
        #[arg(long)]
        parent: String,
    },
}

/// Spell out form errors; other failures keep their message.
fn describe(e: BoardServiceError) -> anyhow::Error {
    match e.into_form_errors() {
        Ok(errors) => {
            let details: Vec<String> = errors
                .iter()
                .flat_map(|(field, messages)| messages.iter().map(move |m| format!("{field}: {m}")))
                .collect();
            anyhow::anyhow!("{}", details.join("; "))
        }
        Err(other) => other.into(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();
    let args = Args::parse();

    let config = BoardConfig::try_from_env().context("load board config")?;
    let db = Database::connect(&config.database_url)
        .await
        .context("connect to database")?;
    let state = AppState::new(db, config).context("build activation signer")?;

    match args.command {
        Command::Users { filter } => {
            let uc = ListUsersUseCase {
                users: state.user_repo(),
            };
            let users = uc.execute(filter).await.map_err(describe)?;
            for user in &users {
                println!(
                    "{}\t{}\tjoined {}\tactivated={}",
                    user.username,
                    user.email,
                    user.date_joined.format("%Y-%m-%d %H:%M"),
                    user.is_activated
                );
            }
            println!("{} user(s)", users.len());
        }
        Command::ResendActivation { filter, username } => {
            let selection = match (filter, username.is_empty()) {
                (Some(filter), _) => ResendSelection::Filter(filter),
                (None, false) => ResendSelection::Usernames(username),
                (None, true) => bail!("pass --filter or at least one --username"),
            };
            let uc = ResendActivationUseCase {
                users: state.user_repo(),
                notifier: state.mailer(),
            };
            let report = uc.execute(selection).await.map_err(describe)?;
            for name in &report.sent {
                println!("sent\t{name}");
            }
            for name in &report.skipped {
                println!("skipped (already activated)\t{name}");
            }
            for name in &report.missing {
                println!("missing\t{name}");
            }
            println!(
                "Letters sent to {} user(s); {} skipped; {} not found",
                report.sent.len(),
                report.skipped.len(),
                report.missing.len()
            );
        }
        Command::AddSuperRubric { name, order } => {
            let uc = CreateRubricUseCase {
                rubrics: state.rubric_repo(),
            };
            let input = CreateRubricInput {
                name,
                order,
                parent: None,
            };
            let rubric = uc.execute(input).await.map_err(describe)?;
            println!("created super-rubric {} ({})", rubric.name, rubric.id);
        }
        Command::AddSubRubric {
            name,
            order,
            parent,
        } => {
            let uc = CreateRubricUseCase {
                rubrics: state.rubric_repo(),
            };
            let input = CreateRubricInput {
                name,
                order,
                parent: Some(parent),
            };
            let rubric = uc.execute(input).await.map_err(describe)?;
            println!("created sub-rubric {} ({})", rubric.name, rubric.id);
        }
    }
    Ok(())
}
