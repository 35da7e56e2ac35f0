use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use v4t_client::client::HttpTeachingClient;
use v4t_client::commands::{CommandArgs, CommandId, CommandInvocation};
use v4t_client::comments::CommentStore;
use v4t_client::config::ClientConfig;
use v4t_client::context::{CommandOutcome, ExtensionContext};
use v4t_client::error::AppError;
use v4t_client::session::SessionStore;
use v4t_client::tree::TreeItem;
use v4t_client::ui::TerminalUi;

#[derive(Parser)]
#[command(name = "v4t", version, about = "Command line client for VS Code 4 Teaching")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the session
    Login {
        #[arg(long, env = "V4T_SERVER_URL")]
        server: Option<String>,
        #[arg(long, env = "V4T_USERNAME")]
        username: String,
        #[arg(long, env = "V4T_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// List the courses of the current user
    Courses,
    /// List the exercises of a course
    Exercises { course: String },
    /// Download an exercise and keep it synchronized until interrupted
    Download { course: String, exercise: String },
    /// Download every student's files of an exercise (teachers)
    StudentFiles { course: String, exercise: String },
    /// Synchronize already downloaded exercise folders until interrupted
    Watch {
        #[arg(required = true)]
        folders: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "v4t_client=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::new_from_env()?;
    let session = Arc::new(SessionStore::restore(config.session_path(), config.server_url.clone())?);
    let api = Arc::new(HttpTeachingClient::new(session.clone())?);
    let mut context = ExtensionContext::new(
        config.clone(),
        session,
        api,
        Arc::new(TerminalUi),
        Arc::new(CommentStore::new()),
    );
    let open_folders = match &cli.command {
        Command::Watch { folders } => folders.clone(),
        _ => Vec::new(),
    };
    let states = context.activate(&open_folders).await;

    match cli.command {
        Command::Login { server, username, password } => {
            let server = server.unwrap_or_else(|| config.server_url.clone());
            let args = CommandArgs::Credentials { server, username, password };
            context.run(CommandInvocation::new(CommandId::Login, args)).await;
        }
        Command::Logout => {
            context.run(CommandInvocation::bare(CommandId::Logout)).await;
        }
        Command::Courses => {
            print_items(&context.tree().root_items().await);
        }
        Command::Exercises { course } => {
            print_items(&context.tree().children(&course).await);
        }
        Command::Download { course, exercise } => {
            let invocation = exercise_invocation(&context, CommandId::GetExerciseFiles, course, &exercise).await?;
            if let Some(CommandOutcome::OpenFolders(folders)) = context.run(invocation).await {
                print_folders(&folders);
                wait_for_interrupt(&mut context).await?;
            }
        }
        Command::StudentFiles { course, exercise } => {
            let invocation = exercise_invocation(&context, CommandId::GetStudentFiles, course, &exercise).await?;
            if let Some(CommandOutcome::OpenFolders(folders)) = context.run(invocation).await {
                print_folders(&folders);
                wait_for_interrupt(&mut context).await?;
            }
        }
        Command::Watch { .. } => {
            for (folder, state) in &states {
                println!("{}: {:?}", folder.display(), state);
            }
            wait_for_interrupt(&mut context).await?;
        }
    }

    Ok(())
}

async fn exercise_invocation(
    context: &ExtensionContext,
    id: CommandId,
    course_name: String,
    exercise_name: &str,
) -> Result<CommandInvocation, AppError> {
    let exercise = context
        .tree()
        .exercises(&course_name)
        .await?
        .into_iter()
        .find(|exercise| exercise.name == exercise_name)
        .ok_or_else(|| AppError::LocalState(format!("Unknown exercise: {}", exercise_name)))?;
    Ok(CommandInvocation::new(id, CommandArgs::Exercise { course_name, exercise }))
}

async fn wait_for_interrupt(context: &mut ExtensionContext) -> Result<(), AppError> {
    info!("Synchronizing, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    context.deactivate();
    Ok(())
}

fn print_items(items: &[TreeItem]) {
    for item in items {
        println!("{}", item.label);
    }
}

fn print_folders(folders: &[PathBuf]) {
    for folder in folders {
        println!("{}", folder.display());
    }
}
