use crate::db::{self, ConversationRepository};
use crate::export::{self, ExportFormat};
use crate::search::{self, ConversationFilters};
use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "callscribe")]
#[command(about = "Sales call transcription and conversation analysis", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Search and view processed conversations
    History(HistoryCliArgs),
    /// Export one conversation as json, csv, or txt
    Export(ExportCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct HistoryCliArgs {
    /// User id whose conversations to list
    #[arg(short, long, default_value = "1")]
    pub user: i64,
    /// Search query to filter conversations by transcript text
    #[arg(short, long)]
    pub query: Option<String>,
    /// Filter by start date (YYYY-MM-DD format)
    #[arg(long)]
    pub from: Option<String>,
    /// Filter by end date (YYYY-MM-DD format)
    #[arg(long)]
    pub to: Option<String>,
    /// Maximum number of results to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

#[derive(ClapArgs, Debug)]
pub struct ExportCliArgs {
    /// Conversation id to export
    #[arg(short, long)]
    pub id: i64,
    /// User id that owns the conversation
    #[arg(short, long, default_value = "1")]
    pub user: i64,
    /// Output format: json, csv, or txt
    #[arg(short, long, default_value = "json")]
    pub format: String,
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn handle_history_command(args: HistoryCliArgs) -> Result<()> {
    let conn = db::init_db()?;

    let filters = ConversationFilters {
        query: args.query,
        start_date: args.from,
        end_date: args.to,
        phase: None,
        sentiment: None,
        limit: args.limit,
    };
    let summaries = search::search(&conn, args.user, &filters)?;

    if summaries.is_empty() {
        println!("No conversations found matching your criteria.");
        return Ok(());
    }

    println!("Found {} conversation(s):\n", summaries.len());

    for summary in summaries {
        println!("ID: {}", summary.id);
        println!("Date: {}", summary.created_at);
        println!("File: {}", summary.file_path);
        println!(
            "Duration: {:.2}s | Segments: {} | Turns: {}",
            summary.duration_seconds, summary.segment_count, summary.total_turns
        );
        println!("---");
    }

    println!("\nTo export a conversation, use: callscribe export --id <ID>");

    Ok(())
}

pub fn handle_export_command(args: ExportCliArgs) -> Result<()> {
    let format = ExportFormat::from_flag(&args.format)?;

    let conn = db::init_db()?;
    let record = ConversationRepository::get_for_user(&conn, args.id, args.user)?
        .ok_or_else(|| anyhow!("Conversation with ID {} not found", args.id))?;

    let rendered = export::render(&record, format)?;

    match args.output {
        Some(path) => {
            fs::write(&path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported conversation #{} to {}", args.id, path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
