use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/snippets.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inserts a snippet directly, bypassing the API's login requirement.
    SeedSnippet {
        #[arg(long)]
        author: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long)]
        body: String,
    },
    /// Creates or replaces a static page such as `about` or `help`.
    PutDocument {
        #[arg(long)]
        name: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::SeedSnippet {
            author,
            title,
            body,
        } => {
            if author.trim().is_empty() || body.trim().is_empty() {
                bail!("author and body must not be empty");
            }
            let snippet = storage.insert_snippet(author.trim(), title.trim(), &body).await?;
            println!("created snippet id={}", snippet.id);
        }
        Command::PutDocument { name, title, body } => {
            let document = storage.upsert_document(name.trim(), &title, &body).await?;
            println!("stored document name={}", document.name);
        }
    }

    Ok(())
}
