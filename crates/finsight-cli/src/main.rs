//! Command-line interface for finsight

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use finsight_analyzer::{
    AnalysisPipeline, AnalysisStore, AnalyzerConfig, JsonFileStore, StoredAnalysis, extract_symbols,
};
use finsight_utils::{LogFormat, init_tracing, load_dotenv};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "finsight")]
#[command(about = "Analyze financial questions with live news and market data", long_about = None)]
struct Cli {
    /// User that owns the analyses
    #[arg(long, env = "FINSIGHT_USER", default_value = "local", global = true)]
    user: String,

    /// JSON file holding saved analyses
    #[arg(
        long,
        env = "FINSIGHT_STORE_PATH",
        default_value = ".finsight/analyses.json",
        global = true
    )]
    store: PathBuf,

    /// Print records as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log output format (text or json)
    #[arg(long, env = "FINSIGHT_LOG_FORMAT", default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a financial question and save the result
    Analyze {
        /// The question, e.g. "Will Infosys stock rise this quarter?"
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// List saved analyses, most recent first
    History {
        /// Maximum number of entries
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show one saved analysis
    Show { id: String },
    /// Delete a saved analysis
    Delete { id: String },
    /// Print the ticker symbols found in a question
    Symbols {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env must be applied before clap reads its env fallbacks
    let dotenv = load_dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    if let Some(path) = dotenv {
        debug!(path = %path.display(), "loaded environment file");
    }

    let store = JsonFileStore::new(&cli.store);

    match cli.command {
        Commands::Analyze { query } => {
            let config = AnalyzerConfig::from_env()?;
            let raw = query.join(" ");
            let query = config.validate_query(&raw)?;
            config.require_credentials()?;

            info!(user = %cli.user, "running analysis");
            let pipeline = AnalysisPipeline::from_config(&config, Arc::new(store))?;
            let record = pipeline
                .run(&cli.user, query)
                .await
                .context("analysis could not be saved")?;

            print_record(&record, cli.json)?;
        }
        Commands::History { limit } => {
            let limit = match limit {
                Some(n) => n,
                None => AnalyzerConfig::from_env()?.history_limit,
            };
            let records = store.list_by_user(&cli.user, limit).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No saved analyses for {}", cli.user);
            } else {
                for record in &records {
                    println!("{}", record.summary());
                }
            }
        }
        Commands::Show { id } => {
            let record = store.get_for_user(&id, &cli.user).await?;
            print_record(&record, cli.json)?;
        }
        Commands::Delete { id } => {
            if !store.delete(&id, &cli.user).await? {
                bail!("analysis {id} not found");
            }
            println!("Deleted {id}");
        }
        Commands::Symbols { query } => {
            let symbols = extract_symbols(&query.join(" "));
            if cli.json {
                println!("{}", serde_json::to_string(&symbols)?);
            } else {
                for symbol in symbols {
                    println!("{symbol}");
                }
            }
        }
    }

    Ok(())
}

fn print_record(record: &StoredAnalysis, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
    } else {
        print!("{}", render_record(record));
    }
    Ok(())
}

fn render_record(record: &StoredAnalysis) -> String {
    let mut out = String::new();
    out.push_str(&format!("Analysis {}\n", record.id));
    out.push_str(&format!("Query:    {}\n", record.query));
    out.push_str(&format!(
        "Created:  {}\n",
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("Model:    {}\n", record.analysis.model_name));

    if !record.context.quotes.is_empty() {
        out.push_str("\nQuotes:\n");
        for (symbol, quote) in &record.context.quotes {
            match &quote.error {
                Some(err) => out.push_str(&format!("  {symbol:<12} unavailable ({err})\n")),
                None => out.push_str(&format!(
                    "  {symbol:<12} {} ({}) {}\n",
                    quote.price, quote.change_percent, quote.name
                )),
            }
        }
    }

    out.push_str(&format!("\nNews: {}\n", record.context.news_summary));
    for article in &record.context.articles {
        out.push_str(&format!("  - {} <{}>\n", article.title, article.url));
    }

    out.push_str(&format!("\n{}\n", record.analysis.analysis_text));
    if let Some(err) = &record.analysis.error {
        out.push_str(&format!("\n(analysis degraded: {err})\n"));
    }

    out
}
