use clap::{Parser, Subcommand};
use relay::config::{self, NotionSettings, ResolvedConfig};
use relay::records::{NewPerson, NotionRecords, PersonRecord, RecordStore};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "line-notion-relay")]
#[command(about = "Forward LINE chat messages into a Notion database", long_about = None)]
struct Cli {
    /// Config file path (default: RELAY_CONFIG_PATH or ~/.line-notion-relay/config.json)
    #[arg(long, short, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Write a default config file with empty credential slots.
    Init,

    /// Run the webhook server (POST /callback).
    Serve {
        /// HTTP port (default from PORT, config, or 8080)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Save a text message as a new page, the same way the webhook does.
    SaveText {
        text: String,
    },

    /// Add a person record.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
        /// Tag to set (repeatable). Tags are left untouched when omitted.
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// External image URL for the Img property.
        #[arg(long, value_name = "URL")]
        image_url: Option<String>,
    },

    /// Query records whose property equals a value (e.g. --field Name --value Ada).
    Query {
        #[arg(long, default_value = "Name")]
        field: String,
        #[arg(long)]
        value: String,
    },

    /// List every record in the database.
    List,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Version) => {
            println!("line-notion-relay {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Init) => run_init(cli.config),
        Some(Commands::Serve { port }) => run_serve(cli.config, port).await,
        Some(Commands::SaveText { text }) => run_save_text(cli.config, &text).await,
        Some(Commands::Add {
            name,
            title,
            address,
            email,
            phone,
            tags,
            image_url,
        }) => {
            let person = NewPerson {
                name,
                title,
                address,
                email,
                phone_number: phone,
                tags: if tags.is_empty() { None } else { Some(tags) },
                image_url,
            };
            run_add(cli.config, &person).await
        }
        Some(Commands::Query { field, value }) => run_query(cli.config, &field, &value).await,
        Some(Commands::List) => run_list(cli.config).await,
        None => {
            println!("Run with --help for usage");
            Ok(())
        }
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(config::default_config_path);
    if config::init_config_file(&path)? {
        println!("initialized configuration at {}", path.display());
    } else {
        println!("configuration already exists at {}", path.display());
    }
    Ok(())
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (config, path) = config::load_config(config_path)?;
    log::debug!("loaded config from {}", path.display());
    let mut resolved = ResolvedConfig::resolve(&config)?;
    if let Some(p) = port {
        resolved.port = p;
    }
    relay::gateway::run_gateway(resolved).await
}

fn notion_records(config_path: Option<PathBuf>) -> anyhow::Result<NotionRecords> {
    let (config, _) = config::load_config(config_path)?;
    let settings = NotionSettings::resolve(&config)?;
    Ok(NotionRecords::from_settings(&settings))
}

async fn run_save_text(config_path: Option<PathBuf>, text: &str) -> anyhow::Result<()> {
    let records = notion_records(config_path)?;
    records.save_text(text).await?;
    println!("saved to database {}", records.database_id());
    Ok(())
}

async fn run_add(config_path: Option<PathBuf>, person: &NewPerson) -> anyhow::Result<()> {
    let records = notion_records(config_path)?;
    records.add_record(person).await?;
    println!("added {} to database {}", person.name, records.database_id());
    Ok(())
}

async fn run_query(config_path: Option<PathBuf>, field: &str, value: &str) -> anyhow::Result<()> {
    let records = notion_records(config_path)?;
    print_records(&records.query_by_field(field, value).await?)
}

async fn run_list(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let records = notion_records(config_path)?;
    print_records(&records.list_all().await?)
}

fn print_records(records: &[PersonRecord]) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(records)?);
    Ok(())
}
