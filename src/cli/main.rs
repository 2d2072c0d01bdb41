use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use event_indexer::config::Config;
use event_indexer::models::{EventSeverity, EventStatus};
use event_indexer::search::{
    EventFilter, EventIndex, EventSort, EventSortField, EventSummaryRequest, SortDirection,
};
use event_indexer::settings::{encode_settings, SettingsValidator};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "event-index-cli")]
#[command(about = "Inspect and maintain an event summary index", long_about = None)]
struct Cli {
    /// Index directory (defaults to the configured search.index_path)
    #[arg(short, long, env = "EVENT_INDEX_PATH")]
    index_path: Option<PathBuf>,

    /// Index name used in logs
    #[arg(short, long, default_value = "event_summary")]
    name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List events matching a filter
    List {
        /// Status names, e.g. NEW or ACKNOWLEDGED
        #[arg(short = 's', long = "status")]
        statuses: Vec<EventStatus>,

        /// Severity names, e.g. WARNING
        #[arg(short = 'S', long = "severity")]
        severities: Vec<EventSeverity>,

        /// Element identifier, `*` and `?` allowed
        #[arg(short = 'e', long)]
        element: Option<String>,

        /// Summary text, `*` and `?` allowed
        #[arg(long)]
        summary: Option<String>,

        /// Event class path, e.g. /Status or /Perf/*
        #[arg(short = 'c', long = "class")]
        event_class: Option<String>,

        #[arg(short = 't', long = "tag")]
        tags: Vec<String>,

        #[arg(long, value_enum, default_value = "last-seen")]
        sort: SortArg,

        #[arg(long)]
        ascending: bool,

        #[arg(short, long)]
        limit: Option<i64>,

        #[arg(short, long)]
        offset: Option<i64>,
    },

    /// Show one event
    Get {
        #[arg(value_name = "UUID")]
        uuid: Uuid,
    },

    /// Severity counts of open events per tag
    Severities {
        #[arg(short, long = "tag", required = true, value_name = "TAG")]
        tags: Vec<String>,
    },

    /// Worst open severity per tag
    Worst {
        #[arg(short, long = "tag", required = true, value_name = "TAG")]
        tags: Vec<String>,
    },

    /// Delete events last seen at least this many days ago
    Purge {
        #[arg(short, long)]
        days: i64,
    },

    /// Delete every event in the index
    Clear,

    /// Consolidate segments and expunge deletes
    Optimize,

    /// Print index statistics
    Stats,

    /// Validate the configuration and print the effective event settings
    Settings,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Count,
    Element,
    SubElement,
    Class,
    Summary,
    FirstSeen,
    LastSeen,
    Severity,
    Status,
    StatusChange,
    UpdateTime,
}

impl From<SortArg> for EventSortField {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Count => EventSortField::Count,
            SortArg::Element => EventSortField::ElementIdentifier,
            SortArg::SubElement => EventSortField::ElementSubIdentifier,
            SortArg::Class => EventSortField::EventClass,
            SortArg::Summary => EventSortField::EventSummary,
            SortArg::FirstSeen => EventSortField::FirstSeen,
            SortArg::LastSeen => EventSortField::LastSeen,
            SortArg::Severity => EventSortField::Severity,
            SortArg::Status => EventSortField::Status,
            SortArg::StatusChange => EventSortField::StatusChange,
            SortArg::UpdateTime => EventSortField::UpdateTime,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("event_indexer={}", config.observability.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays machine-readable
    if config.observability.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load().context("failed to load configuration")?;
    init_tracing(&config);

    if let Some(path) = cli.index_path {
        config.search.index_path = path;
    }
    let open_index = || {
        EventIndex::open(cli.name.clone(), &config.search).with_context(|| {
            format!("failed to open index at {}", config.search.index_path.display())
        })
    };

    match cli.command {
        Commands::Settings => {
            let validator = SettingsValidator::new(&config.partitions);
            let records = encode_settings(&config.events)?;
            print_json(&serde_json::json!({
                "max_archive_purge_days": validator.max_archive_purge_days(),
                "max_occurrence_purge_days": validator.max_occurrence_purge_days(),
                "settings": records,
            }))?;
        }

        Commands::List {
            statuses,
            severities,
            element,
            summary,
            event_class,
            tags,
            sort,
            ascending,
            limit,
            offset,
        } => {
            let filter = EventFilter {
                statuses,
                severities,
                element_identifier: element,
                summary,
                event_class,
                tags,
                ..Default::default()
            };
            let direction = if ascending {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            };

            let mut request = EventSummaryRequest::new()
                .with_filter(filter)
                .with_sort(EventSort::new(sort.into(), direction));
            if let Some(limit) = limit {
                request = request.with_limit(limit);
            }
            if let Some(offset) = offset {
                request = request.with_offset(offset);
            }

            print_json(&open_index()?.list(&request)?)?;
        }

        Commands::Get { uuid } => match open_index()?.find_by_uuid(&uuid)? {
            Some(event) => print_json(&event)?,
            None => anyhow::bail!("no event with uuid {}", uuid),
        },

        Commands::Severities { tags } => print_json(&open_index()?.count_severities(&tags)?)?,

        Commands::Worst { tags } => print_json(&open_index()?.find_worst_severity(&tags)?)?,

        Commands::Purge { days } => {
            let index = open_index()?;
            index.purge(chrono::Duration::days(days))?;
            print_json(&index.stats())?;
        }

        Commands::Clear => {
            let index = open_index()?;
            index.clear()?;
            print_json(&index.stats())?;
        }

        Commands::Optimize => {
            let index = open_index()?;
            index.optimize()?;
            print_json(&index.stats())?;
        }

        Commands::Stats => print_json(&open_index()?.stats())?,
    }

    Ok(())
}
