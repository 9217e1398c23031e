use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{debug, info};

use tender_intake::config::{resolve_publications_path, resolve_store_path, GateSettings, MarketplaceSettings};
use tender_intake::draft::{format_budget_range, render_draft};
use tender_intake::fetch::run_fetch;
use tender_intake::fetch::watch;
use tender_intake::filter::{filter_opportunities, retain_theme, CountryFilter, FilterState, ProcurementFilter};
use tender_intake::models::{Project, Publication};
use tender_intake::server::{serve, ServeSettings};
use tender_intake::store::{load_json_or_default, NoticeStore};
use tender_intake::themes::{classify, find_theme, group_by_theme, ThemeKind, Themed, OPPORTUNITY_THEMES};

/// Tender intake - fetch, browse and draft responses to procurement notices
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Notice store file (overrides NOTICES_PATH; default "output/notices.json")
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the opportunities API and draft endpoints
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3000")]
        addr: SocketAddr,

        /// Publications catalog used to enrich draft references (overrides PUBLICATIONS_PATH)
        #[arg(long)]
        publications: Option<PathBuf>,
    },
    /// Fetch recently updated notices once and replace the store
    Fetch {
        /// Look-back window in days
        #[arg(long, default_value_t = 1)]
        days: u32,
    },
    /// Fetch on a fixed interval until interrupted
    Watch {
        #[arg(long, default_value_t = 24)]
        interval_hours: u64,

        #[arg(long, default_value_t = 1)]
        days: u32,
    },
    /// Print stored opportunities that pass the given filters
    List {
        #[arg(long, default_value_t = 0)]
        min_score: i64,

        /// All, RFP, RFQ, ITB or EOI
        #[arg(long, default_value = "All")]
        procurement_type: ProcurementFilter,

        #[arg(long, default_value = "All")]
        country: CountryFilter,

        /// Minimum budget ceiling
        #[arg(long, default_value_t = 0.0)]
        budget_min: f64,

        #[arg(long, default_value = "")]
        search: String,

        /// Only show one theme (dfs, digital-id, infra, privacy, health, markets)
        #[arg(long)]
        theme: Option<String>,

        /// Group rows by theme instead of store order
        #[arg(long)]
        group: bool,
    },
    /// Render the EOI draft for one opportunity
    Draft {
        id: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Group a content catalog (projects or publications) by theme
    Themes {
        #[arg(value_enum)]
        kind: CatalogKind,

        file: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CatalogKind {
    Projects,
    Publications,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    let args = Args::parse();
    let store_path = resolve_store_path(args.store);
    debug!("Using notice store: {}", store_path.display());

    match args.command {
        Command::Serve { addr, publications } => {
            let gate = GateSettings::from_env();
            if gate.is_none() {
                info!("SITE_USERNAME/SITE_PASSWORD not set; pages are served without a gate");
            }
            serve(ServeSettings {
                addr,
                store_path,
                publications_path: resolve_publications_path(publications),
                gate,
            })
            .await?;
        }

        Command::Fetch { days } => {
            let settings = MarketplaceSettings::from_env().context("marketplace configuration")?;
            let store = NoticeStore::new(store_path);
            let count = run_fetch(settings, &store, days).await.context("fetch run failed")?;
            info!("Stored {} notices in {}", count, store.path().display());
        }

        Command::Watch { interval_hours, days } => {
            let settings = MarketplaceSettings::from_env().context("marketplace configuration")?;
            let store = NoticeStore::new(store_path);
            let period = std::time::Duration::from_secs(interval_hours.max(1) * 60 * 60);
            watch(settings, &store, period, days, async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await;
        }

        Command::List { min_score, procurement_type, country, budget_min, search, theme, group } => {
            let only = match theme.as_deref() {
                Some(id) => Some(find_theme(OPPORTUNITY_THEMES, id).with_context(|| format!("unknown theme '{}'", id))?),
                None => None,
            };
            let list = NoticeStore::new(store_path).load_opportunities()?;
            let state = FilterState { min_score, procurement_type, country, budget_min, search };
            let mut kept = filter_opportunities(&list, &state);
            if let Some(only) = only {
                kept = retain_theme(kept, only);
            }
            info!("Filter - total={}, kept={}", list.len(), kept.len());

            if group {
                for g in group_by_theme(&kept, OPPORTUNITY_THEMES) {
                    println!("{} {} ({})", g.theme.icon, g.theme.label, g.members.len());
                    for opp in g.members {
                        println!("    {}", row(opp.total_score, &format_budget_range(opp.budget.as_ref()), &opp.title));
                    }
                }
            } else {
                for opp in kept {
                    let theme = classify(opp, OPPORTUNITY_THEMES).map(|t| t.id).unwrap_or("-");
                    println!(
                        "{:<11} {}",
                        theme,
                        row(opp.total_score, &format_budget_range(opp.budget.as_ref()), &opp.title)
                    );
                }
            }
        }

        Command::Draft { id, out } => {
            let list = NoticeStore::new(store_path).load_opportunities()?;
            let opp = list
                .iter()
                .find(|o| o.id == id)
                .with_context(|| format!("no opportunity with id '{}' in the store", id))?;
            let text = render_draft(opp);
            match out {
                Some(path) => {
                    std::fs::write(&path, &text).with_context(|| format!("writing {}", path.display()))?;
                    info!("Draft written - id={}, path={}", id, path.display());
                }
                None => print!("{}", text),
            }
        }

        Command::Themes { kind, file } => match kind {
            CatalogKind::Projects => {
                let items: Vec<Project> = load_json_or_default(&file)?;
                print_groups(&items, ThemeKind::Project);
            }
            CatalogKind::Publications => {
                let items: Vec<Publication> = load_json_or_default(&file)?;
                print_groups(&items, ThemeKind::Publication);
            }
        },
    }

    Ok(())
}

fn row(score: i64, budget: &str, title: &str) -> String {
    format!("{:>3}  {:<30} {}", score, budget, title)
}

fn print_groups<T: Themed>(items: &[T], kind: ThemeKind) {
    for g in group_by_theme(items, kind.table()) {
        println!("{} {} ({})", g.theme.icon, g.theme.label, g.members.len());
        for item in g.members {
            println!("    {}", item.title());
        }
    }
}
