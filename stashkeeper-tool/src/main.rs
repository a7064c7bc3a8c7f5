mod commands;
mod config;
mod error;
mod snapshot;
mod store;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{PriceArgs, SearchArgs};
use crate::config::{load_config, resolve_store_config};
use crate::store::{AppContext, StoreType};

#[derive(Parser)]
#[command(name = "stk")]
#[command(about = "Search, price and track your stash", long_about = None)]
struct Cli {
    /// Store type: rocks or memory
    #[arg(long, global = true)]
    store_type: Option<StoreType>,

    /// Path to the settings store
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Filter and sort the items of a snapshot
    Search {
        /// Item snapshot file (JSON)
        snapshot: PathBuf,

        #[command(flatten)]
        args: SearchArgs,

        /// Store this search under its name
        #[arg(long)]
        save: bool,

        /// Run a saved search instead of the given options
        #[arg(long, conflicts_with = "save")]
        load: Option<String>,
    },
    /// Set or clear buyouts
    Buyout {
        /// Item snapshot file (JSON)
        snapshot: PathBuf,

        #[command(subcommand)]
        action: BuyoutCommand,
    },
    /// Show or change which tabs get refreshed
    Refresh {
        /// Item snapshot file (JSON)
        snapshot: PathBuf,

        #[command(subcommand)]
        action: RefreshCommand,
    },
    /// Build and store the forum shop posts
    Shop {
        #[command(subcommand)]
        action: ShopCommand,
    },
    /// Record or list currency snapshots
    Currency {
        #[command(subcommand)]
        action: CurrencyCommand,
    },
    /// Read or write a setting
    Setting {
        #[command(subcommand)]
        action: SettingCommand,
    },
}

#[derive(Subcommand)]
enum BuyoutCommand {
    /// Price one or more items
    Item {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
        #[command(flatten)]
        price: PriceArgs,
    },
    /// Price a whole tab (`#<n>` or label)
    Tab {
        tab: String,
        #[command(flatten)]
        price: PriceArgs,
    },
    /// Remove an item or tab buyout
    Clear {
        #[arg(long)]
        item: Option<String>,
        #[arg(long)]
        tab: Option<String>,
    },
}

#[derive(Subcommand)]
enum ShopCommand {
    /// Rebuild the posts from a snapshot and store them if they changed
    Update {
        /// Item snapshot file (JSON)
        snapshot: PathBuf,
        /// Store even if nothing changed
        #[arg(long)]
        force: bool,
    },
    /// Set the forum thread ids the posts go to
    Threads {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },
    /// Set the post template; `[items]` marks where items go
    Template { template: String },
    /// Print the last stored posts
    Show,
}

#[derive(Subcommand)]
enum RefreshCommand {
    List,
    Check {
        tab: String,
        /// Uncheck instead
        #[arg(long)]
        off: bool,
    },
    Lock {
        tab: String,
        /// Unlock instead
        #[arg(long)]
        off: bool,
    },
}

#[derive(Subcommand)]
enum CurrencyCommand {
    Add {
        value: String,
        /// Seconds since the Unix epoch; defaults to now
        #[arg(long)]
        timestamp: Option<u64>,
    },
    List,
}

#[derive(Subcommand)]
enum SettingCommand {
    Get {
        key: String,
        #[arg(long, default_value = "")]
        default: String,
    },
    Set {
        key: String,
        value: String,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("STK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = load_config()?;
    let (store_type, store_path) = resolve_store_config(&config, cli.store_type, cli.store);
    let ctx = AppContext::open(store_type, store_path, config.league, config.realm)?;

    match cli.command {
        Command::Search {
            snapshot,
            args,
            save,
            load,
        } => {
            print_lines(commands::search(&ctx, &snapshot, &args, save, load.as_deref())?);
        }
        Command::Buyout { snapshot, action } => match action {
            BuyoutCommand::Item { ids, price } => {
                print_lines(commands::set_item_buyouts(&ctx, &snapshot, &ids, &price)?);
            }
            BuyoutCommand::Tab { tab, price } => {
                println!("{}", commands::set_tab_buyout(&ctx, &snapshot, &tab, &price)?);
            }
            BuyoutCommand::Clear { item, tab } => {
                commands::clear_buyout(&ctx, &snapshot, item.as_deref(), tab.as_deref())?;
            }
        },
        Command::Shop { action } => match action {
            ShopCommand::Update { snapshot, force } => {
                print_lines(commands::shop_update(&ctx, &snapshot, force)?);
            }
            ShopCommand::Threads { ids } => commands::shop_set_threads(&ctx, ids)?,
            ShopCommand::Template { template } => commands::shop_set_template(&ctx, &template)?,
            ShopCommand::Show => print_lines(commands::shop_show(&ctx)?),
        },
        Command::Refresh { snapshot, action } => match action {
            RefreshCommand::List => print_lines(commands::refresh_list(&ctx, &snapshot)?),
            RefreshCommand::Check { tab, off } => {
                commands::refresh_set(&ctx, &snapshot, &tab, Some(!off), None)?;
            }
            RefreshCommand::Lock { tab, off } => {
                commands::refresh_set(&ctx, &snapshot, &tab, None, Some(!off))?;
            }
        },
        Command::Currency { action } => match action {
            CurrencyCommand::Add { value, timestamp } => {
                let timestamp = commands::currency_add(&ctx, value, timestamp)?;
                println!("recorded at {}", timestamp);
            }
            CurrencyCommand::List => print_lines(commands::currency_list(&ctx)?),
        },
        Command::Setting { action } => match action {
            SettingCommand::Get { key, default } => {
                println!("{}", ctx.store.get(&key, &default)?);
            }
            SettingCommand::Set { key, value } => ctx.store.set(&key, &value)?,
        },
    }

    Ok(())
}
