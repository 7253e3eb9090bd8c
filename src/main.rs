use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use estadia::config::AppConfig;
use estadia::error::AppError;
use estadia::portfolio::schedule::{occupancy, OccupancySources};
use estadia::portfolio::trash::{
    SortDirection, TrashKind, TrashListing, TrashPage, TrashQuery, TrashQueryService,
    TrashedAccommodation, TrashedExpense, TrashedProperty, TrashedStay, TrashedTenant,
};
use estadia::portfolio::{load_snapshot, Datastore, Visibility};
use estadia::telemetry;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "estadia",
    about = "Back-office console for the rental portfolio",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the occupancy board for a snapshot
    Occupancy(OccupancyArgs),
    /// List trashed rows of one kind
    Trash(TrashArgs),
}

#[derive(Args, Debug)]
struct OccupancyArgs {
    /// Directory holding the per-table CSV exports
    #[arg(long)]
    data: PathBuf,
    /// Reference date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
struct TrashArgs {
    /// Directory holding the per-table CSV exports
    #[arg(long)]
    data: PathBuf,
    /// properties, accommodations, stays, tenants, or expenses
    #[arg(long, default_value = "properties")]
    kind: String,
    /// Substring filter over the kind's search fields
    #[arg(long)]
    search: Option<String>,
    /// Sort field; unknown fields fall back to most recently trashed
    #[arg(long)]
    sort_by: Option<String>,
    /// asc or desc
    #[arg(long)]
    sort_dir: Option<String>,
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    page: usize,
    /// Emit the page as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(err) = run_cli() {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Occupancy(args) => run_occupancy(args),
        Command::Trash(args) => run_trash(args, config.trash.page_size),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn run_occupancy(args: OccupancyArgs) -> Result<(), AppError> {
    let store = load_snapshot(&args.data)?;
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    info!(%today, "rendering occupancy board");

    let categories = store.list_stay_categories();
    let accommodations = store.list_accommodations(Visibility::Default);
    let mut occupied = 0;

    println!("Occupancy board ({today})");
    for accommodation in &accommodations {
        let property = store
            .property(accommodation.property_id, Visibility::WithTrashed)
            .map(|property| property.label)
            .unwrap_or_else(|_| "(unknown property)".to_string());
        let stays = store.stays_of(accommodation.id, Visibility::Default)?;
        let mut tenants = Vec::new();
        for stay in &stays {
            tenants.extend(store.tenants_of(stay.id, Visibility::Default)?);
        }

        let sources = OccupancySources {
            stays: &stays,
            tenants: &tenants,
            categories: &categories,
        };
        let badge = occupancy(&sources, today);

        if badge.occupied {
            occupied += 1;
            println!(
                "- {} / {}: occupied ({} tenants, {}, until {})",
                property,
                accommodation.label,
                badge.active_tenant_count,
                badge.active_category.as_deref().unwrap_or("uncategorized"),
                badge
                    .active_stay_end
                    .map(|date| date.to_string())
                    .unwrap_or_default(),
            );
        } else {
            println!("- {} / {}: vacant", property, accommodation.label);
        }
    }

    println!(
        "\n{} of {} accommodations occupied",
        occupied,
        accommodations.len()
    );
    Ok(())
}

fn run_trash(args: TrashArgs, page_size: usize) -> Result<(), AppError> {
    let store = load_snapshot(&args.data)?;
    let service = TrashQueryService::with_page_size(store, page_size);

    let query = TrashQuery {
        kind: TrashKind::parse(&args.kind),
        search: args.search.unwrap_or_default(),
        sort_by: args.sort_by.unwrap_or_default(),
        sort_dir: SortDirection::parse(&args.sort_dir.unwrap_or_default()),
        page: args.page,
    };
    let listing = service.list(&query);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!("Trash: {} ({} total)", query.kind.label(), listing.total());
    match &listing {
        TrashListing::Properties(page) => render_properties(page),
        TrashListing::Accommodations(page) => render_accommodations(page),
        TrashListing::Stays(page) => render_stays(page),
        TrashListing::Tenants(page) => render_tenants(page),
        TrashListing::Expenses(page) => render_expenses(page),
    }
    Ok(())
}

fn render_footer<T>(page: &TrashPage<T>) {
    println!("page {} of {} ({} per page)", page.page, page.last_page, page.per_page);
}

fn render_properties(page: &TrashPage<TrashedProperty>) {
    for item in &page.items {
        println!(
            "- #{} {} | {} | trashed {}",
            item.property.id,
            item.property.label,
            item.property.address,
            trashed_stamp(item.property.deleted_at),
        );
    }
    render_footer(page);
}

fn render_accommodations(page: &TrashPage<TrashedAccommodation>) {
    for item in &page.items {
        println!(
            "- #{} {} | property {} | trashed {}",
            item.accommodation.id,
            item.accommodation.label,
            item.property
                .as_ref()
                .map(|property| property.label.as_str())
                .unwrap_or("?"),
            trashed_stamp(item.accommodation.deleted_at),
        );
    }
    render_footer(page);
}

fn render_stays(page: &TrashPage<TrashedStay>) {
    for item in &page.items {
        println!(
            "- #{} {} -> {} | {} | {} | trashed {}",
            item.stay.id,
            item.stay.start_date,
            item.stay.end_date,
            item.accommodation
                .as_ref()
                .map(|accommodation| accommodation.label.as_str())
                .unwrap_or("?"),
            item.stay.price_display(),
            trashed_stamp(item.stay.deleted_at),
        );
    }
    render_footer(page);
}

fn render_tenants(page: &TrashPage<TrashedTenant>) {
    for item in &page.items {
        println!(
            "- #{} {} | {} | {} | trashed {}",
            item.tenant.id,
            item.tenant.name,
            item.tenant.email.as_deref().unwrap_or("-"),
            item.tenant.cpf_formatted().as_deref().unwrap_or("-"),
            trashed_stamp(item.tenant.deleted_at),
        );
    }
    render_footer(page);
}

fn render_expenses(page: &TrashPage<TrashedExpense>) {
    for item in &page.items {
        println!(
            "- #{} {} | {} | {} | trashed {}",
            item.expense.id,
            item.expense.label,
            item.expense.price_display(),
            item.property
                .as_ref()
                .map(|property| property.label.as_str())
                .unwrap_or("?"),
            trashed_stamp(item.expense.deleted_at),
        );
    }
    render_footer(page);
}

fn trashed_stamp(deleted_at: Option<chrono::DateTime<chrono::Utc>>) -> String {
    deleted_at
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}
