use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tabula_access::{authorize, dashboard_menu, menu_for_role, page_title, redirect_for, RouteId, SessionRole};
use tabula_api::identity::{demo_users, DEMO_PASSWORD};
use tabula_api::{authorized_session, IdentityProvider, InMemoryIdentity, ListUsersQuery, SignInRequest, User};
use tabula_core::{ColumnRegistry, SortDirection};
use tabula_filter::query::find_column;
use tabula_filter::{parse_filter_token, parse_query, resolve_filters, suggest_columns, FilterToken};
use tabula_table::{Table, TableConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(name = "tabulactl", version, about = "Tabula CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// JSON file with an array of users (default: built-in demo users)
    #[arg(long = "data", global = true)]
    data: Option<PathBuf>,

    /// Log filter directives, written to stderr
    #[arg(long = "log", env = "TABULA_LOG", global = true, default_value = "info")]
    log: String,

    /// Serve Prometheus metrics on this address while the command runs
    #[arg(long = "metrics-addr", env = "TABULA_METRICS_ADDR", global = true)]
    metrics_addr: Option<SocketAddr>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Search box text: free words plus `col=value` / `col:op=value` tokens
    #[arg(short = 'q', long = "query")]
    query: Option<String>,
    /// Extra filter token, e.g. `role=admin,user` or `created-at:between=2024-01-01..2024-03-31`
    #[arg(short = 'f', long = "filter")]
    filter: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show one page of the user table
    Users {
        #[command(flatten)]
        filters: FilterArgs,
        /// Sort key `COL[:asc|:desc]`; repeat for tie-breakers
        #[arg(short = 's', long = "sort")]
        sort: Vec<String>,
        /// 1-based page number (clamped to the last page)
        #[arg(long = "page", default_value_t = 1)]
        page: usize,
        #[arg(long = "page-size")]
        page_size: Option<usize>,
        /// Hide a column by id
        #[arg(long = "hide")]
        hide: Vec<String>,
    },
    /// Distinct values of an option column with counts
    Facets {
        column: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// List the user table columns
    Columns {
        /// Fuzzy match against filterable column ids and labels
        #[arg(long = "find")]
        find: Option<String>,
    },
    /// Check whether a role may open a route
    Authorize {
        /// Route key (`account`) or path (`/dashboard/account`)
        #[arg(long = "route")]
        route: String,
        #[arg(long = "role")]
        role: Option<String>,
    },
    /// Dashboard menu visible to a role
    Menu {
        #[arg(long = "role")]
        role: String,
    },
}

fn init_tracing(directives: &str) {
    let filter = EnvFilter::from_str(directives).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn init_metrics(addr: Option<SocketAddr>) {
    let Some(addr) = addr else { return };
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => info!(%addr, "metrics exporter listening"),
        Err(e) => warn!(error = %e, %addr, "metrics exporter not installed"),
    }
}

fn read_users(path: &Path) -> Result<Vec<User>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing users from {}", path.display()))
}

/// Load users the way the account page does: an admin session passes the route gate,
/// then lists users newest first.
async fn load_users(data: Option<&Path>) -> Result<Vec<User>> {
    let users = match data {
        Some(p) => read_users(p)?,
        None => demo_users(),
    };
    let admin_email = users
        .iter()
        .find(|u| u.role().is_some_and(|r| r.is_admin()))
        .map(|u| u.email.clone())
        .ok_or_else(|| anyhow!("no admin account in user data"))?;
    let identity = InMemoryIdentity::with_users(users, DEMO_PASSWORD);
    let session = identity
        .sign_in(SignInRequest { email: admin_email, password: DEMO_PASSWORD.into(), remember_me: false })
        .await
        .context("signing in as admin")?;
    let token = session.session.token;
    authorized_session(&identity, &token, RouteId::Account).await.context("opening account page")?;
    let users = identity.list_users(&token, ListUsersQuery::default()).await.context("listing users")?;
    info!(count = users.len(), "users loaded");
    Ok(users)
}

fn user_table(users: Vec<User>, multi_sort: bool) -> Result<Table<User>> {
    let mut config = TableConfig::from_env();
    config.multi_sort |= multi_sort;
    let columns = tabula_api::user_columns().context("building user columns")?;
    Ok(Table::with_config(users, columns, config))
}

fn apply_filters(table: &mut Table<User>, args: &FilterArgs) -> Result<()> {
    let parsed = parse_query(args.query.as_deref().unwrap_or(""));
    let mut tokens: Vec<FilterToken> = parsed.filters;
    for raw in &args.filter {
        let tok = parse_filter_token(raw)
            .with_context(|| format!("filter `{raw}`"))?
            .ok_or_else(|| anyhow!("filter `{raw}` is not of the form column=value"))?;
        tokens.push(tok);
    }
    let filters = resolve_filters(table.columns(), &tokens).context("resolving filters")?;
    for f in filters {
        debug!(column = %f.column_id, operator = %f.operator, "applying filter");
        table.set_column_filter(&f.column_id, f.operator, Some(f.operand));
    }
    table.set_global_filter(parsed.free_text);
    Ok(())
}

/// Resolve `COL[:asc|:desc]` keys to sortable column ids. A repeated column keeps its
/// first position and its last direction.
fn sort_plan(columns: &ColumnRegistry<User>, keys: &[String]) -> Result<Vec<(String, SortDirection)>> {
    let mut plan: Vec<(String, SortDirection)> = Vec::new();
    for key in keys {
        let (name, dir) = match key.rsplit_once(':') {
            Some((n, d)) => (n, SortDirection::from_str(d).map_err(|e| anyhow!(e))?),
            None => (key.as_str(), SortDirection::Asc),
        };
        let col = find_column(columns, name).ok_or_else(|| anyhow!("unknown column `{name}`"))?;
        if !col.sortable { bail!("column `{}` is not sortable", col.id); }
        match plan.iter_mut().find(|(id, _)| *id == col.id) {
            Some(entry) => entry.1 = dir,
            None => plan.push((col.id.clone(), dir)),
        }
    }
    Ok(plan)
}

fn apply_sort(table: &mut Table<User>, keys: &[String]) -> Result<()> {
    let plan = sort_plan(table.columns(), keys)?;
    table.clear_sorting();
    for (id, dir) in plan {
        // asc on first toggle, desc on second
        let toggles = if dir == SortDirection::Asc { 1 } else { 2 };
        for _ in 0..toggles { table.toggle_sort_multi(&id); }
    }
    Ok(())
}

fn print_json<T: Serialize>(v: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

/// Role given on the command line, standing in for a session.
struct RoleArg(Option<String>);

impl SessionRole for RoleArg {
    fn role(&self) -> Option<&str> { self.0.as_deref() }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log);
    init_metrics(cli.metrics_addr);

    match cli.command {
        Commands::Users { filters, sort, page, page_size, hide } => {
            let users = load_users(cli.data.as_deref()).await?;
            let mut table = user_table(users, sort.len() > 1)?;
            apply_filters(&mut table, &filters)?;
            apply_sort(&mut table, &sort)?;
            for col in &hide {
                let c = find_column(table.columns(), col).ok_or_else(|| anyhow!("unknown column `{col}`"))?;
                if !c.hideable { bail!("column `{}` cannot be hidden", c.id); }
                let id = c.id.clone();
                table.set_column_visibility(&id, false);
            }
            if let Some(size) = page_size {
                if size == 0 { bail!("--page-size must be at least 1"); }
                table.set_page_size(size);
            }
            table.go_to_page(page.saturating_sub(1));

            let grid = render::grid(&table, &render::UserCells);
            let info = table.page_info();
            match cli.output {
                Output::Human => {
                    println!("{}", render::format_human(&grid));
                    println!();
                    println!("{}  ({} of {} rows)", info.label(), info.filtered_rows, info.total_rows);
                }
                Output::Json => {
                    #[derive(Serialize)]
                    struct PageOut<'a> {
                        columns: &'a [String],
                        rows: Vec<serde_json::Value>,
                        page: tabula_table::PageInfo,
                        state: &'a tabula_table::ViewState,
                    }
                    print_json(&PageOut { columns: &grid.ids, rows: render::rows_json(&grid), page: info, state: table.state() })?;
                }
            }
        }
        Commands::Facets { column, filters } => {
            let users = load_users(cli.data.as_deref()).await?;
            let mut table = user_table(users, false)?;
            apply_filters(&mut table, &filters)?;
            let col = find_column(table.columns(), &column).ok_or_else(|| anyhow!("unknown column `{column}`"))?;
            if col.filter_kind() != Some(tabula_core::FilterKind::Option) {
                bail!("column `{}` is not an option column", col.id);
            }
            let facets = table.faceted_values(&col.id);
            match cli.output {
                Output::Human => {
                    println!("{:<20} {:<22} COUNT", "VALUE", "LABEL");
                    for f in &facets {
                        println!("{:<20} {:<22} {}", f.option.value, f.option.label, f.count);
                    }
                }
                Output::Json => print_json(&facets)?,
            }
        }
        Commands::Columns { find } => {
            let columns = tabula_api::user_columns()?;
            #[derive(Serialize)]
            struct ColumnOut<'a> {
                id: &'a str,
                label: &'a str,
                filter: Option<tabula_core::FilterKind>,
                sortable: bool,
                hideable: bool,
                searchable: bool,
                score: Option<i64>,
            }
            let listed: Vec<ColumnOut> = match find.as_deref() {
                Some(q) => suggest_columns(&columns, q).into_iter().map(|(c, s)| (c, Some(s))).collect::<Vec<_>>(),
                None => columns.iter().map(|c| (c, None)).collect(),
            }
            .into_iter()
            .map(|(c, score)| ColumnOut {
                id: &c.id,
                label: &c.meta.label,
                filter: c.filter_kind(),
                sortable: c.sortable,
                hideable: c.hideable,
                searchable: c.searchable,
                score,
            })
            .collect();
            match cli.output {
                Output::Human => {
                    println!("{:<16} {:<16} {:<7} SORT  HIDE", "ID", "LABEL", "FILTER");
                    for c in &listed {
                        let filter = c.filter.map(|k| k.as_str()).unwrap_or("-");
                        let yn = |b: bool| if b { "yes" } else { "no" };
                        println!("{:<16} {:<16} {:<7} {:<5} {}", c.id, c.label, filter, yn(c.sortable), yn(c.hideable));
                    }
                }
                Output::Json => print_json(&listed)?,
            }
        }
        Commands::Authorize { route, role } => {
            let route = RouteId::from_str(&route)?;
            let has_session = role.is_some();
            let decision = authorize(route, Some(RoleArg(role)));
            let meta = route.meta();
            let redirect = redirect_for(meta.path, has_session);
            match cli.output {
                Output::Human => {
                    match &decision {
                        Ok(_) => println!("allowed: {}", page_title(route, "tabula")),
                        Err(e) => println!("denied: {e}"),
                    }
                    if let Some(to) = redirect { println!("redirect: {to}"); }
                }
                Output::Json => {
                    #[derive(Serialize)]
                    struct AuthorizeOut {
                        allowed: bool,
                        route: tabula_access::RouteMeta,
                        title: String,
                        redirect: Option<&'static str>,
                    }
                    print_json(&AuthorizeOut {
                        allowed: decision.is_ok(),
                        route: meta,
                        title: page_title(route, "tabula"),
                        redirect,
                    })?;
                }
            }
        }
        Commands::Menu { role } => {
            let menu = menu_for_role(&role, &dashboard_menu());
            match cli.output {
                Output::Human => {
                    for section in &menu {
                        println!("{}", section.section);
                        for item in &section.items {
                            println!("  {:<12} {}", item.label(), item.path());
                            for sub in &item.sub_menu {
                                let mark = if sub.destructive { " (!)" } else { "" };
                                println!("    - {}{}", sub.label, mark);
                            }
                        }
                    }
                }
                Output::Json => print_json(&menu)?,
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_api::user_columns;

    fn keys(k: &[&str]) -> Vec<String> { k.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["tabulactl", "menu", "--role", "user", "--metrics-addr", "127.0.0.1:9300", "-o", "json"])
            .unwrap();
        assert_eq!(cli.output, Output::Json);
        assert_eq!(cli.metrics_addr, Some("127.0.0.1:9300".parse().unwrap()));
        assert!(Cli::try_parse_from(["tabulactl", "menu", "--metrics-addr", "not-an-addr"]).is_err());
    }

    #[test]
    fn repeated_sort_key_keeps_last_direction() {
        let cols = user_columns().unwrap();
        let plan = sort_plan(&cols, &keys(&["name", "email:desc", "name:desc"])).unwrap();
        assert_eq!(plan, vec![("name".to_string(), SortDirection::Desc), ("email".to_string(), SortDirection::Desc)]);
        assert!(sort_plan(&cols, &keys(&["number"])).is_err());
        assert!(sort_plan(&cols, &keys(&["nope"])).is_err());
    }

    #[test]
    fn repeated_sort_key_still_sorts() {
        let mut table = user_table(demo_users(), true).unwrap();
        apply_sort(&mut table, &keys(&["name", "name:desc"])).unwrap();
        assert_eq!(table.sort_direction("name"), Some(SortDirection::Desc));
        let first = table.visible_rows().iter().next().map(|u| u.name.clone());
        assert_eq!(first.as_deref(), Some("Tomas Novak"));
    }
}
