//! Mealz - plan the week's dinners from the terminal
//!
//! Talks to the Mealz REST API:
//! - recipes and ingredients
//! - the month calendar with add / move / leftover / remove
//! - per-week grocery lists
//! - a streamed chat with the sous chef

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

use mealz::api::ApiClient;
use mealz::cache::QueryCache;
use mealz::calendar::{self, DropOutcome, MonthGrid, WeekPlanAggregator, week_start_for};
use mealz::chat::{ChatController, ChatState, ChatView, QUICK_SUGGESTIONS};
use mealz::config::Config;
use mealz::grocery::{aggregate_grocery_list, ordered_categories};
use mealz::recipes::RecipeCatalog;
use mealz::types::{ChatContext, ChatRole, GroceryList, MealSlot};

#[derive(Parser)]
#[command(name = "mealz", version)]
#[command(about = "Recipes, meal calendar, grocery lists and the sous-chef chat")]
struct Args {
    /// API base URL (overrides MEALZ_API_URL and ~/.mealz/config.toml)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Request timeout in seconds (not applied to chat streaming)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List recipes
    Recipes {
        #[arg(long, short)]
        search: Option<String>,
        #[arg(long, short)]
        tag: Option<String>,
    },
    /// Show one recipe with ingredients and instructions
    Recipe { id: i64 },
    /// List ingredients
    Ingredients {
        #[arg(long, short)]
        search: Option<String>,
    },
    /// List ingredient categories
    Categories,
    /// Show the month calendar
    Plan {
        /// Month as YYYY-MM (defaults to this month)
        #[arg(long, value_parser = parse_month)]
        month: Option<NaiveDate>,
    },
    /// Schedule a recipe as dinner on a date
    Add { date: NaiveDate, recipe_id: i64 },
    /// Move a slot to another date
    Move {
        slot_id: i64,
        date: NaiveDate,
        /// Month the slot is currently shown in (YYYY-MM)
        #[arg(long, value_parser = parse_month)]
        month: Option<NaiveDate>,
    },
    /// Toggle the leftover flag of a slot
    Leftover {
        slot_id: i64,
        #[arg(long, value_parser = parse_month)]
        month: Option<NaiveDate>,
    },
    /// Remove a slot
    Remove {
        slot_id: i64,
        #[arg(long, value_parser = parse_month)]
        month: Option<NaiveDate>,
    },
    /// Grocery list for the week containing a date
    Grocery {
        #[arg(long)]
        week: Option<NaiveDate>,
        /// Aggregate from recipes on this machine instead of asking the server
        #[arg(long)]
        local: bool,
    },
    /// Ask the sous chef one question and stream the answer
    Chat {
        #[arg(long, value_enum, default_value_t = ContextArg::General)]
        context: ContextArg,
        /// Recipe id for --context recipe
        #[arg(long)]
        recipe: Option<i64>,
        message: Option<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ContextArg {
    General,
    Week,
    Recipe,
}

fn parse_month(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d")
        .map_err(|_| format!("expected YYYY-MM, got {:?}", value))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from ~/.mealz/.env or current dir)
    let env_path = dirs::home_dir()
        .map(|h| h.join(".mealz").join(".env"))
        .filter(|p| p.exists());
    if let Some(path) = env_path {
        let _ = dotenvy::from_path(&path);
    } else {
        let _ = dotenvy::dotenv();
    }

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mealz=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // CLI args > env vars > config file > defaults
    let mut config = Config::from_env();
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    if let Some(secs) = args.timeout {
        config.request_timeout = std::time::Duration::from_secs(secs);
    }
    debug!(?config, "Resolved config");

    let api = Arc::new(ApiClient::new(&config).context("Failed to create API client")?);
    let cache = Arc::new(QueryCache::new());

    match args.command {
        Command::Recipes { search, tag } => {
            let recipes = api.fetch_recipes(search.as_deref(), tag.as_deref()).await?;
            if recipes.is_empty() {
                println!("No recipes found.");
            }
            for recipe in recipes {
                let minutes = recipe.prep_time_min.unwrap_or(0) + recipe.cook_time_min.unwrap_or(0);
                println!(
                    "{:>4}  {:<32} {:>3} min  serves {:<2} {}",
                    recipe.id,
                    recipe.name,
                    minutes,
                    recipe.servings,
                    recipe.tags.join(", ")
                );
            }
        }

        Command::Recipe { id } => {
            let recipe = api
                .fetch_recipe(id)
                .await
                .with_context(|| format!("Failed to load recipe {}", id))?;
            println!("{} (serves {})", recipe.name, recipe.servings);
            if let Some(description) = &recipe.description {
                println!("{}", description);
            }
            println!();
            for line in &recipe.ingredients {
                let name = line.ingredient_name.as_deref().unwrap_or("?");
                let optional = if line.optional { " (optional)" } else { "" };
                match &line.preparation {
                    Some(prep) => println!("  {} {} {}, {}{}", line.quantity, line.unit, name, prep, optional),
                    None => println!("  {} {} {}{}", line.quantity, line.unit, name, optional),
                }
            }
            if let Some(instructions) = &recipe.instructions {
                println!("\n{}", instructions);
            }
        }

        Command::Ingredients { search } => {
            for ingredient in api.fetch_ingredients(search.as_deref()).await? {
                println!(
                    "{:>4}  {:<28} {:<10} {}",
                    ingredient.id, ingredient.name, ingredient.category, ingredient.default_unit
                );
            }
        }

        Command::Categories => {
            for category in api.fetch_categories().await? {
                println!("{}", category);
            }
        }

        Command::Plan { month } => {
            let calendar = load_calendar(&api, &cache, &config, month).await?;
            print_calendar(&calendar);
        }

        Command::Add { date, recipe_id } => {
            let mut calendar = load_calendar(&api, &cache, &config, Some(date)).await?;
            let slot = calendar.add_slot(date, recipe_id).await?;
            println!("Added slot {} on {}", slot.id, slot.date);
        }

        Command::Move {
            slot_id,
            date,
            month,
        } => {
            let mut calendar = load_calendar(&api, &cache, &config, month).await?;
            if !calendar.drag_start(slot_id) {
                bail!("Slot {} is not on the calendar for {}", slot_id, calendar.grid().title());
            }
            match calendar.drag_end(slot_id, Some(date)).await? {
                DropOutcome::Moved(slot) => println!("Moved slot {} to {}", slot.id, slot.date),
                DropOutcome::SameDate => println!("Slot {} is already on {}", slot_id, date),
                DropOutcome::NoTarget | DropOutcome::SlotMissing => {
                    println!("Nothing to move")
                }
            }
        }

        Command::Leftover { slot_id, month } => {
            let mut calendar = load_calendar(&api, &cache, &config, month).await?;
            let slot = find_slot(&calendar, slot_id)?;
            let updated = calendar.toggle_leftover(&slot).await?;
            println!(
                "Slot {} is {}a leftover",
                updated.id,
                if updated.is_leftover { "" } else { "no longer " }
            );
        }

        Command::Remove { slot_id, month } => {
            let mut calendar = load_calendar(&api, &cache, &config, month).await?;
            let slot = find_slot(&calendar, slot_id)?;
            calendar.delete_slot(&slot).await?;
            println!("Removed slot {}", slot_id);
        }

        Command::Grocery { week, local } => {
            let day = week.unwrap_or_else(calendar::today);
            let week_start = week_start_for(day, config.week_starts_on);
            let Some(plan) = api.fetch_week_plan(week_start).await? else {
                println!("No plan for the week of {}", week_start);
                return Ok(());
            };

            let list = if local {
                let ids: Vec<i64> = plan.slots.iter().filter_map(|s| s.recipe_id).collect();
                let mut catalog = RecipeCatalog::new(api.clone(), cache.clone());
                let recipes = catalog.get_many(&ids).await?;
                aggregate_grocery_list(plan.id, &plan.slots, &recipes)
            } else {
                api.fetch_grocery_list(plan.id).await?
            };
            print_grocery_list(week_start, &list);
        }

        Command::Chat {
            context,
            recipe,
            message,
        } => {
            let context = match (context, recipe) {
                (ContextArg::Recipe, Some(id)) => ChatContext::Recipe(id),
                (ContextArg::Recipe, None) => bail!("--context recipe needs --recipe <id>"),
                (ContextArg::Week, _) => {
                    let week_start = week_start_for(calendar::today(), config.week_starts_on);
                    match api.fetch_week_plan(week_start).await? {
                        Some(plan) => ChatContext::WeekPlan(plan.id),
                        None => ChatContext::General,
                    }
                }
                (ContextArg::General, _) => ChatContext::General,
            };
            run_chat(api, cache, context, message).await?;
        }
    }

    Ok(())
}

async fn load_calendar(
    api: &Arc<ApiClient>,
    cache: &Arc<QueryCache>,
    config: &Config,
    month: Option<NaiveDate>,
) -> Result<WeekPlanAggregator<ApiClient>> {
    let month = month.unwrap_or_else(calendar::today);
    let grid = MonthGrid::containing(month, config.week_starts_on)
        .with_context(|| format!("No calendar for {}", month))?;
    let mut calendar = WeekPlanAggregator::new(api.clone(), cache.clone(), grid);
    calendar.refresh().await.context("Failed to load week plans")?;
    Ok(calendar)
}

fn find_slot(calendar: &WeekPlanAggregator<ApiClient>, slot_id: i64) -> Result<MealSlot> {
    calendar
        .index()
        .find_slot(slot_id)
        .cloned()
        .with_context(|| format!("Slot {} is not on the calendar for {}", slot_id, calendar.grid().title()))
}

fn print_calendar(calendar: &WeekPlanAggregator<ApiClient>) {
    let grid = calendar.grid();
    println!("{}", grid.title());
    println!("{}", grid.headers().join("  "));

    for week in grid.weeks() {
        println!();
        for day in week {
            let marker = if grid.is_in_month(*day) { ' ' } else { '·' };
            let slots = calendar.index().slots_on(*day);
            if slots.is_empty() {
                println!("{}{}", marker, day.format("%a %d"));
                continue;
            }
            for (i, slot) in slots.iter().enumerate() {
                let label = if i == 0 {
                    format!("{}{}", marker, day.format("%a %d"))
                } else {
                    " ".repeat(7)
                };
                println!("{}  [{}] {}", label, slot.id, describe_slot(slot));
            }
        }
    }
}

fn describe_slot(slot: &MealSlot) -> String {
    let name = slot
        .recipe_name
        .clone()
        .or_else(|| slot.notes.clone())
        .unwrap_or_else(|| slot.meal_type.clone());
    if slot.is_leftover {
        format!("{} (leftover)", name)
    } else {
        name
    }
}

fn print_grocery_list(week_start: NaiveDate, list: &GroceryList) {
    println!("Groceries for the week of {}", week_start);
    if list.is_empty() {
        println!("Nothing to buy.");
        return;
    }
    for (category, items) in ordered_categories(list) {
        println!("\n{}", category.to_uppercase());
        for item in items {
            println!(
                "  [ ] {} {} {}  ({})",
                item.total_quantity,
                item.unit,
                item.ingredient_name,
                item.recipes.join(", ")
            );
        }
    }
}

async fn run_chat(
    api: Arc<ApiClient>,
    cache: Arc<QueryCache>,
    context: ChatContext,
    message: Option<String>,
) -> Result<()> {
    let mut chat = ChatController::new(api, cache);
    chat.start_session(context)
        .await
        .context("Failed to start chat session")?;

    let message = match message {
        Some(message) => message,
        None => prompt_for_message()?,
    };

    let mut views = chat.subscribe();
    let printer = tokio::spawn(async move {
        let mut printed = 0;
        let mut last_status: Option<String> = None;
        let mut out = std::io::stdout();

        while let Some(view) = views.recv().await {
            if view.state != ChatState::Streaming {
                continue;
            }
            if view.tool_status != last_status {
                if let Some(status) = &view.tool_status {
                    let _ = writeln!(out, "\n  … {}", status);
                }
                last_status = view.tool_status.clone();
            }
            if let Some(text) = streaming_text(&view)
                && text.len() > printed
            {
                let _ = write!(out, "{}", &text[printed..]);
                let _ = out.flush();
                printed = text.len();
            }
        }
        println!();
    });

    let result = chat.send(&message).await;
    if let Some(error) = chat.view().last_tool_error {
        eprintln!("(tool {} failed: {})", error.tool, error.error);
    }
    drop(chat);
    let _ = printer.await;

    result.context("Chat failed")?;
    Ok(())
}

fn streaming_text(view: &ChatView) -> Option<&str> {
    view.messages
        .iter()
        .rev()
        .find(|m| m.is_ephemeral() && m.role == ChatRole::Assistant)
        .map(|m| m.content.as_str())
}

fn prompt_for_message() -> Result<String> {
    println!("Quick suggestions:");
    for (i, suggestion) in QUICK_SUGGESTIONS.iter().enumerate() {
        println!("  {}. {}", i + 1, suggestion);
    }
    print!("> ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let line = line.trim();

    let picked = line
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| QUICK_SUGGESTIONS.get(i));
    match picked {
        Some(suggestion) => Ok(suggestion.to_string()),
        None if line.is_empty() => bail!("No message given"),
        None => Ok(line.to_string()),
    }
}
