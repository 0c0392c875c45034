use std::sync::{Arc, Mutex};

use chrono::{Datelike, Local, NaiveDate};
use clap::Parser;
use colored::*;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password, Select};
use tasknest::forms::{build_draft, parse_due, DUE_HINT};
use tasknest::render;
use tasknest::views::{
    day_part_sections, progress_stats, recent_completed, shift_month, tasks_left, tasks_on_date,
    week_number, ProfileStats, RECENT_COMPLETED_LIMIT,
};
use tasknest::{
    Client, ClientConfig, ClientError, LoadSource, Priority, RemoteConfig, SyncError, Task,
    TaskDraft, TaskEvent, Theme, ThemeMode,
};
use tasknest_client::config::{ENV_DATABASE_URL, ENV_REMOTE_KEY, ENV_REMOTE_URL};
use tracing_subscriber::EnvFilter;

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;
type Inbox = Arc<Mutex<Vec<TaskEvent>>>;

const PRIORITIES: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

#[derive(Parser)]
#[command(name = "tasknest")]
#[command(about = "Personal task list with reminders and optional sync", long_about = None)]
struct Cli {
    /// Database URL, e.g. sqlite:tasknest.sqlite3?mode=rwc
    #[arg(short, long, env = ENV_DATABASE_URL)]
    database: Option<String>,

    /// Hosted backend base URL
    #[arg(long, env = ENV_REMOTE_URL, requires = "remote_key")]
    remote_url: Option<String>,

    /// Hosted backend API key
    #[arg(long, env = ENV_REMOTE_KEY, requires = "remote_url", hide_env_values = true)]
    remote_key: Option<String>,

    /// Log filter, e.g. "info" or "tasknest_client=debug"
    #[arg(long, env = "TASKNEST_LOG", default_value = "warn")]
    log: String,
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = build_config(&cli)?;

    println!("{}", "📝 TaskNest".bold().cyan());
    println!("{}", "===========".cyan());
    println!("📁 Database: {}", config.database_url.green());
    match &config.remote {
        Some(remote) => println!("🌐 Backend: {}", remote.base_url.blue()),
        None => println!("🌐 Backend: {}", "none (device only)".yellow()),
    }

    let mut client = Client::open(&config).await?;
    let inbox = subscribe(&client)?;
    let source = client.start().await;
    println!(
        "✅ Loaded {} tasks from {}",
        client.store().tasks().len(),
        describe_source(source)
    );
    if let Some(session) = client.session() {
        println!("👤 Signed in as {}", account_name(session).green());
    }
    flush_events(&client, &inbox);
    println!();

    loop {
        let choices = vec![
            "🏠 Home",
            "📅 Calendar",
            "📊 Progress",
            "➕ Add task",
            "✏️  Edit task",
            "✅ Toggle complete",
            "🗑️  Delete task",
            "👤 Profile",
            "❌ Exit",
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("What would you like to do?")
            .items(&choices)
            .default(0)
            .interact()?;

        let theme = current_theme(&client).await;
        let result = match selection {
            0 => show_home(&client, theme),
            1 => show_calendar(&client, theme),
            2 => show_progress(&client, theme),
            3 => add_task(&mut client).await,
            4 => edit_task(&mut client).await,
            5 => toggle_task(&mut client).await,
            6 => delete_task(&mut client).await,
            7 => profile(&mut client).await,
            8 => {
                if Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt("Are you sure you want to exit?")
                    .default(false)
                    .interact()?
                {
                    println!("👋 Goodbye!");
                    break;
                }
                Ok(())
            }
            _ => unreachable!(),
        };

        if let Err(e) = result {
            println!("❌ {}", e.to_string().red());
        }
        flush_events(&client, &inbox);
        println!();
    }

    Ok(())
}

fn build_config(cli: &Cli) -> AppResult<ClientConfig> {
    let mut config = ClientConfig::from_env()?;
    if let Some(database) = &cli.database {
        config.database_url = database.clone();
    }
    if let (Some(url), Some(key)) = (&cli.remote_url, &cli.remote_key) {
        let timeout = config.remote.as_ref().map(|r| r.timeout);
        let mut remote = RemoteConfig::new(url.as_str(), key.as_str());
        if let Some(timeout) = timeout {
            remote.timeout = timeout;
        }
        config.remote = Some(remote);
    }
    Ok(config)
}

fn subscribe(client: &Client) -> AppResult<Inbox> {
    let inbox: Inbox = Arc::default();
    let sink = inbox.clone();
    client.events().register_callback(move |event| {
        if let Ok(mut events) = sink.lock() {
            events.push(event.clone());
        }
    })?;
    Ok(inbox)
}

/// Deliver queued store events and print the ones the user should see.
fn flush_events(client: &Client, inbox: &Inbox) {
    if let Err(e) = client.events().process_events() {
        tracing::warn!("STORE: Could not process events: {}", e);
        return;
    }
    let events = match inbox.lock() {
        Ok(mut events) => std::mem::take(&mut *events),
        Err(_) => return,
    };

    for event in events {
        match event {
            TaskEvent::Warning { message } => println!("⚠️  {}", message.yellow()),
            TaskEvent::ReminderDue { title, body, .. } => {
                println!("🔔 {} {}", title.bold(), body)
            }
            TaskEvent::RemoteWriteFailed { operation, message } => println!(
                "{}",
                format!("📤 Online {operation} failed, change kept on this device: {message}")
                    .dimmed()
            ),
            other => tracing::debug!("STORE: {:?}", other.event_type()),
        }
    }
}

fn describe_source(source: LoadSource) -> &'static str {
    match source {
        LoadSource::Remote => "the server",
        LoadSource::LocalCache => "this device",
        LoadSource::LocalFallback => "this device (server unreachable)",
    }
}

fn account_name(session: &tasknest::Session) -> String {
    session
        .email
        .clone()
        .unwrap_or_else(|| session.user_id.clone())
}

fn system_is_dark() -> bool {
    render::background_is_dark(std::env::var("COLORFGBG").ok().as_deref())
}

async fn current_theme(client: &Client) -> Theme {
    client.theme_mode().await.resolve(system_is_dark())
}

fn print_task(task: &Task, theme: Theme) {
    let badge = task.priority.badge(theme);
    let (r, g, b) = render::hex_rgb(badge.text).unwrap_or((255, 255, 255));
    let (br, bg, bb) = render::hex_rgb(badge.background).unwrap_or((0, 0, 0));

    let title = if task.is_completed {
        task.title.dimmed().strikethrough()
    } else {
        task.title.white().bold()
    };
    let due = task
        .due_date
        .map(|d| format!(" · {}", render::due_label(&d, &Local)))
        .unwrap_or_default();
    let reminder = if task.has_reminder() { " 🔔" } else { "" };

    println!(
        "  {} {} {}{}{} {}",
        render::checkbox(task.is_completed),
        render::priority_icon(task.priority),
        title,
        due.dimmed(),
        reminder,
        format!(" {} ", badge.label)
            .truecolor(r, g, b)
            .on_truecolor(br, bg, bb)
    );
    if !task.description.is_empty() {
        println!("        {}", task.description.dimmed());
    }
}

fn show_home(client: &Client, theme: Theme) -> AppResult<()> {
    let tasks = client.store().tasks();
    let today = Local::now().date_naive();

    println!("{}", today.format("%A, %B %-d").to_string().bold().cyan());
    println!(
        "{}",
        format!("Week {} · {} tasks left", week_number(today), tasks_left(tasks)).dimmed()
    );

    let sections = day_part_sections(tasks, &Local);
    if sections.is_empty() {
        println!("🎉 Nothing left to do.");
    }
    for section in sections {
        println!();
        println!("{} {}", section.part.icon(), section.part.title().bold());
        println!("{}", "─".repeat(40).dimmed());
        for task in section.tasks {
            print_task(task, theme);
        }
    }
    Ok(())
}

fn show_calendar(client: &Client, theme: Theme) -> AppResult<()> {
    let today = Local::now().date_naive();
    let (mut year, mut month) = (today.year(), today.month());

    loop {
        let tasks = client.store().tasks();
        println!();
        println!("{}", render::month_title(year, month).bold().cyan());
        println!("{}", render::WEEKDAY_HEADER.dimmed());
        for week in render::calendar_weeks(year, month, tasks, today, &Local) {
            let line: String = week
                .iter()
                .map(|cell| {
                    let text = cell.text();
                    if cell.is_today {
                        text.black().on_cyan().to_string()
                    } else if cell.has_tasks {
                        text.green().to_string()
                    } else {
                        text
                    }
                })
                .collect();
            println!("{line}");
        }
        println!("{}", "* = tasks due".dimmed());

        let choices = ["◀ Previous month", "▶ Next month", "📋 Tasks on a day", "↩ Back"];
        let selection = Select::with_theme(&ColorfulTheme::default())
            .items(&choices)
            .default(3)
            .interact()?;

        match selection {
            0 => (year, month) = shift_month(year, month, -1),
            1 => (year, month) = shift_month(year, month, 1),
            2 => {
                let day: u32 = Input::with_theme(&ColorfulTheme::default())
                    .with_prompt("Day of month")
                    .interact_text()?;
                let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                    println!("❌ {} has no day {}", render::month_title(year, month), day);
                    continue;
                };
                let due = tasks_on_date(tasks, date, &Local);
                println!("{}", date.format("%A, %B %-d").to_string().bold());
                if due.is_empty() {
                    println!("📭 No tasks for this day");
                }
                for task in due {
                    print_task(task, theme);
                }
            }
            _ => return Ok(()),
        }
    }
}

fn show_progress(client: &Client, theme: Theme) -> AppResult<()> {
    let tasks = client.store().tasks();
    let stats = progress_stats(tasks, Local::now().date_naive(), &Local);

    println!("{}", "📊 Progress".bold().cyan());
    println!(
        "{} {}%",
        render::progress_bar(stats.percentage, 30).green(),
        stats.percentage
    );
    println!(
        "{} of {} tasks completed · today {}/{}",
        stats.completed, stats.total, stats.today_completed, stats.today_total
    );

    let recent = recent_completed(tasks, RECENT_COMPLETED_LIMIT);
    if !recent.is_empty() {
        println!();
        println!("{}", "Recently completed".bold());
        for task in recent {
            print_task(task, theme);
        }
    }
    Ok(())
}

/// Prompt for task fields; `None` when the title was left blank.
fn task_form(existing: Option<&Task>) -> AppResult<Option<TaskDraft>> {
    let theme = ColorfulTheme::default();

    let title: String = Input::with_theme(&theme)
        .with_prompt("Title")
        .with_initial_text(existing.map(|t| t.title.clone()).unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;

    let description: String = Input::with_theme(&theme)
        .with_prompt("Description")
        .with_initial_text(existing.map(|t| t.description.clone()).unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;

    let current = existing.map(|t| t.priority).unwrap_or_default();
    let priority_index = Select::with_theme(&theme)
        .with_prompt("Priority")
        .items(&PRIORITIES)
        .default(PRIORITIES.iter().position(|p| *p == current).unwrap_or(1))
        .interact()?;

    let initial_due = existing
        .and_then(|t| t.due_date)
        .map(|d| d.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let due_date = loop {
        let raw: String = Input::with_theme(&theme)
            .with_prompt(format!("Due ({DUE_HINT})"))
            .with_initial_text(initial_due.clone())
            .allow_empty(true)
            .interact_text()?;
        match parse_due(&raw, &Local) {
            Ok(due) => break due,
            Err(e) => println!("❌ {}", e.to_string().red()),
        }
    };

    Ok(build_draft(
        &title,
        &description,
        PRIORITIES[priority_index],
        due_date,
    ))
}

fn select_task(client: &Client, prompt: &str) -> AppResult<Option<String>> {
    let tasks = client.store().tasks();
    if tasks.is_empty() {
        println!("📭 No tasks yet.");
        return Ok(None);
    }

    let items: Vec<String> = tasks
        .iter()
        .map(|t| render::task_line(t, &Local))
        .collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(&items)
        .default(0)
        .interact_opt()?;
    Ok(selection.map(|i| tasks[i].id.clone()))
}

async fn add_task(client: &mut Client) -> AppResult<()> {
    println!("{}", "📝 New Task".bold().cyan());
    println!("{}", "─".repeat(40).dimmed());

    let Some(draft) = task_form(None)? else {
        println!("{}", "A title is required.".yellow());
        return Ok(());
    };
    if let Some(task) = client.writable_store().await.add(draft).await? {
        println!("✅ Added {}", task.title.green());
    }
    Ok(())
}

async fn edit_task(client: &mut Client) -> AppResult<()> {
    let Some(id) = select_task(client, "Select task to edit")? else {
        return Ok(());
    };
    let Some(existing) = client.store().get(&id).cloned() else {
        return Ok(());
    };

    let Some(draft) = task_form(Some(&existing))? else {
        println!("{}", "A title is required.".yellow());
        return Ok(());
    };
    let task = client.writable_store().await.edit(&id, &draft).await?;
    println!("✅ Saved {}", task.title.green());
    Ok(())
}

async fn toggle_task(client: &mut Client) -> AppResult<()> {
    let Some(id) = select_task(client, "Select task to toggle")? else {
        return Ok(());
    };
    let task = client.writable_store().await.toggle_complete(&id).await?;
    if task.is_completed {
        println!("✅ Completed {}", task.title.green());
    } else {
        println!("↩ Reopened {}", task.title.yellow());
    }
    Ok(())
}

async fn delete_task(client: &mut Client) -> AppResult<()> {
    let Some(id) = select_task(client, "Select task to delete")? else {
        return Ok(());
    };
    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Delete this task?")
        .default(false)
        .interact()?;
    if confirmed {
        let task = client.writable_store().await.delete(&id).await?;
        println!("🗑️  Deleted {}", task.title.red());
    }
    Ok(())
}

async fn profile(client: &mut Client) -> AppResult<()> {
    let stats = ProfileStats::from_tasks(client.store().tasks());

    println!("{}", "👤 Profile".bold().cyan());
    match client.session() {
        Some(session) => println!("Signed in as {}", account_name(session).green()),
        None => println!("{}", "Not signed in, tasks stay on this device".yellow()),
    }
    println!("✅ {} completed   ⏳ {} pending", stats.completed, stats.pending);

    let mode = client.theme_mode().await;
    let shown = mode.resolve(system_is_dark());
    println!("🎨 Theme: {} ({:?})", mode, shown);
    let switch_to = match shown {
        Theme::Dark => "Switch to light mode",
        Theme::Light => "Switch to dark mode",
    };
    if Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(switch_to)
        .default(false)
        .interact()?
    {
        let next: ThemeMode = mode.toggled(system_is_dark());
        client.set_theme_mode(next).await?;
        println!("🎨 Theme set to {}", next);
    }

    if !client.has_remote() {
        println!(
            "{}",
            format!("Set {ENV_REMOTE_URL} and {ENV_REMOTE_KEY} to enable sign in.").dimmed()
        );
        return Ok(());
    }

    if client.session().is_some() {
        let sign_out = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Sign out?")
            .default(false)
            .interact()?;
        if sign_out {
            client.sign_out().await?;
            println!("👋 Signed out");
        }
        return Ok(());
    }

    let choices = ["Sign in", "Create account", "Back"];
    let selection = Select::with_theme(&ColorfulTheme::default())
        .items(&choices)
        .default(0)
        .interact()?;
    if selection == 2 {
        return Ok(());
    }

    let email: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Email")
        .allow_empty(true)
        .interact_text()?;
    let password = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Password")
        .allow_empty_password(true)
        .interact()?;

    let result = if selection == 0 {
        client.sign_in(&email, &password).await.map(Some)
    } else {
        client.sign_up(&email, &password).await
    };

    match result {
        Ok(Some(source)) => println!("✅ Signed in, tasks loaded from {}", describe_source(source)),
        Ok(None) => println!("📧 Check your email to confirm your account, then sign in."),
        Err(e) => println!("❌ {}", auth_message(&e).red()),
    }
    Ok(())
}

fn auth_message(err: &ClientError) -> String {
    match err.as_sync() {
        Some(SyncError::AuthenticationFailed(message)) | Some(SyncError::InvalidOperation(message)) => {
            message.clone()
        }
        _ => err.to_string(),
    }
}
