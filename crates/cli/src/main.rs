//! Resman CLI - resource workload and allocation.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use resman_core::{
    Assignment, Member, MemberId, Project, ProjectId, ProjectStatus, Task, TaskFilter, Team,
    TeamDirectory, WorkingDays, WorkloadLevel,
};
use resman_storage::{JsonStorage, Storage};
use resman_allocation::{
    classify_workload, is_weekend, week_start, AllocationEngine, EngineConfig,
};

#[derive(Parser)]
#[command(name = "resman")]
#[command(about = "Team workload and allocation", long_about = None)]
struct Cli {
    /// Store directory
    #[arg(long, global = true, default_value = ".resman")]
    store: PathBuf,

    /// Engine config file (defaults to <store>/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List members over capacity
    Overloaded {
        /// Date to evaluate (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show a week of allocations per member
    Heatmap {
        /// Any date in the week (defaults to this week)
        #[arg(long)]
        week: Option<NaiveDate>,
    },
    /// Classify allocated hours against a capacity
    Classify {
        /// Allocated hours
        hours: f64,
        /// Daily capacity
        capacity: f64,
    },
    /// Summarise member workload over a date range
    Summary {
        /// First day
        #[arg(long)]
        from: NaiveDate,
        /// Last day
        #[arg(long)]
        to: NaiveDate,
    },
    /// Show overloaded staff per project
    Health {
        /// Date to evaluate (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print tasks with their daily hours as JSON
    Enrich,
    /// Report data-quality findings
    Diagnose,
    /// Manage members
    #[command(subcommand)]
    Member(MemberCommand),
    /// Manage teams
    #[command(subcommand)]
    Team(TeamCommand),
    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommand),
}

#[derive(Subcommand)]
enum MemberCommand {
    /// Add a member
    Add {
        /// Display name
        name: String,
        /// Daily capacity in hours
        #[arg(long, default_value = "8")]
        capacity: f64,
        /// Team name (repeatable)
        #[arg(long = "team")]
        teams: Vec<String>,
    },
    /// List members
    List {
        /// Only members of this team
        #[arg(long)]
        team: Option<String>,
    },
    /// Remove a member with no assignments
    Remove {
        /// Member ID
        id: MemberId,
    },
}

#[derive(Subcommand)]
enum TeamCommand {
    /// Register a team name
    Add {
        /// Team name
        name: String,
    },
    /// List teams
    List,
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// Add a project
    Add {
        /// Project name
        name: String,
        /// on-track, at-risk or off-track
        #[arg(long, default_value = "on-track")]
        status: ProjectStatus,
    },
    /// List projects
    List,
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Add a task
    Add {
        /// Task name
        name: String,
        /// Owning project
        #[arg(long)]
        project: ProjectId,
        /// First day
        #[arg(long)]
        start: NaiveDate,
        /// Last day
        #[arg(long)]
        end: NaiveDate,
        /// Estimated total hours
        #[arg(long)]
        hours: f64,
        /// MEMBER_ID:EFFORT[:DAYS], DAYS as 0-6 codes like 1,2,3 (repeatable)
        #[arg(long = "assign", value_parser = parse_assignment)]
        assignments: Vec<Assignment>,
    },
    /// List tasks
    List {
        /// Only tasks of this project
        #[arg(long)]
        project: Option<ProjectId>,
        /// Only tasks assigned to this member
        #[arg(long)]
        assignee: Option<MemberId>,
        /// Only tasks active on this date
        #[arg(long)]
        active_on: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli.store, cli.config.as_deref())?;
    let engine = AllocationEngine::from_config(&config);

    let storage = JsonStorage::new(&cli.store)
        .await
        .with_context(|| format!("failed to open store {}", cli.store.display()))?;
    debug!("Using store {}", storage.root().display());

    match cli.command {
        Commands::Overloaded { date } => {
            let date = date.unwrap_or_else(today);
            let snapshot = storage.snapshot().await?;
            let alerts = engine.overload_alerts(&snapshot.members, &snapshot.tasks, date);

            println!("Overloaded on {} ({})", date, alerts.len());
            for alert in alerts {
                println!(
                    "  {} | {} | {:.2}h / {:.2}h | {}",
                    alert.member_id, alert.name, alert.allocated, alert.capacity, alert.level
                );
            }
        }
        Commands::Heatmap { week } => {
            let start = week_start(week.unwrap_or_else(today));
            let snapshot = storage.snapshot().await?;
            let heatmap = engine.weekly_heatmap(&snapshot.members, &snapshot.tasks, start);

            let header: Vec<String> = heatmap
                .days
                .iter()
                .map(|d| {
                    let label = d.format("%a %d").to_string();
                    if is_weekend(*d) {
                        format!("({})", label)
                    } else {
                        label
                    }
                })
                .collect();
            println!("{:<20} {}", "Member", header.join("  "));
            for row in &heatmap.rows {
                let cells: Vec<String> = row
                    .hours
                    .iter()
                    .zip(row.levels.iter())
                    .map(|(hours, level)| format!("{:>5.1}{}", hours, level_marker(*level)))
                    .collect();
                println!("{:<20} {}", truncate(&row.name, 20), cells.join("  "));
            }
        }
        Commands::Classify { hours, capacity } => {
            println!("{}", classify_workload(hours, capacity));
        }
        Commands::Summary { from, to } => {
            if to < from {
                bail!("--to ({}) is before --from ({})", to, from);
            }
            let snapshot = storage.snapshot().await?;
            let summaries = engine.member_summaries(&snapshot.members, &snapshot.tasks, from, to);

            println!("Workload {} .. {}", from, to);
            for s in summaries {
                println!(
                    "  {} | total {:.1}h | avg {:.2}h | peak {:.2}h ({}) | {} overloaded day(s)",
                    s.name, s.total_hours, s.average_hours, s.peak_hours, s.peak_level, s.overloaded_days
                );
            }
        }
        Commands::Health { date } => {
            let date = date.unwrap_or_else(today);
            let snapshot = storage.snapshot().await?;
            let health = engine.portfolio_health(&snapshot.projects, &snapshot.members, &snapshot.tasks, date);
            let names = snapshot.member_index();

            println!("Portfolio health on {}", date);
            for project in health {
                let status = project.status.map_or("-", |s| s.as_str());
                println!(
                    "  {} [{}] | {} task(s), {} active",
                    project.name, status, project.task_count, project.active_task_count
                );
                for id in project.overloaded_assignees {
                    let name = names.get(&id).map_or("?", |m| m.name.as_str());
                    println!("    overloaded: {} ({})", name, id);
                }
            }
        }
        Commands::Enrich => {
            let tasks = storage.list_tasks(&TaskFilter::default()).await?;
            let enriched = engine.enrich_tasks(&tasks);
            println!("{}", serde_json::to_string_pretty(&enriched)?);
        }
        Commands::Diagnose => {
            let snapshot = storage.snapshot().await?;
            let findings = engine.diagnose(&snapshot);
            if findings.is_empty() {
                println!("No findings");
            }
            for finding in findings {
                println!("  {}", finding);
            }
        }
        Commands::Member(cmd) => run_member(&storage, cmd).await?,
        Commands::Team(cmd) => run_team(&storage, cmd).await?,
        Commands::Project(cmd) => run_project(&storage, cmd).await?,
        Commands::Task(cmd) => run_task(&storage, &engine, cmd).await?,
    }

    Ok(())
}

async fn run_member(storage: &JsonStorage, cmd: MemberCommand) -> Result<()> {
    match cmd {
        MemberCommand::Add { name, capacity, teams } => {
            let member = teams
                .into_iter()
                .fold(Member::new(name, capacity), Member::with_team);
            let directory = TeamDirectory::new(&storage.list_teams().await?);
            for team in unregistered_teams(&directory, &member) {
                warn!("Team '{}' is not registered, add it with `resman team add`", team);
            }
            storage.save_member(&member).await?;
            info!("Added member {}", member.id);
            println!("Added member: {} - {}", member.id, member.name);
        }
        MemberCommand::List { team } => {
            let all = storage.list_members().await?;
            let members: Vec<&Member> = match team.as_deref() {
                Some(name) => TeamDirectory::new(&storage.list_teams().await?).members_of(name, &all),
                None => all.iter().collect(),
            };

            println!("Members ({})", members.len());
            for m in members {
                let teams: Vec<&str> = m.teams.iter().map(String::as_str).collect();
                println!("  {} | {} | {}h | {}", m.id, m.name, m.capacity, teams.join(", "));
            }
        }
        MemberCommand::Remove { id } => {
            if storage.load_member(id).await?.is_none() {
                bail!("member {} not found", id);
            }
            storage.delete_member(id).await?;
            println!("Removed member {}", id);
        }
    }
    Ok(())
}

async fn run_team(storage: &JsonStorage, cmd: TeamCommand) -> Result<()> {
    match cmd {
        TeamCommand::Add { name } => {
            let team = Team::new(name);
            storage.save_team(&team).await?;
            println!("Added team: {} - {}", team.id, team.name);
        }
        TeamCommand::List => {
            let teams = storage.list_teams().await?;
            println!("Teams ({})", teams.len());
            for t in teams {
                println!("  {} | {}", t.id, t.name);
            }
        }
    }
    Ok(())
}

async fn run_project(storage: &JsonStorage, cmd: ProjectCommand) -> Result<()> {
    match cmd {
        ProjectCommand::Add { name, status } => {
            let project = Project::new(name).with_status(status);
            storage.save_project(&project).await?;
            println!("Added project: {} - {}", project.id, project.name);
        }
        ProjectCommand::List => {
            let projects = storage.list_projects().await?;
            println!("Projects ({})", projects.len());
            for p in projects {
                println!("  {} | {} | {}", p.id, p.status.as_str(), p.name);
            }
        }
    }
    Ok(())
}

async fn run_task(storage: &JsonStorage, engine: &AllocationEngine, cmd: TaskCommand) -> Result<()> {
    match cmd {
        TaskCommand::Add { name, project, start, end, hours, assignments } => {
            let task = assignments
                .into_iter()
                .fold(Task::new(project, name, start, end, hours), Task::with_assignment);
            storage.save_task(&task).await?;
            println!(
                "Added task: {} - {} ({:.2}h/day)",
                task.id,
                task.name,
                engine.daily_hours_for_task(&task)
            );
        }
        TaskCommand::List { project, assignee, active_on } => {
            let filter = TaskFilter {
                project_id: project,
                assignee_id: assignee,
                active_on,
            };
            let tasks = storage.list_tasks(&filter).await?;

            println!("Tasks ({})", tasks.len());
            for t in tasks {
                println!(
                    "  {} | {} .. {} | {}h | {} assignee(s) | {}",
                    t.id,
                    t.start_date,
                    t.end_date,
                    t.hours,
                    t.assignments.len(),
                    t.name
                );
            }
        }
    }
    Ok(())
}

fn load_config(store: &Path, explicit: Option<&Path>) -> Result<EngineConfig> {
    let config = match explicit {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::load_or_default(store.join("config.json"))?,
    };
    Ok(config)
}

/// Team names on `member` that the directory does not know.
fn unregistered_teams(directory: &TeamDirectory, member: &Member) -> Vec<String> {
    directory.resolve_member(member).1
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Parse `MEMBER_ID:EFFORT[:DAYS]`.
fn parse_assignment(s: &str) -> std::result::Result<Assignment, String> {
    let mut parts = s.splitn(3, ':');
    let member = parts
        .next()
        .unwrap_or_default()
        .parse::<MemberId>()
        .map_err(|e| format!("invalid member id: {}", e))?;
    let effort = parts
        .next()
        .ok_or_else(|| "missing effort, expected MEMBER_ID:EFFORT[:DAYS]".to_string())?
        .parse::<f64>()
        .map_err(|e| format!("invalid effort: {}", e))?;
    let days = match parts.next() {
        None => WorkingDays::WEEKDAYS,
        Some(list) => {
            let codes = list
                .split(',')
                .map(|c| c.trim().parse::<u8>())
                .collect::<std::result::Result<Vec<u8>, _>>()
                .map_err(|e| format!("invalid weekday code: {}", e))?;
            WorkingDays::from_codes(codes).map_err(|e| e.to_string())?
        }
    };
    Ok(Assignment::new(member, days, effort))
}

fn level_marker(level: WorkloadLevel) -> &'static str {
    match level {
        WorkloadLevel::Unknown => "?",
        WorkloadLevel::Idle | WorkloadLevel::Light | WorkloadLevel::Good => " ",
        WorkloadLevel::High => "~",
        WorkloadLevel::Overloaded => "!",
        WorkloadLevel::CriticallyOverloaded => "#",
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max - 1).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment_defaults_to_weekdays() {
        let id = MemberId::new();
        let a = parse_assignment(&format!("{}:60", id)).unwrap();
        assert_eq!(a.assignee_id, id);
        assert_eq!(a.effort, 60.0);
        assert_eq!(a.working_days, WorkingDays::WEEKDAYS);
    }

    #[test]
    fn test_parse_assignment_with_days() {
        let id = MemberId::new();
        let a = parse_assignment(&format!("{}:40:2,4", id)).unwrap();
        assert_eq!(a.working_days.codes(), vec![2, 4]);
    }

    #[test]
    fn test_parse_assignment_errors() {
        assert!(parse_assignment("nope:50").is_err());
        assert!(parse_assignment(&MemberId::new().to_string()).is_err());
        assert!(parse_assignment(&format!("{}:50:9", MemberId::new())).is_err());
    }

    #[test]
    fn test_cli_parses_global_store() {
        let cli = Cli::try_parse_from(["resman", "heatmap", "--store", "/tmp/x", "--week", "2024-06-05"]).unwrap();
        assert_eq!(cli.store, PathBuf::from("/tmp/x"));
        assert!(matches!(cli.command, Commands::Heatmap { week: Some(_) }));
    }

    #[test]
    fn test_unregistered_teams() {
        let directory = TeamDirectory::new(&[Team::new("design")]);
        let member = Member::new("Ana", 8.0).with_team("design").with_team("ops");
        assert_eq!(unregistered_teams(&directory, &member), vec!["ops".to_string()]);
        assert!(unregistered_teams(&directory, &Member::new("Bo", 8.0)).is_empty());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 20), "short");
        assert_eq!(truncate("abcdef", 4).chars().count(), 4);
    }
}
