//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `tracker_core` linkage without Flutter/FFI setup.
//! - Print a deterministic demo view computed over an in-memory database.

use std::process::ExitCode;
use tracker_core::{
    format_day, open_db_in_memory, parse_day, FixedClock, NewTracker, Schedule,
    SqliteTrackerRepository, TrackerFilter, TrackerService, Weekday,
};

const DEMO_TODAY: &str = "2024-05-07";

fn main() -> ExitCode {
    println!("tracker_core ping={}", tracker_core::ping());
    println!("tracker_core version={}", tracker_core::core_version());

    match run_demo() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("demo failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_demo() -> Result<(), Box<dyn std::error::Error>> {
    let today = parse_day(DEMO_TODAY).ok_or("invalid demo date")?;
    let conn = open_db_in_memory()?;
    let repo = SqliteTrackerRepository::try_new(&conn)?;
    let mut service = TrackerService::load_with_clock(repo, FixedClock(today))?;

    let read = service.add_tracker(demo_tracker(
        "Read",
        "📚",
        [Weekday::Tuesday, Weekday::Thursday].into_iter().collect(),
        "Study",
    ))?;
    service.add_tracker(demo_tracker("Run", "🏃", Schedule::every_day(), "Health"))?;
    let milk = service.add_tracker(demo_tracker("Buy milk", "🥛", Schedule::one_off(), "Errands"))?;
    service.toggle_completion(milk, today)?;
    service.pin_tracker(read)?;

    for filter in TrackerFilter::ALL {
        println!("view date={} filter={}", format_day(today), filter.as_str());
        for section in service.get_view(today, filter) {
            let marker = if section.is_pinned { " (pinned)" } else { "" };
            println!("  {}{marker}", section.title);
            for item in section.items {
                let check = if item.is_completed { "x" } else { " " };
                println!(
                    "    [{check}] {} {} done={}",
                    item.tracker.emoji, item.tracker.title, item.completed_count
                );
            }
        }
    }
    println!("total_completions={}", service.statistics().total_completions);
    Ok(())
}

fn demo_tracker(title: &str, emoji: &str, schedule: Schedule, category: &str) -> NewTracker {
    NewTracker {
        title: title.to_string(),
        emoji: emoji.to_string(),
        color: "default".to_string(),
        schedule,
        category_title: category.to_string(),
    }
}
