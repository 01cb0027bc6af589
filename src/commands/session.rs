use std::io::Write;

use anyhow::Result;
use colored::Colorize;
use fitcoach::{
    CoachError, emit,
    clock::{IntervalTicker, TickSource},
    models::WorkoutLog,
    session::{ExitOutcome, Phase, Step, TickOutcome, WorkoutSession},
    storage::DataStore,
    utils::{format_clock, format_weight},
};
use itertools::Itertools;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::broadcast::error::RecvError;

use super::{Ctx, plan::print_plan, plan::sorted_plans, resolve};
use crate::cli::SessionCmd;

const UP_NEXT: usize = 3;
const BAR_WIDTH: usize = 20;

pub async fn handle<S: DataStore>(cmd: SessionCmd, ctx: &Ctx<S>) -> Result<()> {
    match cmd {
        SessionCmd::Start { plan } => {
            let plan = match plan {
                Some(key) => {
                    let plans = sorted_plans(ctx).await?;
                    match resolve(&plans, &key, |p| p.id.as_str()) {
                        Some(p) => p.clone(),
                        None => {
                            println!("{} no plan `{}`", "error:".red().bold(), key);
                            return Ok(());
                        }
                    }
                }
                None => {
                    let prefs = super::plan::preferences(ctx).await?;
                    ctx.plans.get_today_plan(&prefs, ctx.now()).await?
                }
            };

            let session = match WorkoutSession::start(plan, ctx.now(), ctx.settings.session()) {
                Ok(s) => s,
                Err(e) => {
                    println!("{} {}", "error:".red().bold(), e);
                    return Ok(());
                }
            };

            let input = BufReader::new(tokio::io::stdin());
            if let Some(log) = drive(session, ctx, IntervalTicker::every_second(), input).await? {
                emit(ctx.fmt, &log, |log| {
                    println!();
                    super::log::print_log(log);
                })?;
            }
            Ok(())
        }
    }
}

/// One line typed during a session.
#[derive(Debug, Clone, PartialEq)]
enum Input {
    Set { reps: i32, weight: Option<f64> },
    Weight(f64),
    Skip,
    Pause,
    Resume,
    Hold,
    Status,
    Finish,
    Exit,
    Yes,
    No,
    Help,
    Empty,
    Unknown(String),
}

fn parse_weight(s: &str) -> Option<f64> {
    let s = s.trim().to_ascii_lowercase();
    if s == "bw" {
        return Some(0.0);
    }
    s.strip_suffix("kg").unwrap_or(&s).trim().parse().ok()
}

impl Input {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Self::Empty;
        };
        let rest: Vec<&str> = words.collect();

        if let Ok(reps) = head.parse::<i32>() {
            return match rest.as_slice() {
                [] => Self::Set { reps, weight: None },
                [w] => match parse_weight(w) {
                    Some(weight) => Self::Set { reps, weight: Some(weight) },
                    None => Self::Unknown(line.to_owned()),
                },
                _ => Self::Unknown(line.to_owned()),
            };
        }

        match (head.to_ascii_lowercase().as_str(), rest.as_slice()) {
            ("w" | "weight", [w]) => parse_weight(w).map_or_else(|| Self::Unknown(line.to_owned()), Self::Weight),
            ("s" | "skip", []) => Self::Skip,
            ("p" | "pause", []) => Self::Pause,
            ("r" | "resume", []) => Self::Resume,
            ("hold", []) => Self::Hold,
            ("st" | "status", []) => Self::Status,
            ("f" | "finish", []) => Self::Finish,
            ("q" | "quit" | "exit", []) => Self::Exit,
            ("y" | "yes", []) => Self::Yes,
            ("n" | "no", []) => Self::No,
            ("h" | "help" | "?", []) => Self::Help,
            _ => Self::Unknown(line.to_owned()),
        }
    }
}

/// Runs a session until it completes or is abandoned, then saves it.
/// Returns the stored log, if any.
async fn drive<S, T, R>(mut session: WorkoutSession, ctx: &Ctx<S>, mut ticker: T, input: R) -> Result<Option<WorkoutLog>>
where
    S: DataStore,
    T: TickSource,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut ticks = ticker.subscribe();
    ticker.start();

    print_plan(session.plan());
    print_help();
    print_status(&session);

    let mut confirming_exit = false;
    while !session.is_over() {
        tokio::select! {
            tick = ticks.recv() => match tick {
                Ok(_) => on_tick(&mut session),
                Err(RecvError::Lagged(missed)) => {
                    for _ in 0..missed {
                        on_tick(&mut session);
                    }
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    // stdin closed: keep what was done, drop an empty session
                    session.finish_early();
                    break;
                };
                let input = Input::parse(&line);
                if confirming_exit {
                    confirming_exit = false;
                    if input == Input::Yes {
                        session.exit(true);
                    } else {
                        println!("{} continuing session", "info:".blue().bold());
                    }
                    continue;
                }
                if on_input(&mut session, input) {
                    confirming_exit = true;
                }
            }
        }
    }
    ticker.stop();

    match session.phase() {
        Phase::Completed => save(&mut session, ctx, &mut lines).await,
        Phase::Abandoned => {
            println!("{} session abandoned, nothing saved", "info:".blue().bold());
            Ok(None)
        }
        Phase::Active | Phase::Resting => Ok(None),
    }
}

fn on_tick(session: &mut WorkoutSession) {
    match session.tick() {
        TickOutcome::Rest { .. } => {
            if let Some(timer) = session.rest_timer() {
                let held = if timer.is_running() { "" } else { " (held)" };
                print!("\r  {} {}{}   ", "rest".blue().bold(), timer.label(), held);
                let _ = std::io::stdout().flush();
            }
        }
        TickOutcome::RestFinished => {
            println!("\r  {} rest over      ", "⏰".bold());
            print_status(session);
        }
        TickOutcome::Idle | TickOutcome::Elapsed => {}
    }
}

/// Applies one command. Returns `true` when an exit needs confirming.
fn on_input(session: &mut WorkoutSession, input: Input) -> bool {
    match input {
        Input::Set { reps, weight } => {
            let weight = weight.unwrap_or(session.current_exercise().weight);
            let name = session.current_exercise().name.clone();
            match session.complete_set(reps, weight) {
                Step::Rejected if session.is_resting() => {
                    println!("{} still resting, `skip` to start the next set", "info:".blue().bold())
                }
                Step::Rejected => println!("{} reps must be a positive number", "warning:".yellow().bold()),
                Step::Rest { next_set, seconds } => println!(
                    "{} {} set logged · rest {} before set {}",
                    "ok:".green().bold(),
                    name,
                    format_clock(u64::from(seconds)),
                    next_set
                ),
                Step::NextExercise { rest, .. } => {
                    println!("{} {} done", "ok:".green().bold(), name.bold());
                    if let Some(secs) = rest {
                        println!("  rest {} before the next exercise", format_clock(u64::from(secs)));
                    } else {
                        print_status(session);
                    }
                }
                Step::Finished => println!("{} workout complete!", "ok:".green().bold()),
            }
        }
        Input::Weight(w) => {
            session.set_weight(w);
            println!(
                "{} working weight {}",
                "info:".blue().bold(),
                format_weight(session.current_exercise().weight)
            );
        }
        Input::Skip => {
            if session.skip_rest() {
                print_status(session);
            } else {
                println!("{} not resting", "info:".blue().bold());
            }
        }
        Input::Pause => {
            session.pause();
            println!("{} clock paused at {}", "info:".blue().bold(), format_clock(session.elapsed()));
        }
        Input::Resume => {
            session.resume();
            println!("{} clock running", "info:".blue().bold());
        }
        Input::Hold => match session.rest_timer().map(|t| t.is_running()) {
            Some(true) => session.pause_rest(),
            Some(false) => session.resume_rest(),
            None => println!("{} not resting", "info:".blue().bold()),
        },
        Input::Status => print_status(session),
        Input::Finish => {
            session.finish_early();
        }
        Input::Exit => {
            if session.exit(false) == ExitOutcome::NeedsConfirmation {
                println!(
                    "{} {} recorded set(s) will be lost. Exit anyway? [y/N]",
                    "warning:".yellow().bold(),
                    session.completed_sets()
                );
                return true;
            }
        }
        Input::Help => print_help(),
        Input::Yes | Input::No | Input::Empty => {}
        Input::Unknown(line) => println!(
            "{} unknown command `{}`, type `help`",
            "warning:".yellow().bold(),
            line
        ),
    }
    false
}

/// Store the log, offering a retry while the failure is recoverable.
async fn save<S, R>(session: &mut WorkoutSession, ctx: &Ctx<S>, lines: &mut Lines<R>) -> Result<Option<WorkoutLog>>
where
    S: DataStore,
    R: AsyncBufRead + Unpin,
{
    loop {
        match session.finalize(&ctx.logs, ctx.now()).await {
            Ok(log) => {
                let all = ctx.logs.get_all().await?;
                match ctx
                    .profiles
                    .refresh_counters(&all, ctx.now(), &ctx.settings.analytics())
                    .await
                {
                    Ok(profile) => println!(
                        "{} workout saved · streak {} day(s)",
                        "ok:".green().bold(),
                        profile.current_streak.to_string().yellow().bold()
                    ),
                    Err(CoachError::NotFound { .. }) => {
                        println!("{} workout saved", "ok:".green().bold())
                    }
                    Err(e) => println!(
                        "{} workout saved, but the profile was not updated: {}",
                        "warning:".yellow().bold(),
                        e
                    ),
                }
                return Ok(Some(log));
            }
            Err(e) if e.is_recoverable() => {
                println!("{} could not save workout: {}", "error:".red().bold(), e);
                println!("Retry? [Y/n]");
                let answer = lines.next_line().await?.unwrap_or_else(|| "n".to_owned());
                if Input::parse(&answer) == Input::No {
                    println!("{} workout not saved", "warning:".yellow().bold());
                    return Ok(None);
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn print_status(s: &WorkoutSession) {
    if s.is_over() {
        return;
    }
    let ex = s.current_exercise();
    println!(
        "\n{}  set {} of {}  ·  target {}  ·  {}",
        ex.name.cyan().bold(),
        s.current_set(),
        ex.sets,
        ex.reps,
        format_weight(ex.weight)
    );

    let filled = (s.progress() * BAR_WIDTH as f64).round() as usize;
    let paused = if s.is_paused() { " (paused)".yellow().to_string() } else { String::new() };
    println!(
        "  {}{} {}/{} sets · {}{}",
        "█".repeat(filled).green(),
        "░".repeat(BAR_WIDTH - filled).dimmed(),
        s.completed_sets(),
        s.total_sets(),
        format_clock(s.elapsed()),
        paused
    );

    let next = s.up_next(UP_NEXT);
    if !next.is_empty() {
        println!("  {} {}", "up next:".dimmed(), next.iter().map(|e| e.name.as_str()).join(", "));
    }
}

fn print_help() {
    println!(
        "\n{}  {} log a set · {} set weight · {} skip rest · {} hold rest timer\n         {} clock · {} · {} end early · {} quit without saving",
        "Commands:".bold(),
        "<reps> [kg|bw]".green(),
        "w <kg>".green(),
        "skip".green(),
        "hold".green(),
        "pause/resume".green(),
        "status".green(),
        "finish".green(),
        "exit".green()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use fitcoach::{
        OutputFmt,
        clock::ManualTicker,
        config::Settings,
        models::{Exercise, Reps, WorkoutPlan},
        storage::MemoryStore,
    };
    use tokio::io::AsyncWriteExt;

    #[test]
    fn parses_session_commands() {
        assert_eq!(Input::parse("12"), Input::Set { reps: 12, weight: None });
        assert_eq!(Input::parse(" 8 22.5kg "), Input::Set { reps: 8, weight: Some(22.5) });
        assert_eq!(Input::parse("10 bw"), Input::Set { reps: 10, weight: Some(0.0) });
        assert_eq!(Input::parse("-3"), Input::Set { reps: -3, weight: None });
        assert_eq!(Input::parse("w 30"), Input::Weight(30.0));
        assert_eq!(Input::parse("SKIP"), Input::Skip);
        assert_eq!(Input::parse("q"), Input::Exit);
        assert_eq!(Input::parse(""), Input::Empty);
        assert_eq!(Input::parse("10 heavy"), Input::Unknown("10 heavy".into()));
        assert_eq!(Input::parse("w"), Input::Unknown("w".into()));
    }

    fn plan() -> WorkoutPlan {
        let ex = |id: &str, sets| Exercise {
            id: id.into(),
            name: format!("Ex {id}"),
            sets,
            reps: Reps::Count(10),
            rest: 60,
            weight: 0.0,
            muscle_groups: vec![],
        };
        WorkoutPlan {
            id: "plan".into(),
            date: Utc::now(),
            exercises: vec![ex("a", 2), ex("b", 1)],
            target_muscles: vec![],
            estimated_duration: 10,
        }
    }

    async fn ctx() -> Ctx<MemoryStore> {
        let store = Arc::new(MemoryStore::seeded().await.unwrap());
        Ctx::new(store, Settings::default(), OutputFmt::Text)
    }

    async fn run_script(ctx: &Ctx<MemoryStore>, script: &str) -> Option<WorkoutLog> {
        let session = WorkoutSession::start(plan(), Utc::now(), ctx.settings.session()).unwrap();
        drive(session, ctx, ManualTicker::new(), script.as_bytes()).await.unwrap()
    }

    #[tokio::test]
    async fn scripted_workout_is_saved() {
        let ctx = ctx().await;
        let before = ctx.logs.get_all().await.unwrap().len();

        let log = run_script(&ctx, "0\n10 20\nskip\n8\n12 bw\n").await.unwrap();

        assert!(log.completed);
        assert_eq!(log.total_sets(), 3);
        assert_eq!(log.exercises[0].sets[1].weight, 20.0);
        assert_eq!(log.exercises[0].sets[1].reps, 8);
        assert_eq!(log.exercises[1].sets[0].weight, 0.0);
        assert_eq!(ctx.logs.get_all().await.unwrap().len(), before + 1);
    }

    #[tokio::test]
    async fn exit_needs_a_yes_once_sets_exist() {
        let ctx = ctx().await;
        let before = ctx.logs.get_all().await.unwrap().len();

        // "n" keeps going, the second exit is confirmed
        assert!(run_script(&ctx, "10\nexit\nn\nexit\ny\n").await.is_none());
        assert_eq!(ctx.logs.get_all().await.unwrap().len(), before);
    }

    #[tokio::test]
    async fn closed_input_saves_a_partial_workout() {
        let ctx = ctx().await;
        let log = run_script(&ctx, "10\n").await.unwrap();
        assert!(!log.completed);
        assert_eq!(log.total_sets(), 1);

        // nothing done, nothing saved
        assert!(run_script(&ctx, "").await.is_none());
    }

    #[tokio::test]
    async fn finishing_before_any_set_saves_nothing() {
        let ctx = ctx().await;
        let before = ctx.logs.get_all().await.unwrap().len();

        assert!(run_script(&ctx, "finish
").await.is_none());
        assert_eq!(ctx.logs.get_all().await.unwrap().len(), before);
    }

    /// Lets the session loop drain whatever it has been handed.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_end_the_rest_even_when_they_pile_up() {
        let ctx = ctx().await;
        let session = WorkoutSession::start(plan(), Utc::now(), ctx.settings.session()).unwrap();
        let ticker = ManualTicker::new();
        let clock = ticker.clone();
        let (mut typing, input) = tokio::io::duplex(256);

        let script = async move {
            typing.write_all(b"10\n").await.unwrap();
            settle().await;
            // past the 60 s rest and more than the tick channel holds
            assert_eq!(clock.advance(100), 100);
            settle().await;
            // no `skip`: the timer already moved on to set two
            typing.write_all(b"9\n8\n").await.unwrap();
        };
        let (log, ()) = tokio::join!(drive(session, &ctx, ticker, BufReader::new(input)), script);

        let log = log.unwrap().unwrap();
        assert!(log.completed);
        assert_eq!(log.total_sets(), 3);
        assert_eq!(log.duration, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_before_the_rest_is_over_keep_it_running() {
        let ctx = ctx().await;
        let session = WorkoutSession::start(plan(), Utc::now(), ctx.settings.session()).unwrap();
        let ticker = ManualTicker::new();
        let clock = ticker.clone();
        let (mut typing, input) = tokio::io::duplex(256);

        let script = async move {
            typing.write_all(b"10\n").await.unwrap();
            settle().await;
            clock.advance(30);
            settle().await;
            // still resting, so this set is refused and input closes
            typing.write_all(b"9\n").await.unwrap();
            settle().await;
        };
        let (log, ()) = tokio::join!(drive(session, &ctx, ticker, BufReader::new(input)), script);

        let log = log.unwrap().unwrap();
        assert!(!log.completed);
        assert_eq!(log.total_sets(), 1);
        assert_eq!(log.duration, 30);
    }

    #[tokio::test]
    async fn failed_save_can_be_retried() {
        let ctx = ctx().await;
        let session = WorkoutSession::start(plan(), Utc::now(), ctx.settings.session()).unwrap();
        ctx.store.fail_writes(true);

        // answer "n" to the retry prompt
        let res = drive(session, &ctx, ManualTicker::new(), "10\nf\nn\n".as_bytes()).await.unwrap();
        assert!(res.is_none());
        ctx.store.fail_writes(false);
    }
}
