use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use colored::Colorize;
use fitcoach::{
    models::{Exercise, UserProfile, WorkoutLog, WorkoutPlan},
    storage::{Collection, DataStore, Document, Snapshot},
};
use serde::de::DeserializeOwned;

use super::Ctx;
use crate::cli::DbCmd;

const DEFAULT_DUMP: &str = "dump.json";

pub async fn handle<S: DataStore>(cmd: DbCmd, ctx: &Ctx<S>) -> Result<()> {
    match cmd {
        DbCmd::Export { file } => export(ctx, file.as_deref().unwrap_or(DEFAULT_DUMP)).await,
        DbCmd::Import { file } => import(ctx, &file).await,
        DbCmd::Reset { yes } => {
            if !yes && !confirm("Replace ALL data with the sample data?")? {
                println!("{} reset cancelled", "info:".blue().bold());
                return Ok(());
            }
            Snapshot::bundled()?.load_into(ctx.store.as_ref()).await?;
            println!("{} database reset to sample data", "ok:".green().bold());
            Ok(())
        }
    }
}

pub async fn export<S: DataStore>(ctx: &Ctx<S>, path: &str) -> Result<()> {
    let snap = Snapshot::capture(ctx.store.as_ref()).await?;
    let text = serde_json::to_string_pretty(&snap)?;
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("Could not write file: `{path}`"))?;
    println!(
        "{} exported {} documents to `{}`",
        "ok:".green().bold(),
        snap.len(),
        path
    );
    Ok(())
}

pub async fn import<S: DataStore>(ctx: &Ctx<S>, path: &str) -> Result<()> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Could not read file: `{path}`"))?;
    let snap: Snapshot = serde_json::from_str(&text)
        .context("Failed to parse export: expected `exercises`, `profiles`, `logs`, `plans` arrays")?;

    let bad = invalid_documents(&snap);
    if !bad.is_empty() {
        for (collection, idx, err) in &bad {
            println!(
                "{} {} #{}: {}",
                "error:".red().bold(),
                collection,
                idx + 1,
                err
            );
        }
        println!("{} nothing imported", "warning:".yellow().bold());
        return Ok(());
    }

    snap.load_into(ctx.store.as_ref()).await?;
    println!(
        "{} imported {} documents from `{}`",
        "ok:".green().bold(),
        snap.len(),
        path
    );
    Ok(())
}

/// Documents that would not load as their collection's entity type.
fn invalid_documents(snap: &Snapshot) -> Vec<(Collection, usize, String)> {
    fn check<T: DeserializeOwned>(docs: &[Document]) -> Vec<(usize, String)> {
        docs.iter()
            .enumerate()
            .filter_map(|(i, d)| serde_json::from_value::<T>(d.clone()).err().map(|e| (i, e.to_string())))
            .collect()
    }

    Collection::ALL
        .into_iter()
        .flat_map(|c| {
            let docs = snap.docs(c);
            let errs = match c {
                Collection::Exercises => check::<Exercise>(docs),
                Collection::Profiles => check::<UserProfile>(docs),
                Collection::Logs => check::<WorkoutLog>(docs),
                Collection::Plans => check::<WorkoutPlan>(docs),
            };
            errs.into_iter().map(move |(i, e)| (c, i, e))
        })
        .collect()
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} {} [y/N] ", "warning:".yellow().bold(), question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
