// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Watch command - re-run a pipeline on file changes

use colored::Colorize;
use miette::Result;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use super::run::RunOptions;
use super::OutputFormat;

/// Run the watch command
pub async fn run(
    pipeline_path: PathBuf,
    input: Option<String>,
    debounce_ms: u64,
    verbose: bool,
) -> Result<()> {
    if !pipeline_path.exists() {
        return Err(miette::miette!(
            "Pipeline file not found: {}\n\n\
             Run 'opchain init' to write a starter pipeline.",
            pipeline_path.display()
        ));
    }

    println!("{}", "Starting watch mode...".bold());
    println!("Watching for changes (debounce: {}ms)", debounce_ms);
    println!("Press {} to exit.", "Ctrl+C".cyan());
    println!();

    let (tx, rx) = channel();

    let mut debouncer = new_debouncer(Duration::from_millis(debounce_ms), tx)
        .map_err(|e| miette::miette!("Failed to create file watcher: {}", e))?;

    debouncer
        .watcher()
        .watch(Path::new("."), RecursiveMode::Recursive)
        .map_err(|e| miette::miette!("Failed to start watching: {}", e))?;

    let options = RunOptions {
        input,
        context: None,
        format: OutputFormat::Text,
        log: verbose,
        timeout_secs: None,
        verbose,
    };

    run_once(&pipeline_path, &options).await;

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant: Vec<_> = events
                    .iter()
                    .filter(|e| !is_ignored(&e.path))
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                    .collect();

                if !relevant.is_empty() {
                    println!();
                    println!("{}", "─".repeat(50).dimmed());
                    println!(
                        "{}: {} file(s) changed",
                        "Change detected".yellow(),
                        relevant.len()
                    );

                    if verbose {
                        for event in &relevant {
                            println!("  {}", event.path.display());
                        }
                    }

                    println!();
                    run_once(&pipeline_path, &options).await;
                }
            }
            Ok(Err(e)) => {
                eprintln!("{}: {:?}", "Watch error".red(), e);
            }
            Err(e) => {
                // Channel closed
                eprintln!("{}: {}", "Channel error".red(), e);
                break;
            }
        }
    }

    Ok(())
}

/// Paths whose changes never trigger a re-run
fn is_ignored(path: &Path) -> bool {
    path.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        name == ".git" || name == "target"
    })
}

async fn run_once(pipeline_path: &Path, options: &RunOptions) {
    let start = Instant::now();
    match super::run::run(pipeline_path.to_path_buf(), options.clone()).await {
        Ok(()) => println!(
            "{} ({:.2}s)",
            "Pipeline completed successfully".green(),
            start.elapsed().as_secs_f64()
        ),
        Err(e) => eprintln!(
            "{}: {} ({:.2}s)",
            "Pipeline failed".red(),
            e,
            start.elapsed().as_secs_f64()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignored_paths() {
        assert!(is_ignored(Path::new("./target/debug/opchain")));
        assert!(is_ignored(Path::new(".git/HEAD")));
        assert!(!is_ignored(Path::new("./pipeline.json")));
    }
}
