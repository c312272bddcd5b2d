use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "x")]
#[command(about = "Development automation for agnes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all CI checks (fmt, clippy, build, test)
    Ci {
        #[arg(long)]
        verbose: bool,
    },
    /// Quick checks before commit (fmt, clippy)
    Check {
        #[arg(long)]
        verbose: bool,
    },
    /// Format code
    Fmt {
        #[arg(long)]
        check: bool,
    },
    /// Run clippy
    Clippy {
        #[arg(long)]
        fix: bool,
    },
    /// Build the project
    Build {
        #[arg(long)]
        release: bool,
        /// Enable the cpal audio backend
        #[arg(long)]
        audio: bool,
    },
    /// Run tests
    Test {
        #[arg(long)]
        doc: bool,
        /// Run only session controller tests (unit and integration)
        #[arg(long)]
        session: bool,
        /// Run only input watchdog tests
        #[arg(long)]
        input: bool,
        /// Run only audio recovery tests
        #[arg(long)]
        audio: bool,
        /// Run only front end tests
        #[arg(long)]
        frontend: bool,
    },
    /// Run benchmarks
    Bench,
    /// Run a cartridge on the headless front end
    Run {
        /// Path to a .nes file
        rom: String,
        /// Number of frames to run
        #[arg(short = 'n', long, default_value = "60")]
        frames: u64,
        /// Export a .state file at the end
        #[arg(long)]
        save_state: bool,
        /// Build in release mode
        #[arg(long)]
        release: bool,
    },
    /// Pre-commit hook (fmt, clippy, test)
    PreCommit,
    /// Install git hooks
    InstallHooks,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci { verbose } => run_ci(verbose),
        Commands::Check { verbose } => run_check(verbose),
        Commands::Fmt { check } => run_fmt(check),
        Commands::Clippy { fix } => run_clippy(fix),
        Commands::Build { release, audio } => run_build(release, audio),
        Commands::Test {
            doc,
            session,
            input,
            audio,
            frontend,
        } => run_test(doc, session, input, audio, frontend),
        Commands::Bench => run_bench(),
        Commands::Run {
            rom,
            frames,
            save_state,
            release,
        } => run_rom(&rom, frames, save_state, release),
        Commands::PreCommit => run_pre_commit(),
        Commands::InstallHooks => install_hooks(),
    }
}

fn run_ci(verbose: bool) -> Result<()> {
    println!("{}", "=== Running CI Pipeline ===".bold().blue());

    let start = Instant::now();

    run_task("Format Check", || run_fmt(true), verbose)?;
    run_task("Clippy", || run_clippy(false), verbose)?;
    run_task("Build", || run_build(false, false), verbose)?;
    run_task(
        "Test",
        || run_test(false, false, false, false, false),
        verbose,
    )?;

    let elapsed = start.elapsed();
    println!(
        "\n{} {}",
        "✓ CI passed in".green().bold(),
        format!("{:.2}s", elapsed.as_secs_f64()).bold()
    );

    Ok(())
}

fn run_check(verbose: bool) -> Result<()> {
    println!("{}", "=== Running Quick Checks ===".bold().blue());

    let start = Instant::now();

    run_task("Format Check", || run_fmt(true), verbose)?;
    run_task("Clippy", || run_clippy(false), verbose)?;

    let elapsed = start.elapsed();
    println!(
        "\n{} {}",
        "✓ Checks passed in".green().bold(),
        format!("{:.2}s", elapsed.as_secs_f64()).bold()
    );

    Ok(())
}

fn run_fmt(check: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("fmt").arg("--all");

    if check {
        cmd.arg("--").arg("--check");
    }

    execute_command(&mut cmd)
}

fn run_clippy(fix: bool) -> Result<()> {
    // cpal needs system audio headers, so clippy covers the default feature set
    let mut cmd = Command::new("cargo");
    cmd.arg("clippy").arg("--all-targets");

    if fix {
        cmd.arg("--fix");
    } else {
        cmd.arg("--").arg("-D").arg("warnings");
    }

    execute_command(&mut cmd)
}

fn run_build(release: bool, audio: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("build");

    if release {
        cmd.arg("--release");
    }
    if audio {
        cmd.arg("--features").arg("audio");
    }

    execute_command(&mut cmd)
}

fn run_test(doc: bool, session: bool, input: bool, audio: bool, frontend: bool) -> Result<()> {
    if doc {
        let mut cmd = Command::new("cargo");
        cmd.arg("test").arg("--doc");
        return execute_command(&mut cmd);
    }

    let filters = [session, input, audio, frontend];
    let filter_count = filters.iter().filter(|&&f| f).count();

    if filter_count == 0 {
        let mut cmd = Command::new("cargo");
        cmd.arg("test");
        return execute_command(&mut cmd);
    }

    // (enabled, lib module filter, integration test targets, label)
    let groups: [(bool, &str, &[&str], &str); 4] = [
        (
            session,
            "core::session",
            &["session_lifecycle", "launch_ordering"],
            "Session",
        ),
        (input, "core::input", &[], "Input"),
        (audio, "core::audio", &[], "Audio"),
        (frontend, "frontend", &["integration_test"], "Frontend"),
    ];

    let mut all_success = true;

    for (enabled, module_path, targets, label) in groups {
        if !enabled {
            continue;
        }

        println!("{} Running {} tests...", "→".blue(), label.bold());

        let mut cmd = Command::new("cargo");
        cmd.arg("test").arg("--lib").arg(module_path);
        let mut result = execute_command(&mut cmd);

        for target in targets {
            if result.is_err() {
                break;
            }
            let mut cmd = Command::new("cargo");
            cmd.arg("test").arg("--test").arg(target);
            result = execute_command(&mut cmd);
        }

        match result {
            Ok(_) => {
                println!("{} {} tests passed\n", "✓".green(), label);
            }
            Err(e) => {
                println!("{} {} tests failed\n", "✗".red(), label);
                all_success = false;
                if filter_count == 1 {
                    return Err(e);
                }
            }
        }
    }

    if all_success {
        Ok(())
    } else {
        anyhow::bail!("Some test groups failed")
    }
}

fn run_bench() -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("bench");

    execute_command(&mut cmd)
}

fn run_rom(rom: &str, frames: u64, save_state: bool, release: bool) -> Result<()> {
    println!("{}", "=== Headless Run ===".bold().blue());

    let rom_path = Path::new(rom);
    if !rom_path.exists() {
        println!("{} Cartridge not found: {}", "✗".red().bold(), rom.yellow());
        anyhow::bail!("Cartridge not found");
    }
    let is_nes = rom_path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("nes"))
        .unwrap_or(false);
    if !is_nes {
        println!(
            "{} Not a .nes file: {}",
            "✗".red().bold(),
            rom.yellow()
        );
        anyhow::bail!("Unsupported cartridge file");
    }

    println!("{} Cartridge: {}", "✓".green(), rom.cyan());
    println!("{} Frames: {}", "→".blue(), frames.to_string().bold());
    println!(
        "{} Build mode: {}",
        "→".blue(),
        if release {
            "release".green().bold()
        } else {
            "debug".yellow().bold()
        }
    );
    println!();

    let start = Instant::now();

    let mut cmd = Command::new("cargo");
    cmd.arg("run");

    if release {
        cmd.arg("--release");
    }

    cmd.arg("--bin")
        .arg("agnes")
        .arg("--")
        .arg(rom)
        .arg("-n")
        .arg(frames.to_string());

    if save_state {
        cmd.arg("--save-state");
    }

    let status = cmd
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()?;

    if !status.success() {
        println!("\n{} Headless run failed", "✗".red().bold());
        anyhow::bail!("Headless run failed with exit code: {}", status);
    }

    let elapsed = start.elapsed();
    println!(
        "\n{} Headless run completed in {}",
        "✓".green().bold(),
        format!("{:.2}s", elapsed.as_secs_f64()).bold()
    );

    Ok(())
}

fn run_pre_commit() -> Result<()> {
    println!("{}", "=== Pre-commit Checks ===".bold().blue());

    let start = Instant::now();

    run_task("Format Check", || run_fmt(true), false)?;
    run_task("Clippy", || run_clippy(false), false)?;
    run_task(
        "Test",
        || run_test(false, false, false, false, false),
        false,
    )?;

    let elapsed = start.elapsed();
    println!(
        "\n{} {}",
        "✓ Pre-commit checks passed in".green().bold(),
        format!("{:.2}s", elapsed.as_secs_f64()).bold()
    );

    Ok(())
}

fn install_hooks() -> Result<()> {
    use std::fs;

    println!("{}", "Installing git hooks...".bold());

    let hook_content = r#"#!/bin/sh
# Auto-generated by cargo x install-hooks
set -e

echo "Running pre-commit checks..."
cargo x pre-commit
"#;

    let hook_path = ".git/hooks/pre-commit";
    fs::write(hook_path, hook_content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut perms = fs::metadata(hook_path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(hook_path, perms)?;
    }

    println!("{}", "✓ Git hooks installed".green());
    println!("  Pre-commit hook will run: fmt, clippy, test");

    Ok(())
}

fn run_task<F>(name: &str, task: F, verbose: bool) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    print!("{} {} ... ", "→".blue(), name);

    let start = Instant::now();

    match task() {
        Ok(_) => {
            let elapsed = start.elapsed();
            println!(
                "{} {}",
                "✓".green().bold(),
                if verbose {
                    format!("({:.2}s)", elapsed.as_secs_f64())
                } else {
                    String::new()
                }
            );
            Ok(())
        }
        Err(e) => {
            println!("{}", "✗".red().bold());
            Err(e)
        }
    }
}

fn execute_command(cmd: &mut Command) -> Result<()> {
    let status = cmd
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()?;

    if !status.success() {
        anyhow::bail!("Command failed with exit code: {}", status);
    }

    Ok(())
}
