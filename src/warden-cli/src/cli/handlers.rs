//! Command dispatch and execution handlers.

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value, json};
use warden_commands::{CommandRequest, CommandResult};

use super::args::*;
use crate::config::WardenConfig;
use crate::session::{Session, SessionSettings};

/// Route a parsed command line to its handler.
pub async fn dispatch_command(cli: Cli, config: WardenConfig) -> Result<()> {
    let settings =
        SessionSettings::merge(&cli.definitions, cli.world.as_deref(), cli.elevated, &config);
    let mut session = Session::open(&settings).await?;

    match cli.command {
        Commands::List(args) => run_list(&session, args),
        Commands::Describe(args) => run_describe(&session, args),
        Commands::Check(args) => run_check(&session, args),
        Commands::Run(args) => run_dispatch(&mut session, args),
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

fn run_list(session: &Session, args: ListArgs) -> Result<()> {
    let query = args.query.as_deref().map(str::to_lowercase);
    let entries: Vec<(String, String)> = session
        .parser
        .available_commands()
        .into_iter()
        .map(|name| {
            let description = session.parser.describe(&name);
            (name, description)
        })
        .filter(|(name, description)| match &query {
            Some(q) => {
                name.to_lowercase().contains(q) || description.to_lowercase().contains(q)
            }
            None => true,
        })
        .collect();

    if args.json {
        let items: Vec<Value> = entries
            .iter()
            .map(|(name, description)| json!({ "name": name, "description": description }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No commands found.");
        return Ok(());
    }

    let width = entries.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
    for (name, description) in &entries {
        println!("  {name:<width$}  {}", first_line(description));
    }
    println!("\n{} commands", entries.len());
    Ok(())
}

fn run_describe(session: &Session, args: DescribeArgs) -> Result<()> {
    let action = args.action.trim();
    if session.parser.available_commands().iter().all(|n| !n.eq_ignore_ascii_case(action)) {
        bail!("Command '{action}' not found");
    }

    println!("{}", session.parser.describe(action));
    for line in session.usage_lines(action) {
        println!("  {line}");
    }
    Ok(())
}

fn run_check(session: &Session, args: CheckArgs) -> Result<()> {
    let report = &session.report;

    if args.json {
        let issues: Vec<Value> = report
            .issues
            .iter()
            .map(|issue| {
                json!({
                    "source": issue.source.as_ref().map(|p| p.display().to_string()),
                    "action": issue.action_name,
                    "errors": issue.errors,
                })
            })
            .collect();
        let dirs: Vec<String> = session
            .search_dirs
            .iter()
            .map(|d| d.display().to_string())
            .collect();
        let output = json!({
            "search_dirs": dirs,
            "registered": report.registered,
            "issues": issues,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Search directories:");
        for dir in &session.search_dirs {
            let marker = if dir.is_dir() { "" } else { " (missing)" };
            println!("  {}{marker}", dir.display());
        }
        println!("\nRegistered {} definitions", report.registered.len());
        for name in &report.registered {
            println!("  {name}");
        }
        if !report.issues.is_empty() {
            println!("\nRejected:");
            for issue in &report.issues {
                println!("  {issue}");
            }
        }
    }

    if !report.is_clean() {
        bail!("{} definitions rejected", report.issues.len());
    }
    Ok(())
}

/// Build the request from `--request` or from the action, target and params.
pub fn build_request(args: &RunArgs) -> Result<CommandRequest> {
    if let Some(raw) = &args.request {
        return CommandRequest::from_json(raw).context("Invalid --request JSON");
    }

    let Some(action) = &args.action else {
        bail!("No action given");
    };
    let mut request = CommandRequest::new(action.clone());
    if let Some(target) = &args.target {
        request = request.with_target(target.clone());
    }
    if !args.params.is_empty() {
        let params: Map<String, Value> = args
            .params
            .iter()
            .map(|(key, raw)| {
                let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()));
                (key.clone(), value)
            })
            .collect();
        request = request.with_parameters(Value::Object(params));
    }
    Ok(request)
}

fn print_result(
    result: &CommandResult,
    messages: &[String],
    usage: Option<String>,
    json: bool,
) -> Result<()> {
    if json {
        let output = json!({
            "success": result.success,
            "message": result.message,
            "side_effect_magnitude": result.side_effect_magnitude,
            "notifications": messages,
            "usage": usage,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    let status = if result.success { "ok" } else { "failed" };
    println!(
        "[{status}] {} (magnitude {:+.1})",
        result.message, result.side_effect_magnitude
    );
    for message in messages {
        println!("  > {message}");
    }
    Ok(())
}

fn run_dispatch(session: &mut Session, args: RunArgs) -> Result<()> {
    let request = build_request(&args)?;
    let mut last = None;

    for _ in 0..args.repeat.max(1) {
        let result = session.dispatch(&request);
        let messages = session.drain_messages();
        let usage = session.usage_compact(&request.action);
        print_result(&result, &messages, usage, args.json)?;
        last = Some(result);
    }

    if !args.json {
        for line in session.usage_lines(&request.action) {
            println!("  {line}");
        }
    }

    match last {
        Some(result) if !result.success => bail!("{}", result.message),
        _ => Ok(()),
    }
}
