use anyhow::{Context, Result};
use clap::Parser;
use graph_inspector::cli::{Cli, Commands, OutputFormat};
use graph_inspector::config::resolve_session_config;
use graph_inspector::scan::{CacheEntry, run_scan};
use graph_inspector::session::{Session, SessionFactory};
use graph_inspector::snapshot::load_snapshot;
use graph_inspector::world::{NodeId, World};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize)]
struct Row {
    label: String,
    path: Option<String>,
}

#[derive(Debug, Serialize)]
struct Output {
    command: &'static str,
    count: usize,
    rows: Vec<Row>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let snapshot = cli
        .snapshot
        .as_deref()
        .context("the --snapshot <FILE> argument is required")?;
    let config = resolve_session_config(&cli)?;
    let mut world = load_snapshot(snapshot)?;
    info!(nodes = world.node_count(), types = world.catalog().len(), "snapshot loaded");

    let factory = SessionFactory::new();
    let mut session = factory.open(config);
    session.set_shown(&mut world, true);

    let output = match cli.command.clone() {
        Commands::Roots => {
            let rows = node_rows(&world, session.visible_objects(&world));
            Output::new("roots", rows)
        }
        Commands::Search { text, members } => {
            let rows = search(&mut session, &world, &text, members);
            Output::new("search", rows)
        }
        Commands::Scan { kind } => {
            let rows = entry_rows(&world, run_scan(&world, kind.into()));
            Output::new("scan", rows)
        }
    };
    session.teardown();

    write_output(&output, cli.format)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn search(session: &mut Session, world: &World, text: &str, members: bool) -> Vec<Row> {
    session.search_with(world, text, members);
    node_rows(world, session.visible_objects(world))
}

fn node_rows(world: &World, ids: &[NodeId]) -> Vec<Row> {
    ids.iter()
        .filter_map(|id| {
            Some(Row {
                label: world.name(*id)?.to_string(),
                path: world.path(*id),
            })
        })
        .collect()
}

fn entry_rows(world: &World, entries: Vec<CacheEntry>) -> Vec<Row> {
    entries
        .into_iter()
        .map(|e| Row {
            path: world.owner_of(&e.target).and_then(|n| world.path(n)),
            label: e.label,
        })
        .collect()
}

impl Output {
    fn new(command: &'static str, rows: Vec<Row>) -> Self {
        Self {
            command,
            count: rows.len(),
            rows,
        }
    }
}

fn render(output: &Output, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(output)?,
        OutputFormat::Text => {
            let mut out = String::new();
            for row in &output.rows {
                match &row.path {
                    Some(path) => out.push_str(&format!("{}\t{}\n", row.label, path)),
                    None => out.push_str(&format!("{}\n", row.label)),
                }
            }
            out
        }
    })
}

fn write_output(output: &Output, format: OutputFormat) -> Result<()> {
    let content = render(output, format)?;
    print!("{content}");
    if !content.is_empty() && !content.ends_with('\n') {
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_format_prints_one_row_per_line() -> Result<()> {
        let output = Output::new(
            "scan",
            vec![
                Row {
                    label: "Game (Transform)".to_string(),
                    path: Some("Game".to_string()),
                },
                Row {
                    label: "GameManager.Instance".to_string(),
                    path: None,
                },
            ],
        );
        let text = render(&output, OutputFormat::Text)?;
        assert_eq!(text, "Game (Transform)\tGame\nGameManager.Instance\n");
        Ok(())
    }

    #[test]
    fn json_format_reports_count() -> Result<()> {
        let output = Output::new("roots", Vec::new());
        let json: serde_json::Value = serde_json::from_str(&render(&output, OutputFormat::Json)?)?;
        assert_eq!(json["command"], "roots");
        assert_eq!(json["count"], 0);
        Ok(())
    }
}
