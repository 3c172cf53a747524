//! CLI assembly: merge flag overrides into config, build plugins, run one batch.
use std::sync::Arc;
use std::time::Duration;

use fanout_core::api::{
    AppConfig, BatchSummary, CancellationMode, CancellationScope, CliError, ExecutionOpts,
    Orchestrator, Task,
};
use fanout_plugins::factory;

use crate::commands::cli::FetchArgs;

/// Exit code for a batch that finished with every task successful.
pub const EXIT_OK: i32 = 0;
/// Exit code for a batch that finished but had failed tasks.
pub const EXIT_TASK_FAILURES: i32 = 2;
/// Exit code for a batch cut short by the deadline or Ctrl-C.
pub const EXIT_INCOMPLETE: i32 = 3;

/// Parse a URL list: one entry per line. Blank lines, lines starting with `#`
/// and trailing ` # comments` are skipped; a `#` inside a URL is kept.
pub fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(strip_comment)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_comment(line: &str) -> &str {
    let line = line.trim();
    if line.starts_with('#') {
        return "";
    }
    let end = line
        .char_indices()
        .find(|&(i, c)| c == '#' && line[..i].ends_with(char::is_whitespace))
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    line[..end].trim_end()
}

pub fn collect_tasks(args: &FetchArgs) -> Result<Vec<Task>, CliError> {
    let mut urls = args.urls.clone();
    if let Some(path) = &args.file {
        let content = std::fs::read_to_string(path).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!("read url file {} failed: {e}", path.display()),
            )
        })?;
        urls.extend(parse_url_list(&content));
    }
    if urls.is_empty() {
        return Err(CliError::Input(
            "no URLs given (pass them as arguments or via --file)".to_string(),
        ));
    }
    Ok(Task::numbered(urls))
}

pub fn apply_overrides(cfg: &mut AppConfig, args: &FetchArgs) {
    if let Some(ms) = args.timeout_ms {
        cfg.executor.timeout_ms = ms;
    }
    if let Some(n) = args.max_parallel {
        cfg.executor.max_parallel = (n > 0).then_some(n);
    }
    if args.hardened {
        cfg.executor.cancellation = CancellationMode::Hardened;
    }
    if args.fail_on_status {
        cfg.fetch.fail_on_status = true;
    }
    if let Some(format) = args.format {
        cfg.output.format = format.as_str().to_string();
    }
    if args.pretty {
        cfg.output.pretty_print = true;
    }
}

pub fn exit_code_for_error(e: &CliError) -> i32 {
    // 0/2/3: batch outcomes (see exit_code_for_summary)
    // 11: config error
    // 12: invalid input
    // 20: IO error
    // 50: internal/uncategorized
    match e {
        CliError::Config(_) => 11,
        CliError::Input(_) => 12,
        CliError::Executor(ee) if ee.is_input_error() => 12,
        CliError::Executor(_) => 50,
        CliError::Io(_) => 20,
        CliError::Anyhow(_) => 50,
    }
}

pub fn exit_code_for_summary(summary: &BatchSummary) -> i32 {
    if !summary.completed {
        EXIT_INCOMPLETE
    } else if summary.failed() > 0 {
        EXIT_TASK_FAILURES
    } else {
        EXIT_OK
    }
}

#[tracing::instrument(name = "cli.run_fetch", skip_all)]
pub async fn run_fetch(args: FetchArgs, mut cfg: AppConfig) -> Result<i32, CliError> {
    apply_overrides(&mut cfg, &args);
    let tasks = collect_tasks(&args)?;

    let work = factory::build_work(&cfg)?;
    let renderer = factory::build_renderer(&cfg.output);
    let strategy = factory::build_concurrency(&cfg)?;

    let mut opts = ExecutionOpts::from_config(&cfg.executor);
    opts.progress_bar = cfg.output.format == "text"
        && !args.no_progress
        && atty::is(atty::Stream::Stderr);

    let mut builder = Orchestrator::builder(work).opts(opts).renderer(renderer);
    if let Some(strategy) = strategy {
        builder = builder.concurrency_strategy(strategy);
    }
    let orchestrator = builder.build();

    let scope = Arc::new(CancellationScope::with_timeout(Duration::from_millis(
        cfg.executor.timeout_ms,
    )));
    let interrupt = {
        let scope = scope.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, canceling batch");
                scope.cancel();
            }
        })
    };

    let result = orchestrator.run_with_scope(tasks, scope).await;
    interrupt.abort();

    let summary = result?;
    Ok(exit_code_for_summary(&summary))
}

pub fn render_config(cfg: &AppConfig) -> Result<String, CliError> {
    toml::to_string_pretty(cfg).map_err(|e| CliError::Config(e.to_string()))
}
