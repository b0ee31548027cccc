use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use schema_merge::capture::{schema_markdown, Capture};
use schema_merge::config::{self, LoggingConfig, DEFAULT_CONFIG_FILE};
use schema_merge::utils::init_logging;
use schema_merge::{
    ActionFilter, Error, IgnoreList, SchemaMergeClient, ScriptActions, ScriptBuilder,
    SqlServerScriptBuilder, TargetConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    /// Print the statements
    Preview,
    /// Execute the statements in one transaction
    Merge,
    /// Write the statements to the configured script file
    Script,
    /// Write a replayable test case
    Capture,
    /// Write markdown dumps of both schemas plus the script
    Debug,
}

#[derive(Debug, Parser)]
#[command(name = "schema-merge", version, about = "Compare a desired schema with a SQL Server database and merge the difference")]
struct Cli {
    /// Write a starter configuration and ignore file, then exit
    #[arg(long)]
    init: bool,

    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Target name or JSON schema file to use as the desired schema
    #[arg(short, long)]
    source: Option<String>,

    /// Target to compare against; defaults to the first configured target
    #[arg(short, long)]
    target: Option<String>,

    #[arg(short, long, value_enum)]
    action: Option<Action>,

    /// Shorthand for --action merge
    #[arg(long)]
    merge: bool,

    /// Shorthand for --action script
    #[arg(long)]
    script: bool,

    /// Add matching objects to the ignore file, e.g. table:dbo.Audit
    #[arg(long, value_name = "KIND:PREFIX")]
    ignore: Option<String>,

    /// List actions instead of statements
    #[arg(long)]
    compact: bool,

    /// Only show actions matching kind:text or text
    #[arg(short, long)]
    filter: Option<String>,

    /// Annotate the script with a comment per action
    #[arg(long)]
    debug: bool,

    /// Re-plan a captured test case
    #[arg(long, value_name = "DIR")]
    replay: Option<PathBuf>,

    /// Directory for capture and debug output
    #[arg(long, default_value = "capture")]
    out: PathBuf,

    /// Emit destructive statements instead of commenting them out
    #[arg(long)]
    allow_destructive: bool,
}

impl Cli {
    fn resolved_action(&self) -> Action {
        if self.merge {
            Action::Merge
        } else if self.script {
            Action::Script
        } else {
            self.action.unwrap_or(Action::Preview)
        }
    }
}

fn init_files(config_path: &Path) -> anyhow::Result<()> {
    config::write_default(config_path)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    let ignore_file = config::DEFAULT_IGNORE_FILE;
    if !Path::new(ignore_file).exists() {
        IgnoreList::new()
            .save(ignore_file)
            .with_context(|| format!("Failed to write {}", ignore_file))?;
    }

    println!("Created {} and {}", config_path.display(), ignore_file);
    Ok(())
}

/// Production targets need the database name typed back before merging
fn confirm_production(target: &TargetConfig) -> anyhow::Result<()> {
    if !target.is_production {
        return Ok(());
    }

    let database = target
        .database_name()
        .with_context(|| format!("Target '{}' has no database name", target.name))?;

    print!("{} is a production database. Type its name to continue: ", database);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;

    if answer.trim() != database {
        return Err(Error::MergeAborted(format!("confirmation for {} did not match", database)).into());
    }
    Ok(())
}

fn print_statements(statements: &[String], separator: &str) {
    if statements.is_empty() {
        println!("No changes");
    } else {
        println!("{}", statements.join(separator));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.init {
        return init_files(&cli.config);
    }

    let config = config::load_from_file(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    init_logging(&Some(config.logging.clone().unwrap_or_else(LoggingConfig::default)))?;

    let mut client = SchemaMergeClient::new(config)?;
    let separator = client.config().script.separator.clone();
    let allow_destructive = cli.allow_destructive || client.config().script.allow_destructive;

    if let Some(dir) = &cli.replay {
        let (capture, actions) = client
            .replay(dir, cli.debug)
            .await
            .with_context(|| format!("Failed to replay {}", dir.display()))?;
        let builder = SqlServerScriptBuilder::with_metadata(capture.metadata);
        let statements = actions.to_sql_statements(&builder, allow_destructive);

        if !capture.statements.is_empty() && capture.statements != statements {
            tracing::warn!("Replayed statements differ from the captured ones");
        }
        print_statements(&statements, &separator);
        return Ok(());
    }

    let action = cli.resolved_action();
    let target = client.config().target(cli.target.as_deref())?.clone();

    let mut source = client.load_source(cli.source.as_deref()).await?;
    let mut current = client
        .load_target(&target)
        .await
        .with_context(|| format!("Failed to inspect target '{}'", target.name))?;
    let mut builder = SqlServerScriptBuilder::new(&target.connection_string);

    let mut actions = client
        .plan(&mut source, &mut current, &mut builder, cli.debug || action == Action::Debug)
        .await?;

    if let Some(expression) = &cli.ignore {
        let added = client.ignore_matching(expression, &actions)?;
        actions = client.ignore_list().apply(actions);
        println!("Ignored {} actions", added);
    }

    if let Some(expression) = &cli.filter {
        actions = ActionFilter::parse(expression)?.apply(actions);
    }

    let statements = if cli.compact {
        actions.to_compact_statements()
    } else {
        actions.to_sql_statements(&builder, allow_destructive)
    };

    match action {
        Action::Preview => print_statements(&statements, &separator),
        Action::Script => {
            let output = &client.config().script.output;
            std::fs::write(output, statements.join(&separator))
                .with_context(|| format!("Failed to write {}", output))?;
            println!("Wrote {} statements to {}", statements.len(), output);
        }
        Action::Merge => {
            if cli.compact {
                bail!("--compact cannot be combined with a merge");
            }
            if statements.is_empty() {
                println!("No changes");
                return Ok(());
            }
            confirm_production(&target)?;
            client.apply(&target, &statements).await?;
            println!("Merged {} statements into {}", statements.len(), target.name);
        }
        Action::Capture => {
            Capture {
                source,
                target: current,
                metadata: builder.metadata().clone(),
                statements,
            }
            .write(&cli.out)?;
            println!("Captured test case in {}", cli.out.display());
        }
        Action::Debug => {
            std::fs::create_dir_all(&cli.out)?;
            std::fs::write(cli.out.join("source.md"), schema_markdown(&source, "Source"))?;
            std::fs::write(cli.out.join("target.md"), schema_markdown(&current, "Target"))?;
            std::fs::write(cli.out.join("script.sql"), statements.join(&separator))?;
            println!("Wrote debug output to {}", cli.out.display());
        }
    }

    Ok(())
}
