//! Confclone CLI
//!
//! Command-line interface for cloning an entity inside an XML configuration
//! repository and registering the clone in the repository's index files.
//! Layout and namespace prefixes are flags, since they are conventions of
//! the repository being edited rather than properties of the engine.

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use confclone_engine::{CloneJob, EntityRef, NamespaceMap, RepoLayout};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "confclone")]
#[command(
    author,
    version,
    about = "Clone an entity inside an XML configuration repository"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone a donor entity and register the clone in both index files.
    ///
    /// Re-running with the same arguments converges: stale traces of a
    /// prior clone are removed before the clone is recreated.
    Clone {
        /// Repository root (the directory holding Configuration.xml)
        #[arg(long)]
        repo: PathBuf,
        /// Entity type, e.g. `Catalog`
        #[arg(long = "entity-type")]
        entity_type: String,
        /// Directory under the root holding this type's definitions, e.g. `Catalogs`
        #[arg(long = "type-group")]
        type_group: String,
        /// Name of the entity to copy
        #[arg(long)]
        donor: String,
        /// Name of the entity to create
        #[arg(long)]
        clone: String,
        /// Namespace prefix of the structural vocabulary
        #[arg(long, default_value = "cfg")]
        config_prefix: String,
        /// Namespace prefix of the identifier-role vocabulary
        #[arg(long, default_value = "xr")]
        ext_prefix: String,
        /// Attribute holding the root object's unique identifier
        #[arg(long, default_value = "uuid")]
        identity_attr: String,
        /// Print the outcome as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Clone {
            repo,
            entity_type,
            type_group,
            donor,
            clone,
            config_prefix,
            ext_prefix,
            identity_attr,
            json,
        } => {
            ensure!(!entity_type.is_empty(), "--entity-type must be non-empty");
            ensure!(!donor.is_empty(), "--donor must be non-empty");
            ensure!(!clone.is_empty(), "--clone must be non-empty");
            let job = CloneJob {
                repo: RepoLayout {
                    root: repo,
                    type_group,
                },
                namespaces: NamespaceMap {
                    config_prefix,
                    ext_prefix,
                    identity_attr,
                },
                donor: EntityRef::new(entity_type, donor),
                clone_name: clone,
            };
            cmd_clone(&job, json)
        }
    }
}

fn cmd_clone(job: &CloneJob, json: bool) -> Result<()> {
    let donor_q = job.donor.qualified_name();
    let clone_q = job.clone_ref().qualified_name();
    eprintln!(
        "{} cloning {} as {}",
        "[*]".cyan(),
        donor_q.bold(),
        clone_q.bold()
    );

    let outcome = job
        .run()
        .with_context(|| format!("cloning {donor_q} as {clone_q} failed"))?;

    if outcome.removed_stale_definition || outcome.removed_stale_records > 0 {
        eprintln!(
            "{} removed traces of a prior clone ({} index record(s))",
            "[+]".green(),
            outcome.removed_stale_records
        );
    }
    eprintln!(
        "{} {} {} ({} fresh identifiers)",
        "[+]".green(),
        "wrote".green().bold(),
        outcome.clone_path.display().to_string().bold(),
        outcome.regenerated_ids
    );
    eprintln!(
        "{} registered {} in {} index file(s)",
        "[+]".green(),
        clone_q.bold(),
        outcome.indexes_updated
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }
    Ok(())
}
