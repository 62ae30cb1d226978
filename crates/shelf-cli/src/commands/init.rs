//! `shelf init` - write a starter configuration.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

const TEMPLATE: &str = r#"# Shelfsync configuration

data_dir = ".shelfsync"
parallelism = 4
cleanup_batch_size = 5000

[source]
kind = "json_dir"
path = "exports"

[graph]
uri = "bolt://localhost:7687"
user = "neo4j"
password = "shelfsync_dev"

# One block per entity type. key_fields is the business key used for
# snapshot diffing; leave it out for whole-record hashing.

[[entity]]
name = "books"
key_fields = ["title", "genre"]

[entity.projection]
label = "Book"

[[entity.projection.flatten]]
output = "author_id"
path = "author._id"

[[entity.projection.flatten]]
output = "author"
path = "author.name"

[[entity]]
name = "genres"
key_fields = ["name"]

[entity.projection]
label = "Genre"
key_prop = "name"

# Relationships are derived in declared order, after all node upserts.

[[relationship]]
kind = "array_ref"
rel_type = "AUTHORED_BY"
source_label = "Book"
source_prop = "author_id"
target_label = "Creator"
target_prop = "_id"

# Denormalized array properties removed once relationships exist.

[[cleanup]]
label = "Book"
props = ["author_id"]
"#;

pub fn execute(path: &Path, args: &InitArgs) -> Result<()> {
    if path.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    std::fs::write(path, TEMPLATE)
        .with_context(|| format!("cannot write {}", path.display()))?;
    println!("{} {}", "Wrote".green().bold(), path.display());
    Ok(())
}
