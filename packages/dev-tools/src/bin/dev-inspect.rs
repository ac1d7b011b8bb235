//! Development fixture inspector
//!
//! Loads a seed fixture into the in-memory services and prints, for every
//! item, the relationship metadata projected onto it.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin dev-inspect -- fixtures/seed.json --config fixtures/config.json
//!
//! # Without virtual metadata
//! RELATA_VIRTUAL_METADATA=false cargo run --bin dev-inspect -- fixtures/seed.json
//! ```
//!
//! The configuration is optional; the defaults are used without it.
//! Logging follows `RUST_LOG` and defaults to `info`.

use clap::{ArgAction, Parser};
use relata_core::{
    db::{ItemStore, SeedData},
    ContentServices, Context, RepositoryConfig,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Print the relationship metadata projected onto every item of a seed fixture
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Seed fixture (JSON) to load into the in-memory store
    seed: PathBuf,
    /// Repository configuration (JSON)
    #[arg(short, long, env = "RELATA_CONFIG")]
    config: Option<PathBuf>,
    /// Evaluate virtual metadata bindings
    #[arg(long, env = "RELATA_VIRTUAL_METADATA", default_value_t = true, action = ArgAction::Set)]
    virtual_metadata: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemReport {
    id: String,
    entity_type: Option<String>,
    relationship_metadata: Vec<ProjectedValue>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectedValue {
    field: String,
    value: String,
    authority: String,
    place: i32,
    use_for_place: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => RepositoryConfig::from_file(path)?,
        None => RepositoryConfig::default(),
    };

    let seed = SeedData::from_file(&args.seed)?;
    let services = ContentServices::in_memory(config).await?;
    let context = Context::anonymous();
    let created = services.load_seed(&context, &seed).await?;
    tracing::info!(
        "Created {} relationships from {}",
        created.len(),
        args.seed.display()
    );

    let mut reports = Vec::new();
    for item in services.store.list_items().await? {
        let values = services
            .relationship_metadata
            .get_relationship_metadata(&item, args.virtual_metadata)
            .await?;
        reports.push(ItemReport {
            id: item.id.to_string(),
            entity_type: item.entity_type_label().map(str::to_string),
            relationship_metadata: values
                .into_iter()
                .map(|v| ProjectedValue {
                    field: v.field.to_string(),
                    value: v.value,
                    authority: v.authority,
                    place: v.place,
                    use_for_place: v.use_for_place,
                })
                .collect(),
        });
    }

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_seed_and_config() {
        let args = Args::try_parse_from([
            "dev-inspect",
            "fixtures/seed.json",
            "--config",
            "fixtures/config.json",
            "--virtual-metadata",
            "false",
        ])
        .unwrap();

        assert_eq!(args.seed, PathBuf::from("fixtures/seed.json"));
        assert_eq!(args.config, Some(PathBuf::from("fixtures/config.json")));
        assert!(!args.virtual_metadata);
    }

    #[test]
    fn test_seed_is_required() {
        assert!(Args::try_parse_from(["dev-inspect"]).is_err());
    }
}
