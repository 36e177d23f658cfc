use anyhow::{Context, Result};
use clap::Parser;
use codemap_core::{init_tracing, CodeMapConfig, DependencyTree};
use codemap_service::CodeMapService;
use codemap_vector::HashingEmbedder;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "codemap-demo")]
#[command(about = "Index a source tree, search it and print dependency trees", long_about = None)]
#[command(version)]
struct Cli {
    /// Repository root to analyze and index
    root: PathBuf,

    /// Collection id the indexed chunks are stored under
    #[arg(short, long, default_value = "demo")]
    collection: String,

    /// Directory holding codemap.{toml,yaml,json}
    #[arg(long, env = "CODEMAP_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Analyzer snapshot to load before and save after indexing
    #[arg(long)]
    code_state: Option<PathBuf>,

    /// Embedding store snapshot to load before and save after indexing
    #[arg(long)]
    vector_state: Option<PathBuf>,

    /// Search query
    #[arg(short, long)]
    query: Option<String>,

    /// Maximum number of search results
    #[arg(short, long, default_value_t = 5)]
    limit: usize,

    /// File whose dependency tree is printed
    #[arg(long)]
    file: Option<PathBuf>,

    /// Function in --file whose call tree is printed
    #[arg(long, requires = "file")]
    function: Option<String>,

    /// Print trees as JSON instead of an indented outline
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config_dir {
        Some(dir) => CodeMapConfig::load_from_dir(dir)?,
        None => CodeMapConfig::default(),
    };
    init_tracing(&config.logging);

    let embedder = Arc::new(HashingEmbedder::default());
    let service = CodeMapService::new(&cli.root, embedder, config)
        .context("creating CodeMap service")?;

    let code_state = cli.code_state.as_deref().filter(|p| p.exists());
    let vector_state = cli.vector_state.as_deref().filter(|p| p.exists());
    service
        .load_from_file(code_state, vector_state)
        .context("loading saved state")?;

    let outcome = service
        .index_repository(&cli.root, &cli.collection)
        .await
        .context("indexing repository")?;
    if outcome.performed {
        service
            .save_to_file(cli.code_state.as_deref(), cli.vector_state.as_deref())
            .context("saving state")?;
    }
    for failure in &outcome.failures {
        eprintln!("skipped {}", failure);
    }
    println!(
        "{} files analyzed, {} chunks stored",
        service.analyzer().file_count(),
        service.store().len()
    );

    if let Some(query) = &cli.query {
        for result in service.search_code(query, &cli.collection, cli.limit).await? {
            println!("\n[{:.3}] {} - {}", result.relevance, result.id, result.description);
            for line in result.code.lines().take(8) {
                println!("    {}", line);
            }
        }
    }

    if let Some(file) = &cli.file {
        let tree = match &cli.function {
            Some(function) => service.analyze_function_dependencies(file, function).await?,
            None => service.analyze_file_dependencies(file).await?,
        };
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&tree)?);
        } else {
            print_tree(&tree, 0);
        }
    }
    Ok(())
}

fn print_tree(tree: &DependencyTree, indent: usize) {
    let line = tree
        .line_number
        .map(|n| format!(":{}", n))
        .unwrap_or_default();
    let cyclic = if tree.is_cyclic { " (cycle)" } else { "" };
    println!("{}{}{}{}", "  ".repeat(indent), tree.full_path, line, cyclic);
    for child in &tree.children {
        print_tree(child, indent + 1);
    }
}
