//! JVM Remap CLI
//!
//! # Usage
//!
//! ```bash
//! # Remap a jar from named to intermediary names
//! jvm-remap remap --input mod-named.jar --output mod.jar \
//!     --mappings runtime.tiny --mappings mod.tiny --anchor intermediary \
//!     --from named --to intermediary --classpath runtime-named.jar
//!
//! # Same, driven by a YAML config, with a JSON report
//! jvm-remap remap --config remap.yaml --input mod-named.jar --output mod.jar --json
//!
//! # Merge mapping files on an anchor namespace into one Tiny v2 file
//! jvm-remap merge --anchor intermediary --output merged.tiny runtime.tiny mod.tiny
//!
//! # List the namespaces of merged mappings
//! jvm-remap namespaces --anchor intermediary runtime.tiny mod.tiny
//! ```

use clap::{Parser, Subcommand};
use jvm_remap::config::{ParallelConfig, RemapConfig};
use jvm_remap::features::mapping::write_tiny_v2;
use jvm_remap::usecases::{load_mappings, RemapService};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jvm-remap")]
#[command(about = "Remap JVM class archives between mapping namespaces", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remap an archive
    Remap {
        /// Input jar
        #[arg(short, long)]
        input: PathBuf,

        /// Output jar (written only on success)
        #[arg(short, long)]
        output: PathBuf,

        /// YAML configuration; replaces the mapping/namespace flags
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Mapping files, merged in order
        #[arg(short, long)]
        mappings: Vec<PathBuf>,

        /// Namespace shared by every mapping file
        #[arg(long)]
        anchor: Option<String>,

        /// Source namespace
        #[arg(long)]
        from: Option<String>,

        /// Target namespace
        #[arg(long)]
        to: Option<String>,

        /// Reference jars in the source namespace
        #[arg(long)]
        classpath: Vec<PathBuf>,

        /// Worker threads (0 = one per CPU)
        #[arg(long, default_value = "0")]
        workers: usize,

        /// Print the transform report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge mapping files and write Tiny v2
    Merge {
        /// Anchor namespace
        #[arg(short, long)]
        anchor: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Mapping files, merged in order
        #[arg(required = true)]
        mappings: Vec<PathBuf>,
    },

    /// Print the namespaces of merged mapping files
    Namespaces {
        /// Anchor namespace
        #[arg(short, long)]
        anchor: String,

        /// Mapping files, merged in order
        #[arg(required = true)]
        mappings: Vec<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Remap {
            input,
            output,
            config,
            mappings,
            anchor,
            from,
            to,
            classpath,
            workers,
            json,
        } => {
            let config = match config {
                Some(path) => RemapConfig::from_yaml(path)?,
                None => RemapConfig::new(
                    mappings,
                    anchor.unwrap_or_default(),
                    from.unwrap_or_default(),
                    to.unwrap_or_default(),
                )
                .with_classpath(classpath)
                .with_parallel(ParallelConfig {
                    num_workers: workers,
                    ..ParallelConfig::default()
                }),
            };
            remap(config, input, output, json)?;
        }
        Commands::Merge {
            anchor,
            output,
            mappings,
        } => {
            let model = load_mappings(&mappings, &anchor)?;
            let mut writer = BufWriter::new(File::create(&output)?);
            write_tiny_v2(&model, &mut writer)?;
            writer.flush()?;
            println!(
                "Merged {} classes in {} namespaces into {}",
                model.class_count(),
                model.namespaces().len(),
                output.display()
            );
        }
        Commands::Namespaces { anchor, mappings } => {
            let model = load_mappings(&mappings, &anchor)?;
            for namespace in model.namespaces() {
                let marker = if namespace == model.anchor() { " (anchor)" } else { "" };
                println!("{}{}", namespace, marker);
            }
        }
    }

    Ok(())
}

fn remap(
    config: RemapConfig,
    input: PathBuf,
    output: PathBuf,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = RemapService::new(config)?;
    let report = service.run(&input, &output)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Remapped {} -> {}", input.display(), output.display());
        println!("  entries:           {}", report.entries);
        println!("  classes rewritten: {}", report.classes_rewritten);
        println!("  classes renamed:   {}", report.classes_renamed);
        println!("  members renamed:   {}", report.members_renamed);
        println!("  passed through:    {}", report.passthrough);
        println!("  unresolved refs:   {}", report.unresolved);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
