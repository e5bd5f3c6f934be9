//! aep-openapi CLI
//!
//! Command-line interface for inferring resource models from OpenAPI
//! documents and emitting them back as OpenAPI 3.1.

use aep_openapi_common::{Api, ConversionConfig, ConvertOptions};
use aep_openapi_generator::OpenApiGenerator;
use aep_openapi_parser::OpenApiParser;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aep-openapi")]
#[command(version, about = "Convert between OpenAPI documents and resource-oriented API models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an OpenAPI document and display the inferred resources
    #[command(after_help = "EXAMPLES:\n  \
        # Show the resources of a document\n  \
        aep-openapi parse --spec openapi.yaml\n\n  \
        # Save the resource model as JSON\n  \
        aep-openapi parse --spec openapi.json --output api.json")]
    Parse {
        /// Path to the OpenAPI or Swagger document
        #[arg(short, long)]
        spec: PathBuf,

        /// Write the resource model to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        conversion: ConversionArgs,
    },

    /// Parse an OpenAPI document and emit it again as OpenAPI 3.1
    #[command(after_help = "EXAMPLES:\n  \
        # Normalize a Swagger 2.0 document\n  \
        aep-openapi convert --spec swagger.json --output openapi.json\n\n  \
        # Only consider paths under /v1\n  \
        aep-openapi convert \\\n    \
        --spec openapi.yaml \\\n    \
        --path-prefix /v1 \\\n    \
        --output openapi.json")]
    Convert {
        /// Path to the OpenAPI or Swagger document
        #[arg(short, long)]
        spec: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "./openapi.json")]
        output: PathBuf,

        #[command(flatten)]
        conversion: ConversionArgs,
    },

    /// Emit OpenAPI 3.1 from a resource model (JSON or YAML)
    Generate {
        /// Path to the resource model
        #[arg(short, long)]
        api: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "./openapi.json")]
        output: PathBuf,
    },
}

/// Options shared by the commands that read OpenAPI documents
#[derive(Args)]
struct ConversionArgs {
    /// Only paths starting with this prefix are considered
    #[arg(long)]
    path_prefix: Option<String>,

    /// Server URL to use instead of the document's first server
    #[arg(long)]
    server_url: Option<String>,

    /// YAML file with conversion settings; flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ConversionArgs {
    fn options(&self) -> Result<ConvertOptions> {
        let mut config = match &self.config {
            Some(path) => ConversionConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ConversionConfig::default(),
        };
        if let Some(prefix) = &self.path_prefix {
            config.path_prefix = Some(prefix.clone());
        }
        if let Some(server_url) = &self.server_url {
            config.server_url = Some(server_url.clone());
        }
        Ok(config.to_options())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Parse {
            spec,
            output,
            conversion,
        } => {
            parse_command(&spec, output.as_deref(), &conversion, cli.verbose)?;
        }
        Commands::Convert {
            spec,
            output,
            conversion,
        } => {
            convert_command(&spec, &output, &conversion)?;
        }
        Commands::Generate { api, output } => {
            generate_command(&api, &output)?;
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays readable
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_api(spec_path: &Path, conversion: &ConversionArgs) -> Result<Api> {
    println!("{} Parsing OpenAPI document: {}", "→".cyan(), spec_path.display());
    let options = conversion.options()?;
    let parser = OpenApiParser::from_file(spec_path)
        .context("Failed to load OpenAPI document")?
        .with_options(options);
    parser.parse().context("Failed to parse OpenAPI document")
}

fn parse_command(
    spec_path: &Path,
    output: Option<&Path>,
    conversion: &ConversionArgs,
    verbose: bool,
) -> Result<()> {
    let api = load_api(spec_path, conversion)?;

    println!("\n{}", "✓ Parse successful!".green().bold());
    println!("\n{}", "API:".bold());
    println!("  Name: {}", api.name.yellow());
    println!("  Server: {}", api.server_url.yellow());
    println!("  Resources: {}", api.resources.len());
    println!("  Schemas: {}", api.schemas.len());

    for resource in api.resources.values() {
        let pattern = api
            .pattern(resource)
            .unwrap_or_else(|_| resource.plural.clone());
        println!("  • {} ({})", resource.singular.cyan(), method_letters(&resource.methods));
        if verbose {
            println!("    Plural: {}", resource.plural);
            println!("    Pattern: {}", pattern);
            if !resource.parents.is_empty() {
                println!("    Parents: {}", resource.parents.join(", "));
            }
            let children: Vec<&str> = api
                .child_resources(resource)
                .iter()
                .map(|child| child.singular.as_str())
                .collect();
            if !children.is_empty() {
                println!("    Children: {}", children.join(", "));
            }
            for custom in &resource.custom_methods {
                println!("    Custom: {:?} :{}", custom.method, custom.name);
            }
        }
    }

    if let Some(output) = output {
        let json = api.to_json().context("Failed to serialize resource model")?;
        write_output(output, &json)?;
        println!("\n{} Wrote resource model to {}", "✓".green(), output.display());
    }

    Ok(())
}

fn convert_command(spec_path: &Path, output: &Path, conversion: &ConversionArgs) -> Result<()> {
    let api = load_api(spec_path, conversion)?;
    println!("{} Inferred {} resources", "✓".green(), api.resources.len());

    emit(api, output)
}

fn generate_command(api_path: &Path, output: &Path) -> Result<()> {
    println!("{} Loading resource model: {}", "→".cyan(), api_path.display());
    let api = Api::from_file(api_path).context("Failed to load resource model")?;
    println!("{} Loaded {} resources", "✓".green(), api.resources.len());

    emit(api, output)
}

fn emit(api: Api, output: &Path) -> Result<()> {
    println!("{} Generating OpenAPI 3.1 document...", "→".cyan());
    let generator = OpenApiGenerator::new(api);
    let document = generator
        .generate()
        .context("Failed to generate OpenAPI document")?;
    generator
        .generate_to_file(output)
        .context("Failed to write OpenAPI document")?;

    println!("\n{}", "✓ Generation complete!".green().bold());
    println!("  Paths: {}", document.paths.len());
    println!("  Schemas: {}", document.components.schemas.len());
    println!("  📄 {}", output.display());
    Ok(())
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

/// Standard methods as letters, e.g. `LCGUD`
fn method_letters(methods: &aep_openapi_common::Methods) -> String {
    [
        (methods.list.is_some(), 'L'),
        (methods.create.is_some(), 'C'),
        (methods.get.is_some(), 'G'),
        (methods.update.is_some(), 'U'),
        (methods.delete.is_some(), 'D'),
        (methods.apply.is_some(), 'A'),
    ]
    .iter()
    .filter(|(present, _)| *present)
    .map(|(_, letter)| *letter)
    .collect()
}
