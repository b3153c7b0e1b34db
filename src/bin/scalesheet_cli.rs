//! Scale Sheets CLI - bridge interface over a JSON snapshot
//!
//! Each invocation restores the snapshot, runs one operation, prints JSON to
//! stdout and writes the snapshot back after mutating commands.
//! Exit codes: 0 success, 1 error, 2 conflict.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use scalesheet_core::{
    CoreConfig, CoreError, CreateVersionRequest, ErrorKind, ItemTree, NewSheet,
    ReplaceFieldsRequest, SaveMappingRequest, ScaleService, SheetKind, TemplateKind,
};

#[derive(Parser)]
#[command(name = "scalesheet-cli")]
#[command(about = "Scale Sheets CLI - versioned measurement templates and sheets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the snapshot file holding templates, sheets and mappings
    #[arg(short, long, default_value = "scalesheet.json")]
    store: PathBuf,

    /// Path to the item master (JSON array)
    #[arg(short, long)]
    items: Option<PathBuf>,

    /// Path to the engine configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Log errors only
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List templates
    Templates {
        /// INPUT or OUTPUT
        #[arg(short, long)]
        kind: Option<TemplateKind>,
    },

    /// List the fields of one template version
    Fields { template_id: String },

    /// Publish a new template version
    NewVersion {
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        kind: TemplateKind,
        /// Template whose fields are cloned into the new version
        #[arg(long)]
        base: Option<String>,
    },

    /// Save a field list as a new version of a template
    SaveFields {
        template_id: String,
        /// JSON array of field definitions
        #[arg(short, long)]
        payload: String,
    },

    /// Default values for a template's fields
    InitialValues { template_id: String },

    /// Create a sheet
    CreateSheet {
        /// JSON payload (NewSheet)
        #[arg(short, long)]
        payload: String,
    },

    /// Show one sheet with its values
    Sheet { sheet_id: String },

    /// List an item's sheets of one kind
    ItemSheets {
        item_id: String,
        #[arg(short, long)]
        kind: SheetKind,
    },

    /// List output sheets of an input sheet
    Outputs { parent_sheet_id: String },

    /// List part-template mappings
    Mappings,

    /// Template ids configured for a part
    PartTemplates { part_id: String },

    /// Templates configured for an item's part
    ItemTemplates { item_id: String },

    /// Save a part-template mapping
    SaveMapping {
        /// JSON payload (SaveMappingRequest)
        #[arg(short, long)]
        payload: String,
    },

    /// Print the item tree
    Tree,

    /// Show one item
    Item { item_id: String },

    /// List distinct part ids
    PartIds,
}

impl Commands {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::NewVersion { .. }
                | Commands::SaveFields { .. }
                | Commands::CreateSheet { .. }
                | Commands::SaveMapping { .. }
        )
    }
}

fn init_tracing(config: &CoreConfig, quiet: bool, verbose: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };

    let filter = EnvFilter::try_from_env("SCALESHEET_LOG")
        .unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CoreError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse<T: serde::de::DeserializeOwned>(payload: &str) -> Result<T, CoreError> {
    serde_json::from_str(payload)
        .map_err(|e| CoreError::Validation(format!("Invalid payload: {}", e)))
}

fn run(command: Commands, service: &mut ScaleService) -> Result<(), CoreError> {
    match command {
        Commands::Templates { kind } => print_json(&service.list_templates(kind)),
        Commands::Fields { template_id } => print_json(&service.get_template_fields(&template_id)),
        Commands::NewVersion { code, name, kind, base } => {
            let template = service.create_template_version(&CreateVersionRequest {
                base_template_id: base,
                code,
                name,
                kind,
            })?;
            print_json(&template)
        }
        Commands::SaveFields { template_id, payload } => {
            let template = service.save_fields_as_new_version(&ReplaceFieldsRequest {
                template_id,
                fields: parse(&payload)?,
            })?;
            print_json(&template)
        }
        Commands::InitialValues { template_id } => print_json(&service.initial_values(&template_id)?),
        Commands::CreateSheet { payload } => {
            let request: NewSheet = parse(&payload)?;
            print_json(&service.create_sheet(&request)?)
        }
        Commands::Sheet { sheet_id } => print_json(&service.get_sheet(&sheet_id)?),
        Commands::ItemSheets { item_id, kind } => print_json(&service.list_item_sheets(&item_id, kind)),
        Commands::Outputs { parent_sheet_id } => {
            print_json(&service.list_input_outputs(&parent_sheet_id))
        }
        Commands::Mappings => print_json(&service.list_part_template_mappings()),
        Commands::PartTemplates { part_id } => print_json(&service.get_templates_for_part(&part_id)),
        Commands::ItemTemplates { item_id } => print_json(&service.templates_for_item(&item_id)?),
        Commands::SaveMapping { payload } => {
            let request: SaveMappingRequest = parse(&payload)?;
            print_json(&service.save_part_template_mapping(&request))
        }
        Commands::Tree => print_json(&service.get_items_tree()),
        Commands::Item { item_id } => print_json(&service.get_item_by_id(&item_id)),
        Commands::PartIds => print_json(&service.list_part_ids()),
    }
}

fn fail(err: &CoreError) -> ExitCode {
    let output = serde_json::json!({
        "error": err.to_string(),
        "kind": err.kind().as_str(),
    });
    println!("{}", output);
    match err.kind() {
        ErrorKind::Conflict => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match CoreConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!(r#"{{"error": "Failed to load config: {}"}}"#, e);
                return ExitCode::FAILURE;
            }
        },
        None => CoreConfig::default(),
    };
    init_tracing(&config, cli.quiet, cli.verbose);

    let items = match &cli.items {
        Some(path) => match ItemTree::load(path) {
            Ok(tree) => tree,
            Err(e) => return fail(&e),
        },
        None => ItemTree::default(),
    };

    let mut service = match ScaleService::open(&cli.store, &config, items) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let mutates = cli.command.mutates();
    if let Err(e) = run(cli.command, &mut service) {
        return fail(&e);
    }

    if mutates {
        if let Err(e) = service.save_snapshot(&cli.store) {
            return fail(&e);
        }
    }
    ExitCode::SUCCESS
}
