use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use docfamily::DocType;

#[derive(Parser, Debug)]
#[command(
    name = "docfamily",
    version,
    about = "Identity and version resolution for generated MOP/SOP/EOP documents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Sanitize(SanitizeArgs),
    Filename(FilenameArgs),
    NextVersion(NextVersionArgs),
    Groups(GroupsArgs),
    Inventory(InventoryArgs),
    Reserve(ReserveArgs),
    Status(StatusArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum DocTypeArg {
    Mop,
    Sop,
    Eop,
}

impl DocTypeArg {
    pub fn doc_type(self) -> DocType {
        match self {
            Self::Mop => DocType::Mop,
            Self::Sop => DocType::Sop,
            Self::Eop => DocType::Eop,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum MatchMode {
    Exact,
    Legacy,
}

impl MatchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Legacy => "legacy",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct IdentityArgs {
    #[arg(long, value_enum, default_value_t = DocTypeArg::Mop)]
    pub doc_type: DocTypeArg,

    #[arg(long, default_value = "")]
    pub manufacturer: String,

    #[arg(long, default_value = "")]
    pub model: String,

    #[arg(long)]
    pub serial: Option<String>,

    /// Work description (MOP/SOP) or emergency type (EOP).
    #[arg(long, alias = "work-description", alias = "emergency-type", default_value = "")]
    pub subject: String,
}

/// Equipment-number flavour of the MOP identity.
#[derive(Args, Debug, Clone, Default)]
pub struct EquipmentArgs {
    #[arg(long)]
    pub equipment_number: Option<String>,

    #[arg(long)]
    pub component_type: Option<String>,

    /// ISO date, YYYY-MM-DD.
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListingArgs {
    /// JSON array of names or blob objects with `pathname`/`url`.
    #[arg(long)]
    pub listing: Option<PathBuf>,

    #[arg(long)]
    pub documents_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SanitizeArgs {
    #[arg(required = true)]
    pub fields: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct FilenameArgs {
    #[command(flatten)]
    pub identity: IdentityArgs,

    #[command(flatten)]
    pub equipment: EquipmentArgs,

    #[arg(long, default_value_t = 1)]
    pub version: u32,

    #[arg(long, default_value = "html")]
    pub extension: String,
}

#[derive(Args, Debug, Clone)]
pub struct NextVersionArgs {
    #[command(flatten)]
    pub identity: IdentityArgs,

    #[command(flatten)]
    pub equipment: EquipmentArgs,

    #[command(flatten)]
    pub listing: ListingArgs,

    #[arg(long, value_enum, default_value_t = MatchMode::Exact)]
    pub match_mode: MatchMode,

    #[arg(long, default_value = "html")]
    pub extension: String,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct GroupsArgs {
    #[command(flatten)]
    pub listing: ListingArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = ".cache/docfamily")]
    pub store_root: PathBuf,

    #[arg(long)]
    pub documents_dir: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ReserveArgs {
    #[arg(long, default_value = ".cache/docfamily")]
    pub store_root: PathBuf,

    #[arg(long)]
    pub ledger_path: Option<PathBuf>,

    #[command(flatten)]
    pub identity: IdentityArgs,

    #[command(flatten)]
    pub equipment: EquipmentArgs,

    #[command(flatten)]
    pub listing: ListingArgs,

    #[arg(long, value_enum, default_value_t = MatchMode::Exact)]
    pub match_mode: MatchMode,

    /// Claim this exact version instead of the next free one.
    #[arg(long)]
    pub version: Option<u32>,

    #[arg(long, default_value = "html")]
    pub extension: String,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/docfamily")]
    pub store_root: PathBuf,

    #[arg(long)]
    pub ledger_path: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}
