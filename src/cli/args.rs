use crate::domain::error::{CeError, CeResult};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

const EXAMPLES: &str = "\
The following operation types are supported:
  list_volumes     create_volume    delete_volume    remount_volume
  list_snapshots   create_snapshot  delete_snapshot
  list_clones      create_clone
  list_mirrors     create_mirror    update_mirror    delete_mirror

Examples:
  List all volumes with the string \"build\" in them:
    ontapce -o list_volumes -v build

  Create a new volume named \"build123\" with a junction-path of \"/builds/build123\":
    ontapce -o create_volume -v build123 -j /builds/build123

  Delete a volume or a clone named \"build123\":
    ontapce -o delete_volume -v build123

  Remount a volume named \"build123\" with a junction-path of \"/builds/build_current\":
    ontapce -o remount_volume -v build123 -j /builds/build_current

  List all snapshots for volume \"build123\":
    ontapce -o list_snapshots -v build123

  Create a snapshot named \"snap1\" on volume \"build123\":
    ontapce -o create_snapshot -v build123 -s snap1

  Delete a snapshot named \"snap1\" on volume \"build123\":
    ontapce -o delete_snapshot -v build123 -s snap1

  List all clones with the string \"clone\" in them:
    ontapce -o list_clones -c clone

  Create a clone named \"build123_clone\" of volume \"build123\" from snapshot
  \"snap1\", mounted at \"/builds/build123_clone\":
    ontapce -o create_clone -c build123_clone -v build123 -s snap1 -j /builds/build123_clone

  List snapmirror relationships:
    ontapce -o list_mirrors

  Create a snapmirror relationship (also creates the destination volume):
    ontapce -o create_mirror -v build123 -m build123_mirror

  Update a snapmirror relationship:
    ontapce -o update_mirror -m build123_mirror

  Delete a snapmirror relationship:
    ontapce -o delete_mirror -m build123_mirror
";

/// Hint printed after every usage error
pub const USAGE_HINT: &str = "Use -h to see usage and examples.";

/// Command line arguments for ontapce
#[derive(Parser, Debug)]
#[command(
    name = "ontapce",
    version = env!("CARGO_PKG_VERSION"),
    about = "Volume, snapshot, FlexClone and SnapMirror operations over the ONTAP REST API",
    after_help = EXAMPLES
)]
pub struct Args {
    /// Operation type (see below)
    #[arg(short = 'o', value_name = "OPERATION")]
    pub operation: Option<String>,

    /// Volume name
    #[arg(short = 'v', value_name = "VOLUME")]
    pub volume: Option<String>,

    /// Junction path
    #[arg(short = 'j', value_name = "PATH")]
    pub junction: Option<String>,

    /// Snapshot name
    #[arg(short = 's', value_name = "SNAPSHOT")]
    pub snapshot: Option<String>,

    /// Clone name
    #[arg(short = 'c', value_name = "CLONE")]
    pub clone: Option<String>,

    /// SnapMirror destination volume name
    #[arg(short = 'm', value_name = "MIRROR")]
    pub mirror: Option<String>,

    /// Debug mode
    #[arg(short = 'd')]
    pub debug: bool,

    /// Suppress log output
    #[arg(short, long)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    pub config: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Write a commented configuration template to ./.ontapce/config.toml and exit
    #[arg(long)]
    pub init_config: bool,
}

/// Supported operations
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    #[value(name = "list_volumes")]
    ListVolumes,
    #[value(name = "create_volume")]
    CreateVolume,
    #[value(name = "delete_volume")]
    DeleteVolume,
    #[value(name = "remount_volume")]
    RemountVolume,
    #[value(name = "list_snapshots")]
    ListSnapshots,
    #[value(name = "create_snapshot")]
    CreateSnapshot,
    #[value(name = "delete_snapshot")]
    DeleteSnapshot,
    #[value(name = "list_clones")]
    ListClones,
    #[value(name = "create_clone")]
    CreateClone,
    #[value(name = "list_mirrors")]
    ListMirrors,
    #[value(name = "create_mirror")]
    CreateMirror,
    #[value(name = "update_mirror")]
    UpdateMirror,
    #[value(name = "delete_mirror")]
    DeleteMirror,
}

impl Operation {
    /// Look up an operation by its `-o` name
    pub fn from_name(name: &str) -> CeResult<Self> {
        <Self as ValueEnum>::from_str(name, false)
            .map_err(|_| CeError::InvalidOperation(name.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ListVolumes => "list_volumes",
            Operation::CreateVolume => "create_volume",
            Operation::DeleteVolume => "delete_volume",
            Operation::RemountVolume => "remount_volume",
            Operation::ListSnapshots => "list_snapshots",
            Operation::CreateSnapshot => "create_snapshot",
            Operation::DeleteSnapshot => "delete_snapshot",
            Operation::ListClones => "list_clones",
            Operation::CreateClone => "create_clone",
            Operation::ListMirrors => "list_mirrors",
            Operation::CreateMirror => "create_mirror",
            Operation::UpdateMirror => "update_mirror",
            Operation::DeleteMirror => "delete_mirror",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Fixed-width text columns
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
    /// CSV output
    Csv,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Text
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// A validated operation with the arguments it needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCommand {
    ListVolumes { pattern: String },
    CreateVolume { volume: String, junction_path: String },
    DeleteVolume { volume: String },
    RemountVolume { volume: String, junction_path: String },
    ListSnapshots { volume: String },
    CreateSnapshot { volume: String, snapshot: String },
    DeleteSnapshot { volume: String, snapshot: String },
    ListClones { pattern: String },
    CreateClone {
        volume: String,
        clone: String,
        snapshot: String,
        junction_path: String,
    },
    ListMirrors,
    CreateMirror { source: String, destination: String },
    UpdateMirror { destination: String },
    DeleteMirror { destination: String },
}

impl StorageCommand {
    pub fn operation(&self) -> Operation {
        match self {
            StorageCommand::ListVolumes { .. } => Operation::ListVolumes,
            StorageCommand::CreateVolume { .. } => Operation::CreateVolume,
            StorageCommand::DeleteVolume { .. } => Operation::DeleteVolume,
            StorageCommand::RemountVolume { .. } => Operation::RemountVolume,
            StorageCommand::ListSnapshots { .. } => Operation::ListSnapshots,
            StorageCommand::CreateSnapshot { .. } => Operation::CreateSnapshot,
            StorageCommand::DeleteSnapshot { .. } => Operation::DeleteSnapshot,
            StorageCommand::ListClones { .. } => Operation::ListClones,
            StorageCommand::CreateClone { .. } => Operation::CreateClone,
            StorageCommand::ListMirrors => Operation::ListMirrors,
            StorageCommand::CreateMirror { .. } => Operation::CreateMirror,
            StorageCommand::UpdateMirror { .. } => Operation::UpdateMirror,
            StorageCommand::DeleteMirror { .. } => Operation::DeleteMirror,
        }
    }
}

impl Args {
    /// Check the flags the selected operation requires.
    ///
    /// Flags are checked in a fixed order per operation and the first one
    /// missing is reported. Empty values count as missing.
    pub fn storage_command(&self) -> CeResult<StorageCommand> {
        let op = Operation::from_name(self.operation.as_deref().ok_or(CeError::NoOperation)?)?;

        let volume = || required(&self.volume, "volume name", op);
        let junction = || required(&self.junction, "junction path", op);
        let snapshot = || required(&self.snapshot, "snapshot name", op);
        let clone = || required(&self.clone, "clone name", op);
        let mirror = || required(&self.mirror, "mirror volume", op);

        let command = match op {
            Operation::ListVolumes => StorageCommand::ListVolumes { pattern: volume()? },
            Operation::CreateVolume => StorageCommand::CreateVolume {
                volume: volume()?,
                junction_path: junction()?,
            },
            Operation::DeleteVolume => StorageCommand::DeleteVolume { volume: volume()? },
            Operation::RemountVolume => StorageCommand::RemountVolume {
                volume: volume()?,
                junction_path: junction()?,
            },
            Operation::ListSnapshots => StorageCommand::ListSnapshots { volume: volume()? },
            Operation::CreateSnapshot => StorageCommand::CreateSnapshot {
                volume: volume()?,
                snapshot: snapshot()?,
            },
            Operation::DeleteSnapshot => StorageCommand::DeleteSnapshot {
                volume: volume()?,
                snapshot: snapshot()?,
            },
            Operation::ListClones => StorageCommand::ListClones { pattern: clone()? },
            Operation::CreateClone => StorageCommand::CreateClone {
                volume: volume()?,
                snapshot: snapshot()?,
                clone: clone()?,
                junction_path: junction()?,
            },
            Operation::ListMirrors => StorageCommand::ListMirrors,
            Operation::CreateMirror => StorageCommand::CreateMirror {
                source: volume()?,
                destination: mirror()?,
            },
            Operation::UpdateMirror => StorageCommand::UpdateMirror { destination: mirror()? },
            Operation::DeleteMirror => StorageCommand::DeleteMirror { destination: mirror()? },
        };

        Ok(command)
    }
}

fn required(value: &Option<String>, what: &'static str, op: Operation) -> CeResult<String> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(CeError::MissingArgument {
            what,
            op: op.to_string(),
        }),
    }
}
