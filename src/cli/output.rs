use crate::cli::args::OutputFormat;
use crate::core::resources::{SnapmirrorRecord, SnapshotRecord, VolumeRecord};
use serde::Serialize;
use std::io::{self, Write};
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter: Send + Sync {
    fn write_volumes(&self, volumes: &[VolumeRecord]) -> Result<(), OutputError>;
    fn write_snapshots(&self, volume: &str, snapshots: &[SnapshotRecord]) -> Result<(), OutputError>;
    fn write_clones(&self, clones: &[VolumeRecord]) -> Result<(), OutputError>;
    fn write_mirrors(&self, mirrors: &[SnapmirrorRecord]) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::CeError {
    fn from(err: OutputError) -> Self {
        match err {
            OutputError::IoError(e) => Self::Io(e),
            OutputError::JsonError(e) => Self::Output(e.to_string()),
        }
    }
}

/// Row of the volume listing
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct VolumeRow {
    #[tabled(rename = "Volume Name")]
    pub name: String,
    #[tabled(rename = "Junction Path")]
    pub junction_path: String,
    #[tabled(rename = "Size (GB)", display_with = "display_gib")]
    pub size_gb: Option<u64>,
    #[tabled(rename = "Used (GB)", display_with = "display_gib")]
    pub used_gb: Option<u64>,
}

impl From<&VolumeRecord> for VolumeRow {
    fn from(volume: &VolumeRecord) -> Self {
        let space = volume.space_gib();
        Self {
            name: volume.name().to_string(),
            junction_path: volume.junction_path().to_string(),
            size_gb: space.map(|(size, _)| size),
            used_gb: space.map(|(_, used)| used),
        }
    }
}

/// Row of the snapshot listing
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct SnapshotRow {
    #[tabled(rename = "Volume Name")]
    pub volume: String,
    #[tabled(rename = "Snapshot Name")]
    pub name: String,
    #[tabled(rename = "Snapshot Date")]
    pub create_time: String,
}

impl SnapshotRow {
    fn new(volume: &str, snapshot: &SnapshotRecord) -> Self {
        Self {
            volume: volume.to_string(),
            name: snapshot.name.clone().unwrap_or_default(),
            create_time: snapshot.create_time.clone().unwrap_or_default(),
        }
    }
}

/// Row of the FlexClone listing
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct CloneRow {
    #[tabled(rename = "Parent Volume")]
    pub parent_volume: String,
    #[tabled(rename = "Parent Snapshot")]
    pub parent_snapshot: String,
    #[tabled(rename = "FlexClone Volume")]
    pub name: String,
    #[tabled(rename = "FlexClone Junction")]
    pub junction_path: String,
}

impl From<&VolumeRecord> for CloneRow {
    fn from(volume: &VolumeRecord) -> Self {
        Self {
            parent_volume: volume.parent_volume().to_string(),
            parent_snapshot: volume.parent_snapshot().to_string(),
            name: volume.name().to_string(),
            junction_path: volume.junction_path().to_string(),
        }
    }
}

/// Row of the SnapMirror listing
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct MirrorRow {
    #[tabled(rename = "Source")]
    pub source: String,
    #[tabled(rename = "Destination")]
    pub destination: String,
    #[tabled(rename = "State")]
    pub state: String,
    #[tabled(rename = "Status")]
    pub status: String,
}

impl From<&SnapmirrorRecord> for MirrorRow {
    fn from(mirror: &SnapmirrorRecord) -> Self {
        Self {
            source: mirror.source_path().to_string(),
            destination: mirror.destination_path().to_string(),
            state: mirror.state.clone().unwrap_or_default(),
            status: mirror.transfer_status().to_string(),
        }
    }
}

fn display_gib(value: &Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn stdout(&self, text: &str) -> Result<(), OutputError> {
        write_text(&mut io::stdout().lock(), text)
    }

    fn stderr(&self, text: &str) -> Result<(), OutputError> {
        write_text(&mut io::stderr().lock(), text)
    }
}

/// Write and flush, handing a closed pipe back as an error
pub(crate) fn write_text<W: Write>(out: &mut W, text: &str) -> Result<(), OutputError> {
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}

impl OutputWriter for ConsoleWriter {
    fn write_volumes(&self, volumes: &[VolumeRecord]) -> Result<(), OutputError> {
        let rows: Vec<VolumeRow> = volumes.iter().map(VolumeRow::from).collect();
        self.stdout(&render_volumes(&self.format, &rows)?)
    }

    fn write_snapshots(&self, volume: &str, snapshots: &[SnapshotRecord]) -> Result<(), OutputError> {
        let rows: Vec<SnapshotRow> = snapshots.iter().map(|s| SnapshotRow::new(volume, s)).collect();
        self.stdout(&render_snapshots(&self.format, &rows)?)
    }

    fn write_clones(&self, clones: &[VolumeRecord]) -> Result<(), OutputError> {
        let rows: Vec<CloneRow> = clones.iter().map(CloneRow::from).collect();
        self.stdout(&render_clones(&self.format, &rows)?)
    }

    fn write_mirrors(&self, mirrors: &[SnapmirrorRecord]) -> Result<(), OutputError> {
        let rows: Vec<MirrorRow> = mirrors.iter().map(MirrorRow::from).collect();
        self.stdout(&render_mirrors(&self.format, &rows)?)
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "message": message,
                    "level": "info"
                });
                self.stdout(&format!("{}\n", serde_json::to_string_pretty(&output)?))
            }
            _ => self.stdout(&format!("{}\n", message)),
        }
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "error": error,
                    "level": "error"
                });
                self.stderr(&format!("{}\n", serde_json::to_string_pretty(&output)?))
            }
            _ => self.stderr(&format!("{}\n", error)),
        }
    }
}

pub fn render_volumes(format: &OutputFormat, rows: &[VolumeRow]) -> Result<String, OutputError> {
    render(format, rows, |out| {
        out.push_str(&format!(
            "{:<24} {:<40} {:>10} {:>10}\n",
            "Volume Name", "Junction Path", "Size (GB)", "Used (GB)"
        ));
        out.push_str(&rule(24 + 40 + 10 + 10 + 3));
        for row in rows {
            out.push_str(&format!(
                "{:<24} {:<40} {:>10} {:>10}\n",
                row.name,
                row.junction_path,
                display_gib(&row.size_gb),
                display_gib(&row.used_gb)
            ));
        }
    }, |row| {
        vec![
            row.name.clone(),
            row.junction_path.clone(),
            display_gib(&row.size_gb),
            display_gib(&row.used_gb),
        ]
    }, &["name", "junction_path", "size_gb", "used_gb"])
}

pub fn render_snapshots(format: &OutputFormat, rows: &[SnapshotRow]) -> Result<String, OutputError> {
    render(format, rows, |out| {
        out.push_str(&format!(
            "{:<32} {:<32} {:<28}\n",
            "Volume Name", "Snapshot Name", "Snapshot Date"
        ));
        out.push_str(&rule(32 + 32 + 28 + 2));
        for row in rows {
            out.push_str(&format!("{:<32} {:<32} {:<28}\n", row.volume, row.name, row.create_time));
        }
    }, |row| vec![row.volume.clone(), row.name.clone(), row.create_time.clone()],
    &["volume", "name", "create_time"])
}

pub fn render_clones(format: &OutputFormat, rows: &[CloneRow]) -> Result<String, OutputError> {
    render(format, rows, |out| {
        out.push_str(&format!(
            "{:<24} {:<24} {:<24} {:<24}\n",
            "Parent Volume", "Parent Snapshot", "FlexClone Volume", "FlexClone Junction"
        ));
        out.push_str(&rule(24 * 4 + 3));
        for row in rows {
            out.push_str(&format!(
                "{:<24} {:<24} {:<24} {:<24}\n",
                row.parent_volume, row.parent_snapshot, row.name, row.junction_path
            ));
        }
    }, |row| {
        vec![
            row.parent_volume.clone(),
            row.parent_snapshot.clone(),
            row.name.clone(),
            row.junction_path.clone(),
        ]
    }, &["parent_volume", "parent_snapshot", "name", "junction_path"])
}

pub fn render_mirrors(format: &OutputFormat, rows: &[MirrorRow]) -> Result<String, OutputError> {
    render(format, rows, |out| {
        out.push_str(&format!(
            "{:<32} {:<32} {:<16} {:<16}\n",
            "Source", "Destination", "State", "Status"
        ));
        out.push_str(&rule(32 + 32 + 16 + 16 + 3));
        for row in rows {
            out.push_str(&format!(
                "{:<32} {:<32} {:<16} {:<16}\n",
                row.source, row.destination, row.state, row.status
            ));
        }
    }, |row| {
        vec![
            row.source.clone(),
            row.destination.clone(),
            row.state.clone(),
            row.status.clone(),
        ]
    }, &["source", "destination", "state", "status"])
}

/// Shared dispatch over the output formats for one listing
fn render<R, T, C>(
    format: &OutputFormat,
    rows: &[R],
    text: T,
    csv_fields: C,
    csv_header: &[&str],
) -> Result<String, OutputError>
where
    R: Serialize + Tabled + Clone,
    T: FnOnce(&mut String),
    C: Fn(&R) -> Vec<String>,
{
    let mut out = String::new();
    match format {
        OutputFormat::Text => {
            out.push('\n');
            text(&mut out);
        }
        OutputFormat::Json => {
            out.push_str(&serde_json::to_string_pretty(rows)?);
            out.push('\n');
        }
        OutputFormat::Table => {
            if !rows.is_empty() {
                out.push_str(&Table::new(rows.to_vec()).to_string());
                out.push('\n');
            }
        }
        OutputFormat::Csv => {
            out.push_str(&csv_header.join(","));
            out.push('\n');
            for row in rows {
                let fields: Vec<String> = csv_fields(row).iter().map(|f| csv_field(f)).collect();
                out.push_str(&fields.join(","));
                out.push('\n');
            }
        }
    }
    Ok(out)
}

fn rule(width: usize) -> String {
    format!("{}\n", "-".repeat(width))
}

fn csv_field(value: &str) -> String {
    if value.contains(&[',', '"', '\n'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Writer that keeps everything in memory, for operation tests
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingWriter {
    pub stdout: std::sync::Mutex<Vec<String>>,
    pub stderr: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn out(&self) -> Vec<String> {
        self.stdout.lock().unwrap().clone()
    }

    pub fn err(&self) -> Vec<String> {
        self.stderr.lock().unwrap().clone()
    }

    fn push_rendered(&self, rendered: String) {
        let mut stdout = self.stdout.lock().unwrap();
        stdout.extend(rendered.lines().map(str::to_string));
    }
}

#[cfg(test)]
impl OutputWriter for RecordingWriter {
    fn write_volumes(&self, volumes: &[VolumeRecord]) -> Result<(), OutputError> {
        let rows: Vec<VolumeRow> = volumes.iter().map(VolumeRow::from).collect();
        self.push_rendered(render_volumes(&OutputFormat::Text, &rows)?);
        Ok(())
    }

    fn write_snapshots(&self, volume: &str, snapshots: &[SnapshotRecord]) -> Result<(), OutputError> {
        let rows: Vec<SnapshotRow> = snapshots.iter().map(|s| SnapshotRow::new(volume, s)).collect();
        self.push_rendered(render_snapshots(&OutputFormat::Text, &rows)?);
        Ok(())
    }

    fn write_clones(&self, clones: &[VolumeRecord]) -> Result<(), OutputError> {
        let rows: Vec<CloneRow> = clones.iter().map(CloneRow::from).collect();
        self.push_rendered(render_clones(&OutputFormat::Text, &rows)?);
        Ok(())
    }

    fn write_mirrors(&self, mirrors: &[SnapmirrorRecord]) -> Result<(), OutputError> {
        let rows: Vec<MirrorRow> = mirrors.iter().map(MirrorRow::from).collect();
        self.push_rendered(render_mirrors(&OutputFormat::Text, &rows)?);
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        self.stdout.lock().unwrap().push(message.to_string());
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        self.stderr.lock().unwrap().push(error.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume_rows() -> Vec<VolumeRow> {
        vec![
            VolumeRow {
                name: "build123".to_string(),
                junction_path: "/builds/build123".to_string(),
                size_gb: Some(10240),
                used_gb: Some(3),
            },
            VolumeRow {
                name: "build_mirror".to_string(),
                junction_path: String::new(),
                size_gb: None,
                used_gb: None,
            },
        ]
    }

    #[test]
    fn test_volume_text_columns() {
        let text = render_volumes(&OutputFormat::Text, &volume_rows()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "");
        assert!(lines[1].starts_with(&format!("{:<24} {:<40}", "Volume Name", "Junction Path")));
        assert_eq!(lines[2], "-".repeat(87));
        assert_eq!(
            lines[3],
            format!("{:<24} {:<40} {:>10} {:>10}", "build123", "/builds/build123", "10240", "3")
        );
        assert_eq!(lines[4].trim_end(), "build_mirror");
        assert_eq!(lines[4].len(), 87);
    }

    #[test]
    fn test_volume_json_keeps_numbers() {
        let text = render_volumes(&OutputFormat::Json, &volume_rows()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["size_gb"], 10240);
        assert!(value[1]["used_gb"].is_null());
    }

    #[test]
    fn test_volume_csv() {
        let text = render_volumes(&OutputFormat::Csv, &volume_rows()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "name,junction_path,size_gb,used_gb");
        assert_eq!(lines[1], "build123,/builds/build123,10240,3");
        assert_eq!(lines[2], "build_mirror,,,");
    }

    #[test]
    fn test_table_headers_use_column_titles() {
        let text = render_volumes(&OutputFormat::Table, &volume_rows()).unwrap();
        assert!(text.contains("Volume Name"));
        assert!(text.contains("Size (GB)"));
        assert!(text.contains("build123"));

        let empty = render_volumes(&OutputFormat::Table, &[]).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_mirror_row_idle_status() {
        let record = SnapmirrorRecord {
            state: Some("snapmirrored".to_string()),
            ..SnapmirrorRecord::default()
        };
        let row = MirrorRow::from(&record);
        assert_eq!(row.status, "idle");

        let text = render_mirrors(&OutputFormat::Text, &[row]).unwrap();
        assert!(text.contains("snapmirrored"));
        assert!(text.contains("idle"));
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "Broken pipe"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_closed_pipe_is_an_error() {
        let err = write_text(&mut ClosedPipe, "build123\n").unwrap_err();
        assert!(matches!(&err, OutputError::IoError(e) if e.kind() == io::ErrorKind::BrokenPipe));

        let err: crate::domain::error::CeError = err.into();
        assert!(err.is_broken_pipe());
    }

    #[test]
    fn test_write_text_flushes_everything() {
        let mut buffer = Vec::new();
        write_text(&mut buffer, "line one\nline two\n").unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "line one\nline two\n");
    }
}
