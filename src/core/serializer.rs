use crate::adapters::{JsonCodec, XmlCodec};
use crate::core::graph::SocialGraph;
use crate::core::snapshot::LoadReport;
use crate::domain::ports::{SnapshotCodec, Storage};
use crate::utils::error::{Result, SocialError};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Format {
    Json,
    Xml,
}

impl Format {
    pub const NAMES: [&'static str; 2] = ["json", "xml"];

    /// 依副檔名判斷格式
    pub fn from_path(path: &str) -> Option<Self> {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = SocialError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "xml" => Ok(Format::Xml),
            other => Err(SocialError::InvalidConfigValue {
                field: "format".to_string(),
                value: other.to_string(),
                reason: format!("Unsupported format. Valid formats: {}", Format::NAMES.join(", ")),
            }),
        }
    }
}

/// 匯出／匯入：快照轉碼加上整份檔案讀寫
pub struct Serializer<S: Storage> {
    storage: S,
    json: JsonCodec,
    xml: XmlCodec,
}

impl<S: Storage> Serializer<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            json: JsonCodec::new(),
            xml: XmlCodec::new(),
        }
    }

    pub fn with_json_indent(mut self, width: usize) -> Self {
        self.json = JsonCodec::with_indent(width);
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn codec(&self, format: Format) -> &dyn SnapshotCodec {
        match format {
            Format::Json => &self.json,
            Format::Xml => &self.xml,
        }
    }

    pub fn export(&self, graph: &SocialGraph, format: Format, target: &str) -> Result<()> {
        let snapshot = graph.to_snapshot();
        let bytes = self.codec(format).encode(&snapshot)?;
        self.storage.write_file(target, &bytes)?;

        tracing::info!(
            "📁 Exported {} entities as {} to {}",
            snapshot.entity_count(),
            format,
            target
        );
        Ok(())
    }

    pub fn import(&self, format: Format, source: &str) -> Result<LoadReport> {
        let bytes = self.storage.read_file(source)?;
        let snapshot = self.codec(format).decode(&bytes)?;
        tracing::info!(
            "Read {} entities as {} from {}",
            snapshot.entity_count(),
            format,
            source
        );
        Ok(SocialGraph::from_snapshot(&snapshot))
    }

    pub fn export_json(&self, graph: &SocialGraph, target: &str) -> Result<()> {
        self.export(graph, Format::Json, target)
    }

    pub fn export_xml(&self, graph: &SocialGraph, target: &str) -> Result<()> {
        self.export(graph, Format::Xml, target)
    }

    pub fn import_json(&self, source: &str) -> Result<LoadReport> {
        self.import(Format::Json, source)
    }

    pub fn import_xml(&self, source: &str) -> Result<LoadReport> {
        self.import(Format::Xml, source)
    }
}
