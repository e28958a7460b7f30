//! Descriptor buffers captured from a device, stored as JSON.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Error, bail};
use serde::{Serialize, Deserialize};

use crate::decoder::{DescriptorRequest, DescriptorSource};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCapture {
    pub interface: u8,
    pub index: u8,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringCapture {
    pub index: u8,
    pub language: u16,
    pub data: Vec<u8>,
}

/// Everything a device returned to descriptor requests.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureFile {
    pub device: Vec<u8>,
    #[serde(default)]
    pub configurations: Vec<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub: Option<Vec<u8>>,
    #[serde(default)]
    pub reports: Vec<ReportCapture>,
    #[serde(default)]
    pub strings: Vec<StringCapture>,
}

impl CaptureFile {
    pub fn load(path: &Path) -> Result<CaptureFile, Error> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        writer.flush()
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

impl DescriptorSource for CaptureFile {
    fn fetch(&mut self, request: &DescriptorRequest) -> Result<Vec<u8>, Error> {
        use DescriptorRequest::*;
        match *request {
            Device => {
                if self.device.is_empty() {
                    bail!("Capture has no device descriptor")
                }
                Ok(self.device.clone())
            },
            Configuration { index } => self.configurations
                .get(index as usize)
                .cloned()
                .with_context(|| format!("Capture has no configuration {index}")),
            Hub => self.hub
                .clone()
                .context("Capture has no hub descriptor"),
            Report { interface, index, .. } => self.reports
                .iter()
                .find(|r| r.interface == interface && r.index == index)
                .map(|r| r.data.clone())
                .with_context(|| format!(
                    "Capture has no report descriptor {index} for interface {interface}")),
            String { index, language } => {
                let matching = || self.strings.iter().filter(|s| s.index == index.0);
                matching()
                    .find(|s| s.language == language)
                    .or_else(|| matching().next())
                    .map(|s| s.data.clone())
                    .with_context(|| format!("Capture has no string {index}"))
            },
        }
    }
}
