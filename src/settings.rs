use anyhow::{Context, Error};
use preferences::{AppInfo, Preferences};
use serde::{Serialize, Deserialize};

const APP_INFO: AppInfo = AppInfo {
    name: "usbdesc",
    author: "usbdesc"
};

const PREFERENCES_KEY: &str = "settings";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fetch string descriptors to show alongside string indices.
    pub fetch_strings: bool,
    /// Look up vendor, product and class names in the USB ID database.
    pub lookup_names: bool,
    /// Spaces per collection level in report descriptor listings.
    pub indent: usize,
    /// Fetch and decode HID report descriptors.
    pub show_reports: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            fetch_strings: true,
            lookup_names: false,
            indent: 3,
            show_reports: true,
        }
    }
}

impl Settings {
    pub fn load() -> Settings {
        <Settings as Preferences>::load(&APP_INFO, PREFERENCES_KEY)
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<(), Error> {
        <Settings as Preferences>::save(self, &APP_INFO, PREFERENCES_KEY)
            .context("Failed to save settings")
    }
}
