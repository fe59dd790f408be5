//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

#![allow(clippy::derivable_impls)]

use fci_core::codec::ReplyFraming;
use fci_core::ownership::{AuthorizedMask, SenderClass};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub user: String,
    pub socket_path: String,
    pub max_clients: usize,
    pub namespace: String,
    pub reply_framing: ReplyFramingMode,
    pub authorized_senders: Vec<SenderClassName>,
    pub logging: Logging,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyFramingMode {
    Standard,
    Legacy,
}

impl From<ReplyFramingMode> for ReplyFraming {
    fn from(mode: ReplyFramingMode) -> Self {
        match mode {
            ReplyFramingMode::Standard => ReplyFraming::Standard,
            ReplyFramingMode::Legacy => ReplyFraming::Legacy,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderClassName {
    Hif0,
    Hif1,
    Hif2,
    Hif3,
    HifNoCpy,
}

impl From<SenderClassName> for SenderClass {
    fn from(name: SenderClassName) -> Self {
        match name {
            SenderClassName::Hif0 => SenderClass::Hif0,
            SenderClassName::Hif1 => SenderClass::Hif1,
            SenderClassName::Hif2 => SenderClass::Hif2,
            SenderClassName::Hif3 => SenderClass::Hif3,
            SenderClassName::HifNoCpy => SenderClass::HifNoCpy,
        }
    }
}

/// An empty list maps to an empty mask, which `OwnershipState::new`
/// already treats as "every sender class authorized".
pub fn authorized_mask(senders: &[SenderClassName]) -> AuthorizedMask {
    senders.iter().fold(AuthorizedMask::empty(), |mask, name| {
        mask | bit_for(SenderClass::from(*name))
    })
}

fn bit_for(class: SenderClass) -> AuthorizedMask {
    match class {
        SenderClass::Hif0 => AuthorizedMask::HIF0,
        SenderClass::Hif1 => AuthorizedMask::HIF1,
        SenderClass::Hif2 => AuthorizedMask::HIF2,
        SenderClass::Hif3 => AuthorizedMask::HIF3,
        SenderClass::HifNoCpy => AuthorizedMask::HIF_NOCPY,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Logging {
    pub journald: LoggingJournald,
    pub file: LoggingFile,
    pub stdout: LoggingStdout,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingJournald {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingFile {
    pub enabled: bool,
    pub dir: String,
    pub name: String,
    pub rotation: LoggingFileRotation,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingStdout {
    pub enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingFileRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

// ===== impl Config =====

impl Config {
    const DFLT_FILEPATH: &'static str = "/etc/fcid.toml";

    pub(crate) fn load(config_file: Option<&str>) -> Config {
        let config_file = config_file.unwrap_or(Config::DFLT_FILEPATH);

        match std::fs::read_to_string(config_file) {
            Ok(config_str) => {
                toml::from_str(&config_str).expect("failed to parse configuration file")
            }
            Err(err) => {
                eprintln!("failed to load configuration file: {err}");
                eprintln!("falling back to default configuration...");
                Config::default()
            }
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            user: "fci".to_owned(),
            socket_path: "/var/run/fcid.sock".to_owned(),
            max_clients: fci_core::registry::DEFAULT_MAX_CLIENTS,
            namespace: "default".to_owned(),
            reply_framing: ReplyFramingMode::Standard,
            authorized_senders: Vec::new(),
            logging: Default::default(),
        }
    }
}

impl Default for LoggingJournald {
    fn default() -> LoggingJournald {
        LoggingJournald { enabled: false }
    }
}

impl Default for LoggingFile {
    fn default() -> LoggingFile {
        LoggingFile {
            enabled: true,
            dir: "/var/log".to_owned(),
            name: "fcid.log".to_owned(),
            rotation: Default::default(),
        }
    }
}

impl Default for LoggingStdout {
    fn default() -> LoggingStdout {
        LoggingStdout { enabled: false }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_sender_list_means_all_authorized() {
        let mask = authorized_mask(&[]);
        assert!(mask.is_empty());
    }

    #[test]
    fn specific_senders_combine_into_a_mask() {
        let mask = authorized_mask(&[SenderClassName::Hif0, SenderClassName::Hif2]);
        assert!(mask.contains(AuthorizedMask::HIF0));
        assert!(mask.contains(AuthorizedMask::HIF2));
        assert!(!mask.contains(AuthorizedMask::HIF1));
    }
}
