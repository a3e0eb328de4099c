// ブリッジ設定
// SPDX-License-Identifier: MPL-2.0
// SPDX-FileCopyrightText: 2025 Akihiro Yamamoto <github.com/ak1211>
//
use crate::bridge::{MAX_WRITE_BYTES, SlaveAddress};
use crate::wire::{BUFFER_LENGTH, REGISTER_COUNT, SimulatedDevice, SimulatedWire};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(r#"i/o "{0}""#)]
    Io(#[from] io::Error),

    #[error(r#"toml "{0}""#)]
    Toml(#[from] toml::de::Error),

    #[error("invalid device address 0x{0:02X}")]
    InvalidDeviceAddress(u8),

    #[error("duplicate device address 0x{0:02X}")]
    DuplicateDevice(u8),

    #[error("device 0x{0:02X} memory is too large ({1} bytes)")]
    MemoryTooLarge(u8, usize),

    #[error("max_write_bytes must be 1 to 32, not {0}")]
    InvalidMaxWriteBytes(usize),
}

/// 模擬デバイス設定
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeviceSettings {
    pub address: u8,
    #[serde(default)]
    pub memory: Vec<u8>,
    #[serde(default)]
    pub read_only: bool,
}

/// ブリッジ設定
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeSettings {
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub debug: bool,
    pub max_write_bytes: usize,
    #[serde(rename = "device")]
    pub devices: Vec<DeviceSettings>,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        BridgeSettings {
            baud_rate: 9600,
            read_timeout_ms: 100_000,
            debug: true,
            max_write_bytes: MAX_WRITE_BYTES,
            devices: vec![],
        }
    }
}

impl BridgeSettings {
    /// 設定ファイルを読む
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        fs::read_to_string(path)?.parse()
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(1..=BUFFER_LENGTH).contains(&self.max_write_bytes) {
            return Err(SettingsError::InvalidMaxWriteBytes(self.max_write_bytes));
        }
        let mut seen = BTreeSet::new();
        for device in self.devices.iter() {
            SlaveAddress::try_from(device.address).map_err(SettingsError::InvalidDeviceAddress)?;
            if !seen.insert(device.address) {
                return Err(SettingsError::DuplicateDevice(device.address));
            }
            if device.memory.len() > REGISTER_COUNT {
                return Err(SettingsError::MemoryTooLarge(
                    device.address,
                    device.memory.len(),
                ));
            }
        }
        Ok(())
    }

    /// 設定したデバイスをつないだ模擬バス
    pub fn simulated_wire(&self) -> SimulatedWire {
        let mut wire = SimulatedWire::new();
        for device in self.devices.iter() {
            let simulated = SimulatedDevice::with_memory(&device.memory);
            let simulated = if device.read_only {
                simulated.read_only()
            } else {
                simulated
            };
            wire.attach(device.address, simulated);
        }
        wire
    }
}

impl FromStr for BridgeSettings {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let settings = toml::from_str::<BridgeSettings>(s)?;
        settings.validate()?;
        Ok(settings)
    }
}

#[test]
fn test1() {
    let settings = "".parse::<BridgeSettings>().unwrap();
    assert_eq!(settings, BridgeSettings::default());
    assert_eq!(settings.baud_rate, 9600);
    assert!(settings.debug);
    assert_eq!(settings.max_write_bytes, 32);
}

#[test]
fn test2() {
    let toml = r#"
        # i2cbridge設定ファイル
        baud_rate = 115200
        debug = false

        [[device]]
        address = 0x50
        memory = [0x0A, 0xFF, 0x00, 0x1B]

        [[device]]
        address = 0x68
        read_only = true
    "#;
    let settings = toml.parse::<BridgeSettings>().unwrap();
    assert_eq!(settings.baud_rate, 115200);
    assert_eq!(settings.read_timeout_ms, 100_000);
    assert!(!settings.debug);
    assert_eq!(settings.devices.len(), 2);

    let wire = settings.simulated_wire();
    assert_eq!(wire.addresses().collect::<Vec<u8>>(), vec![0x50, 0x68]);
    assert_eq!(&wire.device(0x50).unwrap().memory()[..4], &[0x0a, 0xff, 0x00, 0x1b]);
}

#[test]
fn test3() {
    let invalid = "[[device]]\naddress = 0x78\n".parse::<BridgeSettings>();
    assert!(matches!(invalid, Err(SettingsError::InvalidDeviceAddress(0x78))));

    let duplicate = "[[device]]\naddress = 0x50\n[[device]]\naddress = 0x50\n"
        .parse::<BridgeSettings>();
    assert!(matches!(duplicate, Err(SettingsError::DuplicateDevice(0x50))));

    let too_many = "max_write_bytes = 33\n".parse::<BridgeSettings>();
    assert!(matches!(too_many, Err(SettingsError::InvalidMaxWriteBytes(33))));

    let broken = "baud_rate = \"fast\"\n".parse::<BridgeSettings>();
    assert!(matches!(broken, Err(SettingsError::Toml(_))));
}
