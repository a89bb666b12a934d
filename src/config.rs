use std::{fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    clock::Rate,
    cpu::{CpuRole, InterruptGate, InterruptKind, PeriodicInterrupt},
    error::ConfigError,
    range::TableKind,
    registers::Register,
};

/// Declarative description of a board: everything needed to build a
/// machine except the cpu cores, devices and video collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub name: String,
    pub frames_per_second: u32,
    pub slices_per_frame: u32,
    #[serde(default)]
    pub total_colors: u16,
    pub cpus: Vec<CpuConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuConfig {
    pub role: CpuRole,
    pub clock_hz: u32,
    #[serde(default)]
    pub periodic: Vec<PeriodicInterrupt>,
    #[serde(default = "default_strobe")]
    pub strobe: InterruptKind,
    #[serde(default)]
    pub gate: InterruptGate,
    #[serde(default)]
    pub read: Vec<RangeConfig>,
    #[serde(default)]
    pub write: Vec<RangeConfig>,
    #[serde(default)]
    pub port_read: Vec<RangeConfig>,
    #[serde(default)]
    pub port_write: Vec<RangeConfig>,
}

fn default_strobe() -> InterruptKind {
    InterruptKind::Irq(0xFF)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeConfig {
    pub low: u16,
    pub high: u16,
    #[serde(flatten)]
    pub target: TargetConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetConfig {
    /// RAM. Without a store id the range gets private storage.
    Ram {
        #[serde(default)]
        store: Option<String>,
        #[serde(default)]
        base: u16,
        #[serde(default)]
        tiles: bool,
    },
    Rom {
        store: String,
        #[serde(default)]
        base: u16,
    },
    Register {
        register: Register,
    },
    Device {
        device: String,
    },
    Unmapped,
}

impl RangeConfig {
    pub fn ram(low: u16, high: u16) -> Self {
        Self {
            low,
            high,
            target: TargetConfig::Ram {
                store: None,
                base: 0,
                tiles: false,
            },
        }
    }

    /// RAM backed by the named store; every range naming it sees the same bytes.
    pub fn shared(low: u16, high: u16, store: &str) -> Self {
        Self {
            low,
            high,
            target: TargetConfig::Ram {
                store: Some(store.to_string()),
                base: 0,
                tiles: false,
            },
        }
    }

    pub fn rom(low: u16, high: u16, store: &str) -> Self {
        Self {
            low,
            high,
            target: TargetConfig::Rom {
                store: store.to_string(),
                base: 0,
            },
        }
    }

    pub fn register(low: u16, high: u16, register: Register) -> Self {
        Self {
            low,
            high,
            target: TargetConfig::Register { register },
        }
    }

    pub fn device(low: u16, high: u16, device: &str) -> Self {
        Self {
            low,
            high,
            target: TargetConfig::Device {
                device: device.to_string(),
            },
        }
    }

    pub fn unmapped(low: u16, high: u16) -> Self {
        Self {
            low,
            high,
            target: TargetConfig::Unmapped,
        }
    }

    /// Starts the window `offset` bytes into its store.
    pub fn base(mut self, offset: u16) -> Self {
        match &mut self.target {
            TargetConfig::Ram { base, .. } | TargetConfig::Rom { base, .. } => *base = offset,
            _ => {}
        }
        self
    }

    /// Marks written offsets dirty in the tile cache.
    pub fn tiles(mut self) -> Self {
        if let TargetConfig::Ram { tiles, .. } = &mut self.target {
            *tiles = true;
        }
        self
    }
}

impl CpuConfig {
    pub fn new(role: CpuRole, clock_hz: u32) -> Self {
        Self {
            role,
            clock_hz,
            periodic: Vec::new(),
            strobe: default_strobe(),
            gate: InterruptGate::Open,
            read: Vec::new(),
            write: Vec::new(),
            port_read: Vec::new(),
            port_write: Vec::new(),
        }
    }

    pub fn periodic(mut self, kind: InterruptKind, rate: Rate) -> Self {
        self.periodic.push(PeriodicInterrupt { kind, rate });
        self
    }

    pub fn strobe(mut self, kind: InterruptKind) -> Self {
        self.strobe = kind;
        self
    }

    pub fn gate(mut self, gate: InterruptGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn read(mut self, ranges: Vec<RangeConfig>) -> Self {
        self.read = ranges;
        self
    }

    pub fn write(mut self, ranges: Vec<RangeConfig>) -> Self {
        self.write = ranges;
        self
    }

    pub fn port_read(mut self, ranges: Vec<RangeConfig>) -> Self {
        self.port_read = ranges;
        self
    }

    pub fn port_write(mut self, ranges: Vec<RangeConfig>) -> Self {
        self.port_write = ranges;
        self
    }
}

impl CpuConfig {
    /// Every range of this cpu, table by table in declaration order.
    pub fn ranges(&self) -> impl Iterator<Item = (TableKind, &RangeConfig)> {
        TableKind::ALL.into_iter().flat_map(move |kind| {
            let ranges = match kind {
                TableKind::Read => &self.read,
                TableKind::Write => &self.write,
                TableKind::PortRead => &self.port_read,
                TableKind::PortWrite => &self.port_write,
            };
            ranges.iter().map(move |range| (kind, range))
        })
    }
}

impl MachineConfig {
    pub fn new(name: &str, frames_per_second: u32, slices_per_frame: u32) -> Self {
        Self {
            name: name.to_string(),
            frames_per_second,
            slices_per_frame,
            total_colors: 0,
            cpus: Vec::new(),
        }
    }

    pub fn colors(mut self, total_colors: u16) -> Self {
        self.total_colors = total_colors;
        self
    }

    pub fn cpu(mut self, cpu: CpuConfig) -> Self {
        self.cpus.push(cpu);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading machine config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing machine config {}", path.display()))
    }
}
