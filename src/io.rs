use std::fmt;

use tracing::trace;

use crate::{error::ConfigError, range::OPEN_BUS, state::MachineState};

/// A chip behind a handler range (sound generator, DAC). It sees the full
/// address or port number, and reads get the board state so a sound chip
/// can return the command latch from one of its input ports.
pub trait Peripheral {
    fn read(&mut self, port: u16, state: &MachineState) -> u8;
    fn write(&mut self, port: u16, value: u8);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DeviceHandle(usize);

/// Devices referenced by the tables, in first-reference order. A slot with
/// nothing attached floats the bus.
#[derive(Default)]
pub struct DeviceBank {
    names: Vec<String>,
    devices: Vec<Option<Box<dyn Peripheral>>>,
}

impl fmt::Debug for DeviceBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_map();
        for (name, device) in self.names.iter().zip(&self.devices) {
            list.entry(name, &device.is_some());
        }
        list.finish()
    }
}

impl DeviceBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: &str) -> DeviceHandle {
        if let Some(index) = self.names.iter().position(|n| n == name) {
            return DeviceHandle(index);
        }
        self.names.push(name.to_string());
        self.devices.push(None);
        DeviceHandle(self.names.len() - 1)
    }

    pub fn attach(&mut self, name: &str, device: Box<dyn Peripheral>) -> Result<(), ConfigError> {
        let index = self
            .names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| ConfigError::UnknownDevice(name.to_string()))?;
        self.devices[index] = Some(device);
        Ok(())
    }

    pub fn name(&self, handle: DeviceHandle) -> Option<&str> {
        self.names.get(handle.0).map(String::as_str)
    }

    pub fn detached(&self) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .zip(&self.devices)
            .filter(|(_, d)| d.is_none())
            .map(|(n, _)| n.as_str())
    }

    pub fn read(&mut self, handle: DeviceHandle, port: u16, state: &MachineState) -> u8 {
        match self.devices.get_mut(handle.0) {
            Some(Some(device)) => device.read(port, state),
            _ => {
                trace!("[IO] Read from detached device at {:04X}", port);
                OPEN_BUS
            }
        }
    }

    pub fn write(&mut self, handle: DeviceHandle, port: u16, value: u8) {
        match self.devices.get_mut(handle.0) {
            Some(Some(device)) => device.write(port, value),
            _ => trace!("[IO] Write to detached device at {:04X} = {:02X}", port, value),
        }
    }

    pub fn release(&mut self) {
        self.devices.iter_mut().for_each(|d| *d = None);
    }
}
