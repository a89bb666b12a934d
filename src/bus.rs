// +-----------------+--------------------------------------------------+
// | Target          | Read                    | Write                  |
// +-----------------+-------------------------+------------------------+
// | Ram             | store byte              | store byte (+ tile)    |
// | Rom             | store byte              | ignored                |
// | Register        | latch value or open bus | latch / strobe         |
// | Device          | peripheral              | peripheral             |
// | Unmapped        | open bus (0xFF)         | ignored                |
// +-----------------+-------------------------+------------------------+
use tracing::{trace, warn};

use crate::{
    cpu::{CpuContext, CpuIo, CpuRole, RoleMap},
    io::DeviceBank,
    range::{Resolved, Target, OPEN_BUS},
    state::MachineState,
    store::StoreBank,
};

/// One cpu's view of the machine for the duration of an access burst.
pub struct Bus<'a> {
    cpu: usize,
    contexts: &'a mut [CpuContext],
    stores: &'a mut StoreBank,
    state: &'a mut MachineState,
    devices: &'a mut DeviceBank,
    roles: &'a RoleMap,
}

impl<'a> Bus<'a> {
    pub fn new(
        cpu: usize,
        contexts: &'a mut [CpuContext],
        stores: &'a mut StoreBank,
        state: &'a mut MachineState,
        devices: &'a mut DeviceBank,
        roles: &'a RoleMap,
    ) -> Self {
        Self {
            cpu,
            contexts,
            stores,
            state,
            devices,
            roles,
        }
    }

    fn role(&self) -> CpuRole {
        self.contexts[self.cpu].role
    }

    fn load(&mut self, resolved: Resolved, address: u16) -> u8 {
        match resolved.target {
            Target::Ram { store, .. } | Target::Rom { store, .. } => self
                .stores
                .get(store)
                .map(|s| s.read(resolved.offset))
                .unwrap_or(OPEN_BUS),
            Target::Register(register) => match register.read(self.state) {
                Some(value) => value,
                None => {
                    trace!(
                        "[BUS] {} read from write-only {} at {:04X}",
                        self.role(),
                        register,
                        address
                    );
                    OPEN_BUS
                }
            },
            Target::Device(device) => self.devices.read(device, address, self.state),
            Target::Unmapped => {
                trace!("[BUS] {} read from unmapped {:04X}", self.role(), address);
                OPEN_BUS
            }
        }
    }

    fn store(&mut self, resolved: Resolved, address: u16, value: u8) {
        match resolved.target {
            Target::Ram { store, tiles, .. } => {
                if let Some(store) = self.stores.get_mut(store) {
                    store.write(resolved.offset, value);
                }
                if tiles {
                    self.state.tiles.mark(resolved.offset);
                }
            }
            Target::Rom { .. } => {
                trace!(
                    "[BUS] {} attempt to write to ROM address {:04X} = {:02X}",
                    self.role(),
                    address,
                    value
                );
            }
            Target::Register(register) => {
                if let Some(role) = register.write(value, self.state) {
                    self.signal(role);
                }
            }
            Target::Device(device) => self.devices.write(device, address, value),
            Target::Unmapped => {
                trace!(
                    "[BUS] {} write to unmapped {:04X} = {:02X}",
                    self.role(),
                    address,
                    value
                );
            }
        }
    }

    /// Raises the interrupt request of the cpu playing `role`.
    fn signal(&mut self, role: CpuRole) {
        match self.roles.get(role) {
            Some(index) => {
                trace!("[BUS] {} raises {} interrupt", self.role(), role);
                self.contexts[index].raise();
            }
            None => warn!("[BUS] {} has no {} cpu to interrupt", self.role(), role),
        }
    }

    pub fn read_byte(&mut self, address: u16) -> u8 {
        let resolved = self.contexts[self.cpu].map.read.resolve(address);
        self.load(resolved, address)
    }

    pub fn write_byte(&mut self, address: u16, value: u8) {
        let resolved = self.contexts[self.cpu].map.write.resolve(address);
        self.store(resolved, address, value);
    }

    pub fn input(&mut self, port: u8) -> u8 {
        let resolved = self.contexts[self.cpu].map.port_read.resolve(port as u16);
        self.load(resolved, port as u16)
    }

    pub fn output(&mut self, port: u8, value: u8) {
        let resolved = self.contexts[self.cpu].map.port_write.resolve(port as u16);
        self.store(resolved, port as u16, value);
    }

    pub fn write_block(&mut self, start_addr: u16, data: &[u8]) {
        let mut addr = start_addr;
        for &byte in data {
            self.write_byte(addr, byte);
            addr = addr.wrapping_add(1);
        }
    }
}

impl CpuIo for Bus<'_> {
    fn read_byte(&mut self, address: u16) -> u8 {
        self.read_byte(address)
    }

    fn write_byte(&mut self, address: u16, value: u8) {
        self.write_byte(address, value);
    }

    fn port_in(&mut self, port: u16) -> u8 {
        self.input(port as u8)
    }

    fn port_out(&mut self, port: u16, value: u8) {
        self.output(port as u8, value)
    }
}
