use std::{
    collections::HashMap,
    fmt,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::Context;
use derivative::Derivative;
use tracing::{debug, info, trace, warn};

use crate::{
    bus::Bus,
    clock::{ClockEvent, SliceClock},
    config::{MachineConfig, TargetConfig},
    cpu::{CpuContext, CpuCore, CpuRole, InterruptKind, RoleMap},
    error::ConfigError,
    io::{DeviceBank, Peripheral},
    range::{AddressRange, Resolved, TableKind, Target, WindowRef, OPEN_BUS},
    state::{MachineState, INPUT_PORTS},
    store::{SharedWindow, SharedWindowRegistry, StoreBank},
    utils::hexdump,
    video::{FrameView, VideoRefresh},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MachineStatus {
    Idle,
    Running,
    Stopped,
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineStatus::Idle => write!(f, "idle"),
            MachineStatus::Running => write!(f, "running"),
            MachineStatus::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// All slices ran and the video collaborator was refreshed.
    Completed,
    /// The machine has not been started.
    NotRunning,
    /// The machine is stopped, possibly partway through this frame.
    Stopped,
}

/// Shareable stop request. The frame loop checks it after every cpu slice
/// and after interrupt delivery.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Machine {
    pub name: String,
    status: MachineStatus,
    clock: SliceClock,
    total_colors: u16,
    contexts: Vec<CpuContext>,
    #[derivative(Debug = "ignore")]
    cores: Vec<Box<dyn CpuCore>>,
    stores: StoreBank,
    registry: SharedWindowRegistry,
    state: MachineState,
    devices: DeviceBank,
    #[derivative(Debug = "ignore")]
    video: Option<Box<dyn VideoRefresh>>,
    roles: RoleMap,
    stop: StopHandle,
    pub frame_ready: bool,
}

impl Machine {
    pub fn status(&self) -> MachineStatus {
        self.status
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn frame_count(&self) -> u64 {
        self.clock.frame_count()
    }

    pub fn get_frame_progress(&self) -> f64 {
        self.clock.frame_progress()
    }

    pub fn is_frame_ready(&self) -> bool {
        self.frame_ready
    }

    pub fn roles(&self) -> Vec<CpuRole> {
        self.contexts.iter().map(|c| c.role).collect()
    }

    pub fn context(&self, role: CpuRole) -> Option<&CpuContext> {
        self.roles.get(role).and_then(|i| self.contexts.get(i))
    }

    pub fn pc(&self, role: CpuRole) -> Option<u16> {
        self.roles.get(role).and_then(|i| self.cores.get(i)).map(|c| c.pc())
    }

    pub fn cycles(&self, role: CpuRole) -> u64 {
        self.context(role).map(CpuContext::total_cycles).unwrap_or(0)
    }

    pub fn interrupt_pending(&self, role: CpuRole) -> bool {
        self.context(role).map(CpuContext::interrupt_pending).unwrap_or(false)
    }

    /// Power-on: resets every core and starts accepting frames.
    pub fn start(&mut self) {
        if self.status != MachineStatus::Idle {
            warn!("[Machine] {} cannot start while {}", self.name, self.status);
            return;
        }

        info!("[Machine] Starting {}", self.name);
        self.cores.iter_mut().for_each(|core| core.reset());
        self.clock.reset();
        self.status = MachineStatus::Running;
    }

    /// Stops the machine and releases its cpus, stores and devices. An
    /// unfinished frame is abandoned without a refresh.
    pub fn stop(&mut self) {
        if self.status == MachineStatus::Stopped {
            return;
        }

        info!(
            "[Machine] Stopping {} at frame {} slice {}",
            self.name,
            self.clock.frame_count(),
            self.clock.current_slice()
        );
        self.stop.request();
        self.status = MachineStatus::Stopped;
        self.frame_ready = false;
        self.cores.clear();
        self.contexts.clear();
        self.roles = RoleMap::default();
        self.stores.release();
        self.devices.release();
        self.video = None;
    }

    fn stop_requested(&mut self) -> bool {
        if self.stop.is_requested() {
            self.stop();
            return true;
        }
        false
    }

    pub fn run_frame(&mut self) -> FrameOutcome {
        match self.status {
            MachineStatus::Idle => {
                warn!("[Machine] run_frame on {} before start", self.name);
                return FrameOutcome::NotRunning;
            }
            MachineStatus::Stopped => return FrameOutcome::Stopped,
            MachineStatus::Running => {}
        }

        self.frame_ready = false;
        loop {
            for cpu in 0..self.contexts.len() {
                if self.stop_requested() {
                    return FrameOutcome::Stopped;
                }
                self.advance_slice(cpu);
            }
            if self.stop_requested() {
                return FrameOutcome::Stopped;
            }

            self.deliver_interrupts();
            if self.stop_requested() {
                return FrameOutcome::Stopped;
            }

            let events = self.clock.tick();
            if events.contains(&ClockEvent::FrameEnd) {
                break;
            }
        }

        self.end_of_frame();
        FrameOutcome::Completed
    }

    pub fn run_frames(&mut self, frames: usize) -> FrameOutcome {
        let mut outcome = FrameOutcome::NotRunning;
        for _ in 0..frames {
            outcome = self.run_frame();
            if outcome != FrameOutcome::Completed {
                break;
            }
        }
        outcome
    }

    fn advance_slice(&mut self, cpu: usize) {
        let share = self.clock.cycles_for(self.contexts[cpu].clock_hz);
        let budget = self.contexts[cpu].budget(share);
        if budget == 0 {
            return;
        }

        let mut bus = Bus::new(
            cpu,
            &mut self.contexts,
            &mut self.stores,
            &mut self.state,
            &mut self.devices,
            &self.roles,
        );
        let used = self.cores[cpu].execute_cycles(&mut bus, budget);
        self.contexts[cpu].account(budget, used);
    }

    fn deliver_interrupts(&mut self) {
        for cpu in 0..self.contexts.len() {
            // Admission is decided by the latch as it stood when delivery began.
            let nmi_enable = self.state.nmi_enable;
            let role = self.contexts[cpu].role;
            let gate = self.contexts[cpu].gate;

            if std::mem::take(&mut self.contexts[cpu].pending) {
                if gate.admits_strobe(nmi_enable) {
                    let kind = self.contexts[cpu].strobe;
                    self.interrupt(cpu, kind);
                } else {
                    debug!("[Machine] {} interrupt request dropped, NMI disabled", role);
                }
            }

            for index in 0..self.contexts[cpu].periodic.len() {
                let periodic = self.contexts[cpu].periodic[index];
                for _ in 0..self.clock.fires(periodic.rate) {
                    if gate.admits_periodic(nmi_enable) {
                        self.interrupt(cpu, periodic.kind);
                    } else {
                        trace!(
                            "[Machine] {} periodic {:?} dropped, NMI disabled",
                            role,
                            periodic.kind
                        );
                    }
                }
            }
        }
    }

    fn interrupt(&mut self, cpu: usize, kind: InterruptKind) {
        debug!("[Machine] {} <- {:?}", self.contexts[cpu].role, kind);
        let mut bus = Bus::new(
            cpu,
            &mut self.contexts,
            &mut self.stores,
            &mut self.state,
            &mut self.devices,
            &self.roles,
        );
        self.cores[cpu].deliver_interrupt(&mut bus, kind);
    }

    fn end_of_frame(&mut self) {
        if let Some(video) = self.video.as_mut() {
            let view = FrameView::new(
                self.clock.frame_count(),
                self.total_colors,
                &self.state,
                &self.stores,
                &self.registry,
            );
            video.refresh(&view);
        }
        self.state.tiles.clean();
        self.frame_ready = true;

        trace!(
            "[Machine] Frame {} completed, main cycles: {}",
            self.clock.frame_count(),
            self.contexts.first().map(CpuContext::total_cycles).unwrap_or(0)
        );
    }

    fn bus(&mut self, role: CpuRole) -> Option<Bus<'_>> {
        let cpu = self.roles.get(role)?;
        Some(Bus::new(
            cpu,
            &mut self.contexts,
            &mut self.stores,
            &mut self.state,
            &mut self.devices,
            &self.roles,
        ))
    }

    /// Reads through `role`'s memory map exactly as its program would.
    pub fn read(&mut self, role: CpuRole, address: u16) -> u8 {
        self.bus(role).map(|mut bus| bus.read_byte(address)).unwrap_or(OPEN_BUS)
    }

    pub fn write(&mut self, role: CpuRole, address: u16, value: u8) {
        if let Some(mut bus) = self.bus(role) {
            bus.write_byte(address, value);
        }
    }

    pub fn port_in(&mut self, role: CpuRole, port: u8) -> u8 {
        self.bus(role).map(|mut bus| bus.input(port)).unwrap_or(OPEN_BUS)
    }

    pub fn port_out(&mut self, role: CpuRole, port: u8, value: u8) {
        if let Some(mut bus) = self.bus(role) {
            bus.output(port, value);
        }
    }

    pub fn resolve(&self, role: CpuRole, table: TableKind, address: u16) -> Resolved {
        self.context(role)
            .map(|c| c.map.table(table).resolve(address))
            .unwrap_or(Resolved::UNMAPPED)
    }

    pub fn set_input(&mut self, port: usize, value: u8) {
        if port < INPUT_PORTS {
            self.state.input_ports[port] = value;
        }
    }

    pub fn store(&self, id: &str) -> Option<&[u8]> {
        let handle = self.registry.handle(id)?;
        self.stores.get(handle).map(|s| s.as_slice())
    }

    pub fn load_rom(&mut self, id: &str, data: &[u8]) -> Result<(), ConfigError> {
        let store = self
            .registry
            .handle(id)
            .and_then(|h| self.stores.get_mut(h))
            .ok_or_else(|| ConfigError::UnknownStore(id.to_string()))?;
        store.load(data);
        Ok(())
    }

    pub fn load_rom_file(&mut self, id: &str, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        self.load_rom(id, &data)?;
        Ok(())
    }

    pub fn shared_windows(&self) -> Vec<SharedWindow> {
        self.registry.shared_windows(&self.stores)
    }

    /// Hexdump of `start..=end` as `role` sees it. Reads go through the
    /// resolver, so latches with read side effects are not touched.
    pub fn memory_dump(&self, role: CpuRole, start: u16, end: u16) -> String {
        let Some(ctx) = self.context(role) else {
            return String::new();
        };

        let bytes: Vec<u8> = (start..=end)
            .map(|address| {
                let resolved = ctx.map.read.resolve(address);
                match resolved.target {
                    Target::Ram { store, .. } | Target::Rom { store, .. } => self
                        .stores
                        .get(store)
                        .map(|s| s.read(resolved.offset))
                        .unwrap_or(OPEN_BUS),
                    Target::Register(register) => register.read(&self.state).unwrap_or(OPEN_BUS),
                    Target::Device(_) | Target::Unmapped => OPEN_BUS,
                }
            })
            .collect();

        hexdump(&bytes, start)
    }
}

pub struct MachineBuilder {
    config: MachineConfig,
    cores: HashMap<CpuRole, Box<dyn CpuCore>>,
    devices: Vec<(String, Box<dyn Peripheral>)>,
    video: Option<Box<dyn VideoRefresh>>,
}

impl MachineBuilder {
    pub fn new(config: MachineConfig) -> Self {
        Self {
            config,
            cores: HashMap::new(),
            devices: Vec::new(),
            video: None,
        }
    }

    pub fn core(mut self, role: CpuRole, core: Box<dyn CpuCore>) -> Self {
        self.cores.insert(role, core);
        self
    }

    pub fn device(mut self, name: &str, device: Box<dyn Peripheral>) -> Self {
        self.devices.push((name.to_string(), device));
        self
    }

    pub fn video(mut self, video: Box<dyn VideoRefresh>) -> Self {
        self.video = Some(video);
        self
    }

    pub fn build(mut self) -> Result<Machine, ConfigError> {
        let config = &self.config;
        if config.frames_per_second == 0 || config.slices_per_frame == 0 {
            return Err(ConfigError::InvalidTiming {
                machine: config.name.clone(),
            });
        }

        let mut roles = RoleMap::default();
        for (index, cpu) in config.cpus.iter().enumerate() {
            if roles.insert(cpu.role, index).is_some() {
                return Err(ConfigError::DuplicateCpu(cpu.role));
            }
        }

        let mut stores = StoreBank::new();
        let mut registry = reserve_stores(config);
        let mut devices = DeviceBank::new();
        let mut tile_count = 0;

        let mut contexts = Vec::with_capacity(config.cpus.len());
        for cpu in &config.cpus {
            let mut ctx = CpuContext::new(cpu.role, cpu.clock_hz);
            ctx.strobe = cpu.strobe;
            ctx.gate = cpu.gate;
            ctx.periodic = cpu.periodic.clone();

            for (kind, range) in cpu.ranges() {
                let window = WindowRef {
                    cpu: cpu.role,
                    table: kind,
                    low: range.low,
                    high: range.high,
                };
                let built = build_range(
                    range.low,
                    range.high,
                    &range.target,
                    window,
                    &roles,
                    &mut stores,
                    &mut registry,
                    &mut devices,
                )?;
                if let Target::Ram { tiles: true, store, .. } = built.target {
                    let len = stores.get(store).map(|s| s.len()).unwrap_or(0);
                    tile_count = tile_count.max(len);
                }
                ctx.map.table_mut(kind).push(built);
            }
            contexts.push(ctx);
        }

        let mut cores = Vec::with_capacity(contexts.len());
        for cpu in &config.cpus {
            let core = self
                .cores
                .remove(&cpu.role)
                .ok_or(ConfigError::MissingCore(cpu.role))?;
            cores.push(core);
        }
        if let Some(role) = self.cores.keys().min() {
            return Err(ConfigError::UnknownCpu(*role));
        }

        for (name, device) in self.devices {
            devices.attach(&name, device)?;
        }
        for name in devices.detached() {
            debug!("[Machine] Device {} is not attached, reads float the bus", name);
        }

        info!(
            "[Machine] Built {} with {} cpus, {} stores, {} slices per frame",
            config.name,
            contexts.len(),
            stores.len(),
            config.slices_per_frame
        );

        Ok(Machine {
            name: config.name.clone(),
            status: MachineStatus::Idle,
            clock: SliceClock::new(config.frames_per_second, config.slices_per_frame),
            total_colors: config.total_colors,
            contexts,
            cores,
            stores,
            registry,
            state: MachineState::new(tile_count),
            devices,
            video: self.video,
            roles,
            stop: StopHandle::default(),
            frame_ready: false,
        })
    }
}

/// Sizes every store from all of its windows before any is created, so the
/// order in which cpus and tables declare a store does not matter.
fn reserve_stores(config: &MachineConfig) -> SharedWindowRegistry {
    let mut registry = SharedWindowRegistry::new();
    for cpu in &config.cpus {
        for (kind, range) in cpu.ranges() {
            if range.low > range.high {
                continue;
            }
            let len = (range.high - range.low) as usize + 1;
            let (id, base) = match &range.target {
                TargetConfig::Ram { store: Some(id), base, .. } => (id.clone(), *base),
                TargetConfig::Ram { store: None, base, .. } => {
                    let window = WindowRef {
                        cpu: cpu.role,
                        table: kind,
                        low: range.low,
                        high: range.high,
                    };
                    (SharedWindowRegistry::private_id(&window), *base)
                }
                TargetConfig::Rom { store, base } => (store.clone(), *base),
                _ => continue,
            };
            registry.reserve(&id, base as usize + len);
        }
    }
    registry
}

#[allow(clippy::too_many_arguments)]
fn build_range(
    low: u16,
    high: u16,
    target: &TargetConfig,
    window: WindowRef,
    roles: &RoleMap,
    stores: &mut StoreBank,
    registry: &mut SharedWindowRegistry,
    devices: &mut DeviceBank,
) -> Result<AddressRange, ConfigError> {
    if low > high {
        return Err(ConfigError::InvertedRange { window });
    }
    let space = window.table.space();
    if high > space.max_address() {
        return Err(ConfigError::OutsideAddressSpace {
            window,
            width: space.width(),
        });
    }

    let len = (high - low) as usize + 1;
    let target = match target {
        TargetConfig::Ram { store, base, tiles } => {
            let needed = *base as usize + len;
            let store = match store {
                Some(id) => registry.declare_shared(stores, id, needed, true, window)?,
                None => registry.declare_private(stores, needed, window)?,
            };
            Target::Ram {
                store,
                base: *base,
                tiles: *tiles,
            }
        }
        TargetConfig::Rom { store, base } => {
            let needed = *base as usize + len;
            Target::Rom {
                store: registry.declare_shared(stores, store, needed, false, window)?,
                base: *base,
            }
        }
        TargetConfig::Register { register } => {
            if let Some(role) = register.signals() {
                if !roles.contains(role) {
                    return Err(ConfigError::MissingSignalTarget {
                        window,
                        register: register.to_string(),
                        role,
                    });
                }
            }
            Target::Register(*register)
        }
        TargetConfig::Device { device } => Target::Device(devices.declare(device)),
        TargetConfig::Unmapped => Target::Unmapped,
    };

    Ok(AddressRange::new(low, high, target))
}
