#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use arcadebus::{
    CpuCore, CpuIo, CpuRole, FrameView, InterruptKind, MachineConfig, MachineState, Peripheral,
    VideoRefresh,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Reset(CpuRole),
    Slice(CpuRole, u32),
    Interrupt(CpuRole, InterruptKind),
    Refresh { frame: u64, full_redraw: bool },
}

pub type Log = Rc<RefCell<Vec<Event>>>;

/// Called once per slice with the bus and the slice's call number.
pub type Program = Box<dyn FnMut(&mut dyn CpuIo, u64)>;

pub fn program(f: impl FnMut(&mut dyn CpuIo, u64) + 'static) -> Program {
    Box::new(f)
}

/// Called after the core logs a delivered interrupt.
pub type InterruptHook = Box<dyn FnMut(InterruptKind)>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Stand-in cpu that runs a closure instead of instructions.
pub struct ScriptedCore {
    role: CpuRole,
    log: Log,
    program: Program,
    calls: u64,
    overshoot: u32,
    pc: u16,
    on_interrupt: Option<InterruptHook>,
}

impl ScriptedCore {
    pub fn new(role: CpuRole, log: &Log, program: Program) -> Self {
        Self {
            role,
            log: log.clone(),
            program,
            calls: 0,
            overshoot: 0,
            pc: 0,
            on_interrupt: None,
        }
    }

    pub fn idle(role: CpuRole, log: &Log) -> Box<dyn CpuCore> {
        Box::new(Self::new(role, log, program(|_, _| {})))
    }

    pub fn with_overshoot(mut self, overshoot: u32) -> Self {
        self.overshoot = overshoot;
        self
    }

    pub fn on_interrupt(mut self, hook: impl FnMut(InterruptKind) + 'static) -> Self {
        self.on_interrupt = Some(Box::new(hook));
        self
    }
}

impl CpuCore for ScriptedCore {
    fn reset(&mut self) {
        self.calls = 0;
        self.pc = 0;
        self.log.borrow_mut().push(Event::Reset(self.role));
    }

    fn execute_cycles(&mut self, io: &mut dyn CpuIo, cycles: u32) -> u32 {
        self.log.borrow_mut().push(Event::Slice(self.role, cycles));
        (self.program)(io, self.calls);
        self.calls += 1;
        self.pc = self.pc.wrapping_add(1);
        cycles + self.overshoot
    }

    fn deliver_interrupt(&mut self, _io: &mut dyn CpuIo, kind: InterruptKind) {
        self.log.borrow_mut().push(Event::Interrupt(self.role, kind));
        if let Some(hook) = self.on_interrupt.as_mut() {
            hook(kind);
        }
    }

    fn pc(&self) -> u16 {
        self.pc
    }
}

pub struct RecordingVideo {
    log: Log,
}

impl RecordingVideo {
    pub fn new(log: &Log) -> Box<dyn VideoRefresh> {
        Box::new(Self { log: log.clone() })
    }
}

impl VideoRefresh for RecordingVideo {
    fn refresh(&mut self, frame: &FrameView<'_>) {
        self.log.borrow_mut().push(Event::Refresh {
            frame: frame.frame,
            full_redraw: frame.full_redraw,
        });
    }
}

/// Sound chip stand-in: reads return the command latch, writes are recorded.
#[derive(Default)]
pub struct LatchChip {
    pub writes: Rc<RefCell<Vec<(u16, u8)>>>,
}

impl Peripheral for LatchChip {
    fn read(&mut self, _port: u16, state: &MachineState) -> u8 {
        state.sound_latch
    }

    fn write(&mut self, port: u16, value: u8) {
        self.writes.borrow_mut().push((port, value));
    }
}

pub fn slices(log: &Log, role: CpuRole) -> Vec<u32> {
    log.borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Slice(r, cycles) if *r == role => Some(*cycles),
            _ => None,
        })
        .collect()
}

pub fn interrupts(log: &Log, role: CpuRole) -> Vec<InterruptKind> {
    log.borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Interrupt(r, kind) if *r == role => Some(*kind),
            _ => None,
        })
        .collect()
}

pub fn refreshes(log: &Log) -> Vec<(u64, bool)> {
    log.borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Refresh { frame, full_redraw } => Some((*frame, *full_redraw)),
            _ => None,
        })
        .collect()
}

pub fn idle_builder(config: MachineConfig, log: &Log) -> arcadebus::MachineBuilder {
    let roles: Vec<CpuRole> = config.cpus.iter().map(|c| c.role).collect();
    roles
        .into_iter()
        .fold(arcadebus::MachineBuilder::new(config), |builder, role| {
            builder.core(role, ScriptedCore::idle(role, log))
        })
}
