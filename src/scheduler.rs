//! # scheduler
//!
//! `Machine` is the whole computer behind one lock: CPU, bus, key latch,
//! terminal and breakpoints. `tick()` is one unit of progress:
//!
//!  1. nothing if powered off or paused waiting for a single step
//!  2. count an arrival at the current PC against the breakpoints; a hit
//!     is reported and turns single-step on
//!  3. execute exactly one instruction
//!  4. in single-step mode, pause until `advance_one_step()`
//!
//! A cooperative front end can call `tick()` itself. `ExecutionScheduler`
//! instead runs it from a worker thread paced by `spin_sleep`, taking the
//! lock once per tick so outside readers never see half a step.
use crate::breakpoint::BreakpointSet;
use crate::config::MachineConfig;
use crate::cpu::{Cpu, Registers};
use crate::error::{ConfigError, LoadError};
use crate::loader::MemoryImage;
use crate::memory::AddressBus;
use crate::ports::KeyLatch;
use crate::terminal::{lock_terminal, SharedTerminal, TerminalEngine};
use log::{debug, error, info};
use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
    SinglePaused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// a breakpoint fired with the PC at this address
    BreakpointHit(u16),
}

/// what a status bar wants to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub state: RunState,
    pub single_step: bool,
    pub steps: u64,
    pub image_name: Option<String>,
}

pub struct Machine<C: Cpu> {
    cpu: C,
    bus: AddressBus,
    latch: Arc<KeyLatch>,
    terminal: SharedTerminal,
    breakpoints: BreakpointSet,
    io_window: RangeInclusive<u16>,
    running: bool,
    single_step: bool,
    step_wait: bool,
    steps: u64,
    image_name: Option<String>,
    events: Vec<SchedulerEvent>,
}

impl<C: Cpu> Machine<C> {
    /// build the standard machine described by `config`
    pub fn new(cpu: C, config: &MachineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let terminal = TerminalEngine::new(config.text_cols, config.text_rows).shared();
        let latch = KeyLatch::new();
        let bus = config.build_bus(terminal.clone(), latch.clone())?;
        Ok(Machine::with_bus(
            cpu,
            bus,
            latch,
            terminal,
            config.io_window.clone(),
        ))
    }

    /// assemble a machine around an already wired bus; `latch` and
    /// `terminal` must be the ones its ports were built with
    pub fn with_bus(
        cpu: C,
        bus: AddressBus,
        latch: Arc<KeyLatch>,
        terminal: SharedTerminal,
        io_window: RangeInclusive<u16>,
    ) -> Self {
        Machine {
            cpu,
            bus,
            latch,
            terminal,
            breakpoints: BreakpointSet::new(),
            io_window,
            running: false,
            single_step: false,
            step_wait: false,
            steps: 0,
            image_name: None,
            events: Vec::new(),
        }
    }

    pub fn terminal(&self) -> SharedTerminal {
        Arc::clone(&self.terminal)
    }

    pub fn state(&self) -> RunState {
        match (self.running, self.step_wait) {
            (false, _) => RunState::Stopped,
            (true, true) => RunState::SinglePaused,
            (true, false) => RunState::Running,
        }
    }

    pub fn status(&self) -> Status {
        Status {
            state: self.state(),
            single_step: self.single_step,
            steps: self.steps,
            image_name: self.image_name.clone(),
        }
    }

    pub fn registers(&self) -> Registers {
        self.cpu.registers()
    }

    pub fn cpu(&self) -> &C {
        &self.cpu
    }

    /// reset the CPU and run freely; nothing if already on
    pub fn power_on(&mut self) {
        if self.running {
            return;
        }
        self.cpu.reset(&mut self.bus);
        self.single_step = false;
        self.step_wait = false;
        self.steps = 0;
        self.running = true;
        info!("powered on, pc={:#06x}", self.cpu.registers().pc);
    }

    /// power on, paused before the first instruction
    pub fn power_on_stepping(&mut self) {
        if self.running {
            return;
        }
        self.power_on();
        self.enable_single_step();
    }

    pub fn power_off(&mut self) {
        if self.running {
            info!("powered off after {} steps", self.steps);
        }
        self.running = false;
    }

    /// pause now; from here on each advance runs a single instruction
    pub fn enable_single_step(&mut self) {
        self.single_step = true;
        self.step_wait = true;
    }

    pub fn disable_single_step(&mut self) {
        self.single_step = false;
        self.step_wait = false;
    }

    /// let the next tick through; only meaningful in single-step mode
    pub fn advance_one_step(&mut self) {
        if self.single_step {
            self.step_wait = false;
        }
    }

    /// run one tick; true if an instruction was executed
    pub fn tick(&mut self) -> bool {
        if !self.running || self.step_wait {
            return false;
        }
        let pc = self.cpu.registers().pc;
        if self.breakpoints.check_and_consume(pc) {
            debug!("breakpoint hit at {:#06x}", pc);
            self.events.push(SchedulerEvent::BreakpointHit(pc));
            self.single_step = true;
        }
        self.cpu.step(&mut self.bus);
        self.steps += 1;
        if self.single_step {
            self.step_wait = true;
        }
        true
    }

    /// hand `key` to the keyboard port and interrupt the CPU unless it
    /// has interrupts masked
    pub fn set_key_waiting(&mut self, key: u8) {
        self.latch.press(key);
        if !self.cpu.registers().interrupts_disabled() {
            self.cpu.interrupt(&mut self.bus);
        }
    }

    pub fn breakpoints(&self) -> &BreakpointSet {
        &self.breakpoints
    }

    pub fn breakpoints_mut(&mut self) -> &mut BreakpointSet {
        &mut self.breakpoints
    }

    /// everything reported since the last call
    pub fn drain_events(&mut self) -> Vec<SchedulerEvent> {
        std::mem::take(&mut self.events)
    }

    /// read memory for a debugger; reading the keyboard port still
    /// consumes the waiting key
    pub fn peek(&mut self, addr: u16) -> u8 {
        self.bus.read_byte(addr)
    }

    pub fn poke(&mut self, addr: u16, data: u8) {
        self.bus.write_byte(addr, data);
    }

    /// power off, then replace memory with `image`; the machine is left
    /// stopped with a clean terminal, ready to power on
    pub fn load_image(&mut self, image: &MemoryImage, name: &str) {
        self.power_off();
        image.write_to(&mut self.bus, &self.io_window);
        self.cpu.reset(&mut self.bus);
        self.disable_single_step();
        lock_terminal(&self.terminal).reset();
        self.image_name = Some(name.to_string());
        info!("loaded image {}", name);
    }

    /// as `load_image`, reading the file first; on error memory is
    /// untouched and the machine stays stopped
    pub fn load_file(&mut self, path: &Path) -> Result<(), LoadError> {
        self.power_off();
        let image = MemoryImage::from_file(path)?;
        self.load_image(&image, &path.display().to_string());
        Ok(())
    }
}

fn lock_machine<C: Cpu>(machine: &Mutex<Machine<C>>) -> MutexGuard<'_, Machine<C>> {
    machine.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Worker {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Drives a `Machine` from a worker thread ticking every `interval`.
pub struct ExecutionScheduler<C: Cpu + 'static> {
    machine: Arc<Mutex<Machine<C>>>,
    interval: Duration,
    worker: Option<Worker>,
}

impl<C: Cpu + 'static> ExecutionScheduler<C> {
    pub fn new(machine: Machine<C>, interval: Duration) -> Self {
        ExecutionScheduler {
            machine: Arc::new(Mutex::new(machine)),
            interval,
            worker: None,
        }
    }

    /// exclusive access to the machine, between ticks
    pub fn machine(&self) -> MutexGuard<'_, Machine<C>> {
        lock_machine(&self.machine)
    }

    /// reset the CPU and start ticking; nothing if already started
    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }
        self.machine().power_on();
        self.spawn();
    }

    /// as `start`, but paused before the first instruction
    pub fn start_stepping(&mut self) {
        if self.worker.is_some() {
            return;
        }
        self.machine().power_on_stepping();
        self.spawn();
    }

    fn spawn(&mut self) {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let machine = Arc::clone(&self.machine);
        let interval = self.interval;
        let spawned = thread::Builder::new()
            .name("kabputer-cpu".into())
            .spawn(move || {
                while !flag.load(Ordering::Acquire) {
                    lock_machine(&machine).tick();
                    spin_sleep::sleep(interval);
                }
            });
        match spawned {
            Ok(handle) => self.worker = Some(Worker { cancel, handle }),
            Err(e) => {
                error!("unable to start stepping thread: {}", e);
                self.machine().power_off();
            }
        }
    }

    /// stop ticking; once this returns no further step will run
    pub fn terminate(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.cancel.store(true, Ordering::Release);
            if worker.handle.join().is_err() {
                error!("stepping thread panicked");
            }
        }
        self.machine().power_off();
    }

    pub fn is_started(&self) -> bool {
        self.worker.is_some()
    }

    pub fn state(&self) -> RunState {
        self.machine().state()
    }

    pub fn status(&self) -> Status {
        self.machine().status()
    }

    pub fn registers(&self) -> Registers {
        self.machine().registers()
    }

    pub fn enable_single_step(&self) {
        self.machine().enable_single_step();
    }

    pub fn disable_single_step(&self) {
        self.machine().disable_single_step();
    }

    pub fn advance_one_step(&self) {
        self.machine().advance_one_step();
    }

    pub fn set_key_waiting(&self, key: u8) {
        self.machine().set_key_waiting(key);
    }

    pub fn add_breakpoint(&self, address: u16, trigger_every: u32) {
        self.machine().breakpoints_mut().add(address, trigger_every);
    }

    pub fn remove_breakpoint(&self, address: u16) {
        self.machine().breakpoints_mut().remove(address);
    }

    pub fn drain_events(&self) -> Vec<SchedulerEvent> {
        self.machine().drain_events()
    }

    pub fn terminal(&self) -> SharedTerminal {
        self.machine().terminal()
    }

    /// stop, then load an image from disk
    pub fn load_file(&mut self, path: &Path) -> Result<(), LoadError> {
        self.terminate();
        self.machine().load_file(path)
    }
}

impl<C: Cpu + 'static> Drop for ExecutionScheduler<C> {
    fn drop(&mut self) {
        self.terminate();
    }
}
