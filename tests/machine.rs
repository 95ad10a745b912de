mod common;

use common::{ToyCpu, ECHO_PROGRAM};
use kabputer::config::MachineConfig;
use kabputer::loader::MemoryImage;
use kabputer::ports::KeyLatch;
use kabputer::scheduler::{ExecutionScheduler, Machine, RunState, SchedulerEvent};
use kabputer::terminal::{lock_terminal, TerminalEngine};
use std::fs;
use std::thread;
use std::time::{Duration, Instant};

fn echo_machine() -> Machine<ToyCpu> {
    let mut m = Machine::new(ToyCpu::new(), &MachineConfig::default()).unwrap();
    let image = MemoryImage::from_hex_dump(ECHO_PROGRAM).unwrap();
    m.load_image(&image, "echo.txt");
    m
}

fn screen_row(m: &Machine<ToyCpu>, y: usize) -> Vec<u8> {
    lock_terminal(&m.terminal()).row(y).to_vec()
}

#[test]
fn test_program_writes_reach_terminal() {
    let mut m = echo_machine();
    m.power_on();
    assert_eq!(m.registers().pc, 0x0300);
    for _ in 0..5 {
        assert!(m.tick());
    }
    assert_eq!(m.registers().pc, 0x030a);
    assert_eq!(screen_row(&m, 0)[..3], *b"HI\0");
}

#[test]
fn test_key_interrupt_echoes() {
    let mut m = echo_machine();
    m.power_on();
    for _ in 0..6 {
        m.tick();
    }
    m.set_key_waiting(b'!');
    assert_eq!(m.cpu().interrupts, 1);
    assert_eq!(m.registers().pc, 0x0400);
    // LDA $8001, STA $8000, RTI
    for _ in 0..3 {
        m.tick();
    }
    assert_eq!(screen_row(&m, 0)[..3], *b"HI!");
    assert_eq!(m.registers().pc, 0x030a);
    assert!(!m.registers().interrupts_disabled());
    // the handler's read acknowledged the key
    assert_eq!(m.peek(0x8001), 0);
}

#[test]
fn test_masked_cpu_ignores_key() {
    let mut m = echo_machine();
    m.poke(0x0300, 0x78); // SEI
    m.power_on();
    m.tick();
    m.set_key_waiting(b'x');
    assert_eq!(m.cpu().interrupts, 0);
    assert_eq!(m.peek(0x8001), b'x');
}

#[test]
fn test_loader_skips_io_page() {
    let config = MachineConfig::default();
    let terminal = TerminalEngine::new(config.text_cols, config.text_rows).shared();
    let latch = KeyLatch::new();
    let mut bus = config.build_bus(terminal.clone(), latch.clone()).unwrap();
    latch.press(b'k');

    // origin 0x7ffe, four bytes: two land in RAM, two would hit the ports
    let image = MemoryImage::from_relocating(&[0xfe, 0x7f, 1, 2, b'X', b'Y']).unwrap();
    image.write_to(&mut bus, &config.io_window);

    assert_eq!(bus.read_byte(0x7ffe), 1);
    assert_eq!(bus.read_byte(0x7fff), 2);
    assert!(lock_terminal(&terminal).video().iter().all(|&g| g == 0));
    // nothing read the keyboard either
    assert!(latch.is_waiting());
}

#[test]
fn test_relocating_round_trip_on_standard_map() {
    let mut m = Machine::new(ToyCpu::new(), &MachineConfig::default()).unwrap();
    let body: Vec<u8> = (0..=255).collect();
    let mut data = vec![0x00, 0x03];
    data.extend(&body);
    m.load_image(&MemoryImage::from_relocating(&data).unwrap(), "ramp.sbin");
    let read: Vec<u8> = (0..body.len() as u16).map(|i| m.peek(0x0300 + i)).collect();
    assert_eq!(read, body);
}

fn wait_until(
    s: &ExecutionScheduler<ToyCpu>,
    what: &str,
    cond: impl Fn(&ExecutionScheduler<ToyCpu>) -> bool,
) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond(s) {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_scheduler_halts_at_breakpoint() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("echo.txt");
    fs::write(&path, ECHO_PROGRAM).unwrap();

    let config = MachineConfig::default();
    let machine = Machine::new(ToyCpu::new(), &config).unwrap();
    let mut s = ExecutionScheduler::new(machine, Duration::from_micros(20));
    s.load_file(&path).unwrap();
    assert_eq!(s.state(), RunState::Stopped);

    // the second STA
    s.add_breakpoint(0x0307, 0);
    s.start();
    wait_until(&s, "breakpoint", |s| s.state() == RunState::SinglePaused);
    assert_eq!(s.drain_events(), vec![SchedulerEvent::BreakpointHit(0x0307)]);
    assert_eq!(s.registers().pc, 0x030a);
    assert_eq!(lock_terminal(&s.terminal()).row(0)[..2], *b"HI");

    let steps = s.status().steps;
    s.advance_one_step();
    wait_until(&s, "one step", |s| s.status().steps == steps + 1);
    assert_eq!(s.state(), RunState::SinglePaused);

    s.disable_single_step();
    s.set_key_waiting(b'?');
    wait_until(&s, "echo", |s| lock_terminal(&s.terminal()).glyph_at(2, 0) == b'?');

    s.terminate();
    assert_eq!(s.state(), RunState::Stopped);
}

#[test]
fn test_bad_file_leaves_scheduler_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.txt");
    fs::write(&path, "0300: ZZ\n").unwrap();

    let machine = echo_machine();
    let mut s = ExecutionScheduler::new(machine, Duration::from_micros(20));
    s.start();
    assert!(s.load_file(&path).is_err());
    assert_eq!(s.state(), RunState::Stopped);
    assert!(!s.is_started());
    // earlier program still in place
    assert_eq!(s.machine().peek(0x0300), 0xa9);
}
