mod common;

use arcadebus::{
    drivers::{kingofb, ringking, thepit},
    CpuRole, InterruptKind, Machine, MachineConfig, TableKind, OPEN_BUS,
};
use common::{idle_builder, interrupts, new_log, LatchChip, Log};

#[cfg(test)]
#[ctor::ctor]
fn init() {
    arcadebus::init_tracing("warn").expect("Unable to set global tracing subscriber");
}

fn idle_machine(config: MachineConfig, log: &Log) -> Machine {
    idle_builder(config, log).build().unwrap()
}

#[test]
fn test_kingofb_shared_windows() {
    let log = new_log();
    let mut machine = idle_machine(kingofb(), &log);

    machine.write(CpuRole::Main, 0xE810, 0x42);
    assert_eq!(machine.read(CpuRole::Video, 0xA010), 0x42);

    machine.write(CpuRole::Sprite, 0xA7FF, 0x07);
    assert_eq!(machine.read(CpuRole::Main, 0xE7FF), 0x07);

    let shared = machine.shared_windows();
    let names: Vec<&str> = shared.iter().map(|s| s.store.as_str()).collect();
    assert_eq!(names, vec!["sprite_shared", "video_shared"]);
    assert_eq!(shared[0].windows.len(), 4);
}

#[test]
fn test_kingofb_strobes() {
    let log = new_log();
    let mut machine = idle_machine(kingofb(), &log);

    machine.write(CpuRole::Main, 0xF802, 0x10);
    assert_eq!(machine.state().scroll_y, 0x10);
    assert!(!machine.interrupt_pending(CpuRole::Sprite));

    machine.write(CpuRole::Main, 0xF803, 0x11);
    assert_eq!(machine.state().scroll_y, 0x11);
    assert!(machine.interrupt_pending(CpuRole::Sprite));

    machine.write(CpuRole::Main, 0xF804, 0x01);
    assert!(machine.interrupt_pending(CpuRole::Video));

    machine.write(CpuRole::Main, 0xF807, 0x33);
    assert_eq!(machine.state().sound_latch, 0x33);
    assert!(machine.interrupt_pending(CpuRole::Sound));

    machine.start();
    machine.run_frame();

    // NMI is still disabled: strobes land, frame interrupts do not.
    assert!(interrupts(&log, CpuRole::Main).is_empty());
    assert_eq!(interrupts(&log, CpuRole::Video), vec![InterruptKind::Irq(0xFF)]);
    assert_eq!(interrupts(&log, CpuRole::Sprite), vec![InterruptKind::Irq(0xFF)]);

    let sound = interrupts(&log, CpuRole::Sound);
    assert_eq!(sound[0], InterruptKind::Irq(0xFF));
    assert_eq!(sound.len(), 1 + 100);
    assert!(sound[1..].iter().all(|k| *k == InterruptKind::Nmi));
}

#[test]
fn test_kingofb_frame_nmi_follows_latch() {
    let log = new_log();
    let mut machine = idle_machine(kingofb(), &log);

    machine.start();
    machine.write(CpuRole::Main, 0xF800, 0x20);
    machine.run_frames(2);

    for role in [CpuRole::Main, CpuRole::Video, CpuRole::Sprite] {
        assert_eq!(interrupts(&log, role), vec![InterruptKind::Nmi; 2], "{role}");
    }
}

#[test]
fn test_kingofb_palette_and_tiles() {
    let log = new_log();
    let mut machine = idle_machine(kingofb(), &log);
    machine.start();
    machine.run_frame();

    assert_eq!(machine.state().tiles.len(), 0x100);
    assert_eq!(machine.state().tiles.dirty_count(), 0);

    machine.write(CpuRole::Video, 0xC010, 0x01);
    machine.write(CpuRole::Video, 0xC410, 0x02);
    machine.write(CpuRole::Video, 0xC810, 0x03);
    assert!(machine.state().tiles.is_dirty(0x10));
    assert_eq!(machine.state().tiles.dirty_count(), 1);

    machine.write(CpuRole::Main, 0xF800, 0x08);
    machine.write(CpuRole::Main, 0xF800, 0x08);
    assert_eq!(machine.state().palette_bank, 1);
    assert_eq!(machine.state().tiles.invalidations(), 1);
    assert!(machine.state().tiles.full_redraw());
}

#[test]
fn test_kingofb_inputs_and_rom() {
    let log = new_log();
    let mut machine = idle_machine(kingofb(), &log);

    machine.set_input(2, 0x7F);
    assert_eq!(machine.read(CpuRole::Main, 0xFC02), 0x7F);
    assert_eq!(machine.read(CpuRole::Main, 0xFC03), 0xFF);
    assert_eq!(machine.read(CpuRole::Main, 0xF804), OPEN_BUS);

    machine.load_rom("main_rom", &[0x01, 0x02, 0x03]).unwrap();
    machine.write(CpuRole::Main, 0x0001, 0x99);
    assert_eq!(machine.read(CpuRole::Main, 0x0001), 0x02);

    let resolved = machine.resolve(CpuRole::Main, TableKind::Write, 0xF801);
    assert_eq!(resolved.kind(), arcadebus::RangeKind::Unmapped);
    assert!(resolved.index.is_some());
}

#[test]
fn test_ringking_map() {
    let log = new_log();
    let mut machine = idle_machine(ringking(), &log);

    machine.write(CpuRole::Main, 0xE800, 0x20);
    assert_eq!(machine.state().scroll_y, 0x20);
    assert!(!machine.interrupt_pending(CpuRole::Sprite));

    machine.write(CpuRole::Main, 0xD801, 0x00);
    assert!(machine.interrupt_pending(CpuRole::Sprite));

    machine.write(CpuRole::Main, 0xD010, 0x5A);
    assert_eq!(machine.read(CpuRole::Video, 0xC010), 0x5A);
    machine.write(CpuRole::Main, 0xC810, 0xA5);
    assert_eq!(machine.read(CpuRole::Sprite, 0xC810), 0xA5);
}

#[test]
fn test_thepit_sound_latch() {
    let log = new_log();
    let mut machine = idle_machine(thepit(), &log);

    machine.write(CpuRole::Main, 0xB800, 0x5A);
    assert_eq!(machine.port_in(CpuRole::Sound, 0x00), 0x5A);
    assert!(!machine.interrupt_pending(CpuRole::Sound));

    machine.port_out(CpuRole::Sound, 0x00, 0x77);
    assert_eq!(machine.state().sound_latch, 0x00);
    assert_eq!(machine.port_in(CpuRole::Sound, 0x00), 0x00);
}

#[test]
fn test_thepit_mirrors_and_latches() {
    let log = new_log();
    let mut machine = idle_machine(thepit(), &log);

    machine.write(CpuRole::Main, 0x9410, 0xAB);
    assert_eq!(machine.read(CpuRole::Main, 0x9010), 0xAB);
    machine.write(CpuRole::Main, 0x8800, 0xCD);
    assert_eq!(machine.read(CpuRole::Main, 0x8C00), 0xCD);
    assert_eq!(machine.store("videoram").unwrap()[0x10], 0xAB);

    machine.write(CpuRole::Main, 0xB003, 0x01);
    machine.write(CpuRole::Main, 0xB006, 0x01);
    machine.write(CpuRole::Main, 0xB007, 0x00);
    assert!(machine.state().sound_enable);
    assert!(machine.state().flip_x);
    assert!(!machine.state().flip_y);
}

#[test]
fn test_thepit_interrupts() {
    let log = new_log();
    let mut machine = idle_machine(thepit(), &log);

    machine.start();
    machine.run_frame();
    assert!(interrupts(&log, CpuRole::Main).is_empty());
    assert_eq!(interrupts(&log, CpuRole::Sound), vec![InterruptKind::Irq(0xFF)]);

    machine.write(CpuRole::Main, 0xB000, 0x01);
    machine.run_frame();
    assert_eq!(interrupts(&log, CpuRole::Main), vec![InterruptKind::Nmi]);
    assert_eq!(interrupts(&log, CpuRole::Sound).len(), 2);
}

#[test]
fn test_thepit_sound_chips() {
    let log = new_log();
    let chip = LatchChip::default();
    let writes = chip.writes.clone();

    let mut machine = idle_builder(thepit(), &log)
        .device("ay8910.0", Box::new(chip))
        .build()
        .unwrap();

    machine.write(CpuRole::Main, 0xB800, 0x3C);
    assert_eq!(machine.port_in(CpuRole::Sound, 0x8F), 0x3C);

    machine.port_out(CpuRole::Sound, 0x8E, 0x07);
    machine.port_out(CpuRole::Sound, 0x8C, 0x01);
    assert_eq!(*writes.borrow(), vec![(0x8E, 0x07)]);

    // Only the low byte of a port number is decoded.
    let resolved = machine.resolve(CpuRole::Sound, TableKind::PortWrite, 0x128F);
    assert_eq!(resolved.index, Some(2));
}

#[test]
fn test_driver_configs_survive_json() {
    let log = new_log();
    for config in [kingofb(), ringking(), thepit()] {
        let json = config.to_json().unwrap();
        let parsed = MachineConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);

        let machine = idle_machine(parsed, &log);
        assert_eq!(machine.name, config.name);
    }
}

#[test]
fn test_config_file_loading() {
    let dir = std::env::temp_dir().join(format!("arcadebus-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("thepit.json");
    std::fs::write(&path, thepit().to_json().unwrap()).unwrap();

    let config = MachineConfig::load(&path).unwrap();
    assert_eq!(config, thepit());

    std::fs::write(&path, "{").unwrap();
    let err = MachineConfig::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("thepit.json"), "{err:#}");

    let rom = dir.join("sound.bin");
    std::fs::write(&rom, [0xC3, 0x00, 0x00]).unwrap();
    let log = new_log();
    let mut machine = idle_machine(thepit(), &log);
    machine.load_rom_file("sound_rom", &rom).unwrap();
    assert_eq!(machine.read(CpuRole::Sound, 0x0000), 0xC3);

    std::fs::remove_dir_all(&dir).unwrap();
}
