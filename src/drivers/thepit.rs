use crate::{
    clock::Rate,
    config::{CpuConfig, MachineConfig, RangeConfig},
    cpu::{CpuRole, InterruptGate, InterruptKind},
    registers::Register,
};

const MAIN_CLOCK: u32 = 18_432_000 / 6;
const SOUND_CLOCK: u32 = 10_000_000 / 4;

/// The Pit: main Z80 with mirrored tile RAM and a sound Z80 fed through a
/// latch it clears itself.
pub fn thepit() -> MachineConfig {
    let storage = [
        RangeConfig::rom(0x0000, 0x4FFF, "main_rom"),
        RangeConfig::ram(0x8000, 0x87FF),
        RangeConfig::shared(0x8800, 0x8BFF, "colorram").tiles(),
        RangeConfig::shared(0x8C00, 0x8FFF, "colorram").tiles(),
        RangeConfig::shared(0x9000, 0x93FF, "videoram").tiles(),
        RangeConfig::shared(0x9400, 0x97FF, "videoram").tiles(),
        RangeConfig::shared(0x9800, 0x983F, "attributes"),
        RangeConfig::shared(0x9840, 0x985F, "spriteram"),
        // Probably unused
        RangeConfig::ram(0x9860, 0x98FF),
    ];

    let mut read = storage.to_vec();
    read.extend([
        RangeConfig::register(0xA000, 0xA000, Register::InputPort(0)),
        RangeConfig::register(0xA800, 0xA800, Register::InputPort(1)),
        RangeConfig::register(0xB000, 0xB000, Register::InputPort(2)),
        // Watchdog
        RangeConfig::unmapped(0xB800, 0xB800),
    ]);

    let mut write = storage.to_vec();
    write.extend([
        RangeConfig::unmapped(0xA000, 0xA000),
        RangeConfig::register(0xB000, 0xB000, Register::InterruptEnable),
        RangeConfig::unmapped(0xB001, 0xB002),
        RangeConfig::register(0xB003, 0xB003, Register::SoundEnable),
        RangeConfig::unmapped(0xB004, 0xB005),
        RangeConfig::register(0xB006, 0xB006, Register::FlipX),
        RangeConfig::register(0xB007, 0xB007, Register::FlipY),
        RangeConfig::register(0xB800, 0xB800, Register::SoundLatch),
    ]);

    let main = CpuConfig::new(CpuRole::Main, MAIN_CLOCK)
        .periodic(InterruptKind::Nmi, Rate::PerFrame(1))
        .gate(InterruptGate::Periodic)
        .read(read)
        .write(write);

    let sound_storage = [
        RangeConfig::rom(0x0000, 0x0FFF, "sound_rom"),
        RangeConfig::ram(0x3800, 0x3BFF),
    ];
    let sound = CpuConfig::new(CpuRole::Sound, SOUND_CLOCK)
        .periodic(InterruptKind::Irq(0xFF), Rate::PerFrame(1))
        .read(sound_storage.to_vec())
        .write(sound_storage.to_vec())
        .port_read(vec![
            RangeConfig::register(0x00, 0x00, Register::SoundLatch),
            RangeConfig::device(0x8F, 0x8F, "ay8910.0"),
        ])
        .port_write(vec![
            RangeConfig::register(0x00, 0x00, Register::SoundLatchClear),
            RangeConfig::device(0x8C, 0x8D, "ay8910.1"),
            RangeConfig::device(0x8E, 0x8F, "ay8910.0"),
        ]);

    MachineConfig::new("thepit", 60, 1)
        .colors(32)
        .cpu(main)
        .cpu(sound)
}
