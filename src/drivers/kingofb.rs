use crate::{
    clock::Rate,
    config::{CpuConfig, MachineConfig, RangeConfig},
    cpu::{CpuRole, InterruptGate, InterruptKind},
    registers::Register,
};

const Z80_CLOCK: u32 = 4_000_000;
const TOTAL_COLORS: u16 = 256 + 8;

// The three picture cpus take a frame NMI that the main cpu's latch at
// 0xF800 (0xD800 on Ring King) can mask. Their command strobes always land.
fn picture_cpu(role: CpuRole) -> CpuConfig {
    CpuConfig::new(role, Z80_CLOCK)
        .periodic(InterruptKind::Nmi, Rate::PerFrame(1))
        .gate(InterruptGate::Periodic)
}

fn inputs(base: u16) -> Vec<RangeConfig> {
    (0..6)
        .map(|port| {
            RangeConfig::register(base + port, base + port, Register::InputPort(port as u8))
        })
        .collect()
}

// Read and write tables share their storage windows; writes to ROM are dropped.
fn split(
    storage: &[RangeConfig],
    reads: Vec<RangeConfig>,
    writes: Vec<RangeConfig>,
) -> (Vec<RangeConfig>, Vec<RangeConfig>) {
    let mut read = storage.to_vec();
    read.extend(reads);
    let mut write = storage.to_vec();
    write.extend(writes);
    (read, write)
}

fn sound_cpu() -> CpuConfig {
    let storage = [
        RangeConfig::rom(0x0000, 0x3FFF, "sound_rom"),
        RangeConfig::ram(0xC000, 0xC3FF),
    ];
    let (read, write) = split(&storage, vec![], vec![RangeConfig::unmapped(0x8000, 0x8000)]);

    CpuConfig::new(CpuRole::Sound, Z80_CLOCK)
        .periodic(InterruptKind::Nmi, Rate::Hz(6000))
        .strobe(InterruptKind::Irq(0xFF))
        .read(read)
        .write(write)
        .port_read(vec![RangeConfig::device(0x08, 0x08, "ay8910")])
        .port_write(vec![
            RangeConfig::device(0x00, 0x00, "dac"),
            RangeConfig::device(0x08, 0x08, "ay8910"),
            RangeConfig::device(0x0C, 0x0C, "ay8910"),
        ])
}

/// King of Boxer: main, video, sprite and sound Z80s.
pub fn kingofb() -> MachineConfig {
    let main_storage = [
        RangeConfig::rom(0x0000, 0x7FFF, "main_rom"),
        RangeConfig::ram(0xC000, 0xC3FF),
        RangeConfig::shared(0xE000, 0xE7FF, "sprite_shared"),
        RangeConfig::shared(0xE800, 0xEFFF, "video_shared"),
        // Unidentified, the program reads back what it writes.
        RangeConfig::ram(0xF000, 0xF7FF),
    ];
    let (read, write) = split(
        &main_storage,
        inputs(0xFC00),
        vec![
            RangeConfig::register(0xF800, 0xF800, Register::NmiEnableAndPalette),
            RangeConfig::unmapped(0xF801, 0xF801),
            RangeConfig::register(0xF802, 0xF802, Register::ScrollY { strobe_sprite: false }),
            RangeConfig::register(0xF803, 0xF803, Register::ScrollY { strobe_sprite: true }),
            RangeConfig::register(0xF804, 0xF804, Register::VideoInterrupt),
            RangeConfig::register(0xF807, 0xF807, Register::SoundCommand),
        ],
    );
    let main = picture_cpu(CpuRole::Main).read(read).write(write);

    let video_storage = [
        RangeConfig::rom(0x0000, 0x3FFF, "video_rom"),
        RangeConfig::ram(0x8000, 0x87FF),
        RangeConfig::shared(0xA000, 0xA7FF, "video_shared"),
        RangeConfig::shared(0xC000, 0xC0FF, "videoram").tiles(),
        RangeConfig::shared(0xC400, 0xC4FF, "colorram").tiles(),
        RangeConfig::shared(0xC800, 0xCBFF, "videoram2"),
        RangeConfig::shared(0xCC00, 0xCFFF, "colorram2"),
    ];
    let (read, write) = split(&video_storage, vec![], vec![]);
    let video = picture_cpu(CpuRole::Video).read(read).write(write);

    let sprite_storage = [
        RangeConfig::rom(0x0000, 0x1FFF, "sprite_rom"),
        RangeConfig::ram(0x8000, 0x87FF),
        RangeConfig::shared(0xA000, 0xA7FF, "sprite_shared"),
        RangeConfig::shared(0xC000, 0xC3FF, "spriteram"),
        RangeConfig::ram(0xC400, 0xC43F),
    ];
    let (read, write) = split(&sprite_storage, vec![], vec![]);
    let sprite = picture_cpu(CpuRole::Sprite).read(read).write(write);

    MachineConfig::new("kingofb", 60, 100)
        .colors(TOTAL_COLORS)
        .cpu(main)
        .cpu(video)
        .cpu(sprite)
        .cpu(sound_cpu())
}

/// Ring King: the King of Boxer engine with a rearranged map. Scroll writes
/// do not touch the sprite cpu, which has its own strobe at 0xD801.
pub fn ringking() -> MachineConfig {
    let main_storage = [
        RangeConfig::rom(0x0000, 0xBFFF, "main_rom"),
        RangeConfig::ram(0xC000, 0xC3FF),
        RangeConfig::shared(0xC800, 0xCFFF, "sprite_shared"),
        RangeConfig::shared(0xD000, 0xD7FF, "video_shared"),
        RangeConfig::ram(0xF000, 0xF7FF),
    ];
    let (read, write) = split(
        &main_storage,
        inputs(0xE000),
        vec![
            RangeConfig::register(0xD800, 0xD800, Register::NmiEnableAndPalette),
            RangeConfig::register(0xD801, 0xD801, Register::SpriteInterrupt),
            RangeConfig::register(0xD802, 0xD802, Register::VideoInterrupt),
            RangeConfig::register(0xD803, 0xD803, Register::SoundCommand),
            RangeConfig::register(0xE800, 0xE800, Register::ScrollY { strobe_sprite: false }),
        ],
    );
    let main = picture_cpu(CpuRole::Main).read(read).write(write);

    let video_storage = [
        RangeConfig::rom(0x0000, 0x3FFF, "video_rom"),
        RangeConfig::ram(0x8000, 0x87FF),
        RangeConfig::shared(0xC000, 0xC7FF, "video_shared"),
        RangeConfig::shared(0xA800, 0xA8FF, "videoram").tiles(),
        RangeConfig::shared(0xAC00, 0xACFF, "colorram").tiles(),
        RangeConfig::shared(0xA000, 0xA3FF, "videoram2"),
        RangeConfig::shared(0xA400, 0xA7FF, "colorram2"),
    ];
    let (read, write) = split(&video_storage, vec![], vec![]);
    let video = picture_cpu(CpuRole::Video).read(read).write(write);

    let sprite_storage = [
        RangeConfig::rom(0x0000, 0x1FFF, "sprite_rom"),
        RangeConfig::ram(0x8000, 0x87FF),
        RangeConfig::shared(0xC800, 0xCFFF, "sprite_shared"),
        RangeConfig::shared(0xA000, 0xA3FF, "spriteram"),
        RangeConfig::ram(0xA400, 0xA43F),
    ];
    let (read, write) = split(&sprite_storage, vec![], vec![]);
    let sprite = picture_cpu(CpuRole::Sprite).read(read).write(write);

    MachineConfig::new("ringking", 60, 100)
        .colors(TOTAL_COLORS)
        .cpu(main)
        .cpu(video)
        .cpu(sprite)
        .cpu(sound_cpu())
}
