use tracing_subscriber::{fmt, EnvFilter};

/// Formats `bytes` sixteen to a line, labelling the first byte `origin`.
pub fn hexdump(bytes: &[u8], origin: u16) -> String {
    let mut str = String::new();
    let mut addr = origin;
    for chunk in bytes.chunks(16) {
        let mut line = format!("{:04x}: ", addr);
        let mut chars = String::new();
        for &byte in chunk {
            line.push_str(&format!("{:02x} ", byte));
            let c = byte as char;
            chars.push(if c.is_ascii_graphic() || c == ' ' {
                c
            } else {
                '.'
            });
        }

        let dump_line = format!("{:<54} {}\n", line, chars);
        str.push_str(&dump_line);
        addr = addr.wrapping_add(16);
    }

    str
}

/// Installs a global fmt subscriber. `RUST_LOG` wins over `default_directive`.
pub fn init_tracing(default_directive: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_directive))?;
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(anyhow::Error::msg)
}
