use ratatui::style::Color;

use crate::state::ServerStatus;

const SERVER_COLORS: [Color; 8] = [
    Color::Red,
    Color::Green,
    Color::Blue,
    Color::Yellow,
    Color::Magenta,
    Color::Cyan,
    Color::LightRed,
    Color::LightGreen,
];

/// Stable color for a server name (FNV-1a over the bytes).
pub fn server_color(name: &str) -> Color {
    let hash = name
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| (h ^ b as u64).wrapping_mul(0x0100_0000_01b3));
    SERVER_COLORS[(hash % SERVER_COLORS.len() as u64) as usize]
}

pub fn status_color(status: ServerStatus) -> Color {
    match status {
        ServerStatus::Healthy => Color::Green,
        ServerStatus::Down => Color::Red,
        ServerStatus::Unknown => Color::Gray,
    }
}
