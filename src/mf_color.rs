use ratatui::style::Color;
use term_color_support::ColorSupport;

/// Color depth the terminal reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    TrueColor,
    Ansi256,
    Basic,
}

impl Depth {
    pub fn detect() -> Depth {
        let support = ColorSupport::stdout();
        if support.has_16m {
            Depth::TrueColor
        } else if support.has_256 {
            Depth::Ansi256
        } else {
            Depth::Basic
        }
    }

    /// Pin an ANSI color to the Windows Terminal (Campbell) look at this depth
    /// Custom RGB or indexed colors pass through unchanged
    pub fn pin(self, color: Color) -> Color {
        // Format: ((R, G, B), ANSI_256_Index)
        let mapping = match color {
            Color::Black =>         Some(((12, 12, 12),   232)),
            Color::Red =>           Some(((197, 15, 31),  160)),
            Color::Green =>         Some(((19, 161, 14),  28)),
            Color::Yellow =>        Some(((193, 156, 0),  178)),
            Color::Blue =>          Some(((0, 55, 218),   20)),
            Color::Magenta =>       Some(((136, 23, 152), 90)),
            Color::Cyan =>          Some(((58, 150, 221), 38)),
            Color::Gray =>          Some(((204, 204, 204), 250)),
            Color::DarkGray =>      Some(((118, 118, 118), 243)),
            Color::LightRed =>      Some(((231, 72, 86),  203)),
            Color::LightBlue =>     Some(((59, 120, 255), 63)),
            Color::LightMagenta =>  Some(((180, 0, 158),  163)),
            Color::White =>         Some(((242, 242, 242), 255)),
            _ => None,
        };
        match (mapping, self) {
            (Some(((r, g, b), _)), Depth::TrueColor) => Color::Rgb(r, g, b),
            (Some((_, index)), Depth::Ansi256) => Color::Indexed(index),
            _ => color,
        }
    }
}

/// Colors used by the panel, resolved once at startup
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub hidden: Color,
    pub board_bg: Color,
    pub cursor_bg: Color,
    pub mine: Color,
    pub numbers: [Color; 8],
    pub key: Color,
    pub button_bg: Color,
    pub button_fg: Color,
    pub alert: Color,
    pub dim: Color,
}

impl Palette {
    pub fn new(depth: Depth) -> Self {
        let c = |color| depth.pin(color);
        Palette {
            hidden: c(Color::Gray),
            board_bg: c(Color::DarkGray),
            cursor_bg: c(Color::LightBlue),
            mine: c(Color::Black),
            numbers: [
                c(Color::Blue),
                c(Color::Green),
                c(Color::Red),
                c(Color::Magenta),
                c(Color::LightRed),
                c(Color::Cyan),
                c(Color::Black),
                c(Color::White),
            ],
            key: c(Color::Yellow),
            button_bg: c(Color::LightMagenta),
            button_fg: c(Color::White),
            alert: c(Color::Red),
            dim: c(Color::DarkGray),
        }
    }

    /// Color for an adjacent-mine count in 1..=8
    pub fn number(&self, n: u8) -> Color {
        self.numbers[(n.clamp(1, 8) - 1) as usize]
    }
}
