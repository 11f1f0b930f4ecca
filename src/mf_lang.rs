// Multi-language support module
// Localized panel strings for English and Chinese

#[derive(Clone)]
pub struct Assets {
    // Panel chrome
    pub project_title: &'static str,
    pub card_title: &'static str,
    pub card_description_fmt: &'static str, // "Find {} hidden mines! ..."
    pub loading: &'static str,

    // Game state
    pub game_over: &'static str,
    pub btn_new_game: &'static str,

    // Host status
    pub frame_added: &'static str,
    pub frame_not_added: &'static str,
    pub add_not_added_fmt: &'static str, // "Not added: {}"
    pub add_error_fmt: &'static str,     // "Error: {}"
    pub events_title: &'static str,

    // Status bar key hints
    pub key_reveal: &'static str,
    pub key_new: &'static str,
    pub key_add: &'static str,
    pub key_remove: &'static str,
    pub key_notify: &'static str,
    pub key_primary: &'static str,
    pub key_exit: &'static str,

    // Terminal size messages
    pub tsmsg_line1: &'static str,
    pub tsmsg_line2: &'static str, // "Minimum size required: {} x {}"
    pub tsmsg_title: &'static str,
}

/// Returns English language assets
pub fn english_assets() -> Assets {
    Assets {
        project_title: "Mineframe",
        card_title: "Mineframe Sweeper",
        card_description_fmt: "Find {} hidden mines! Click to reveal cells.",
        loading: "Loading...",

        game_over: "Game Over! Mine hit!",
        btn_new_game: " New Game ",

        frame_added: "Frame added",
        frame_not_added: "Frame not added",
        add_not_added_fmt: "Not added: {}",
        add_error_fmt: "Error: {}",
        events_title: "Host events",

        key_reveal: "Reveal",
        key_new: "New",
        key_add: "Add",
        key_remove: "Remove",
        key_notify: "Notify",
        key_primary: "Button",
        key_exit: "Exit",

        tsmsg_line1: "Terminal layout too small",
        tsmsg_line2: "Minimum size required: {} x {}",
        tsmsg_title: "Resize needed",
    }
}

/// Returns Chinese language assets
pub fn chinese_assets() -> Assets {
    Assets {
        project_title: "Mineframe",
        card_title: "扫雷小框",
        card_description_fmt: "找出 {} 个隐藏的地雷！点击翻开格子。",
        loading: "加载中...",

        game_over: "游戏结束！踩到地雷！",
        btn_new_game: " 新游戏 ",

        frame_added: "已添加",
        frame_not_added: "未添加",
        add_not_added_fmt: "未添加：{}",
        add_error_fmt: "错误：{}",
        events_title: "宿主事件",

        key_reveal: "翻开",
        key_new: "新局",
        key_add: "添加",
        key_remove: "移除",
        key_notify: "通知",
        key_primary: "按钮",
        key_exit: "退出",

        tsmsg_line1: "终端屏幕布局过小",
        tsmsg_line2: "最小需要尺寸：{} x {}",
        tsmsg_title: "需要调整大小",
    }
}

/// Main language manager struct
/// Holds the current language code and active string assets
pub struct Lang {
    pub current_lang: String,
    pub assets: Assets,
}

impl Lang {
    /// Creates a new Lang instance from a language code
    /// Normalizes input (e.g., "zh-CN" → "zh") and defaults to English for unsupported languages
    pub fn new(lang_code: &str) -> Self {
        let code = if lang_code.to_lowercase().starts_with("zh") {
            "zh"
        } else {
            "en"
        };

        Lang {
            current_lang: code.to_string(),
            assets: if code == "zh" {
                chinese_assets()
            } else {
                english_assets()
            },
        }
    }
}

/// Substitute `{}` placeholders in order
pub fn fill(fmt: &str, args: &[&dyn std::fmt::Display]) -> String {
    let mut out = String::with_capacity(fmt.len());
    let mut rest = fmt;
    for arg in args {
        match rest.find("{}") {
            Some(pos) => {
                out.push_str(&rest[..pos]);
                out.push_str(&arg.to_string());
                rest = &rest[pos + 2..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}
