// Core game logic and configuration management
// Handles board generation, single-cell reveals, the game session and configuration persistence

use directories::ProjectDirs;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::mf_error::{ConfigError, GameError};
use crate::mf_frame::HostConfig;

/// How mines are scattered over a fresh board
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MinePlacement {
    /// Fisher-Yates over the flattened coordinates, first `mine_count` win
    #[default]
    Shuffle,
    /// Draw random coordinates until enough distinct ones were hit
    Rejection,
}

/// User configuration
/// Persisted to disk as TOML
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub size: usize,
    pub mine_count: usize,
    pub placement: MinePlacement,
    pub seed: Option<u64>,          // Fixed RNG seed, entropy when absent
    pub ascii_icons: bool,          // Use ASCII fallback icons
    pub language: String,           // Language code ("en" or "zh")
    pub log_level: String,          // tracing level name
    pub host: HostConfig,
}

impl Default for Config {
    fn default() -> Self {
        // Auto-detect system language on first run
        let system_lang = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
        let lang = if system_lang.to_lowercase().starts_with("zh") {
            "zh".to_string()
        } else {
            "en".to_string()
        };

        Config {
            size: 8,
            mine_count: 10,
            placement: MinePlacement::Shuffle,
            seed: None,
            ascii_icons: false,
            language: lang,
            log_level: "info".to_string(),
            host: HostConfig::default(),
        }
    }
}

impl Config {
    /// Reject board settings the generator could never satisfy
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_dimensions(self.size, self.mine_count)
    }

    /// Parsed log level, `INFO` when the configured name is unknown
    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

/// Largest board side the panel can lay out
pub const MAX_SIZE: usize = 64;

fn check_dimensions(size: usize, mines: usize) -> Result<(), ConfigError> {
    if size == 0 {
        return Err(ConfigError::EmptyBoard);
    }
    if size > MAX_SIZE {
        return Err(ConfigError::BoardTooLarge { size, max: MAX_SIZE });
    }
    let max = size * size - 1;
    if mines > max {
        return Err(ConfigError::TooManyMines { size, mines, max });
    }
    Ok(())
}

/// A single cell on the minesweeper board
/// Mine layout and adjacency are fixed once generated; only the reveal flag changes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    is_mine: bool,
    is_revealed: bool,
    adjacent_mines: u8, // 0-8, unused for mines
}

impl Cell {
    pub fn is_mine(&self) -> bool {
        self.is_mine
    }

    pub fn is_revealed(&self) -> bool {
        self.is_revealed
    }

    pub fn adjacent_mines(&self) -> u8 {
        self.adjacent_mines
    }
}

/// Result of a single reveal request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    /// Cell was already open or the game is over, nothing changed
    Ignored,
    Revealed,
    HitMine,
}

impl Reveal {
    pub fn hit_mine(self) -> bool {
        self == Reveal::HitMine
    }
}

/// Square grid of cells stored row-major
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Generate a board with `mine_count` distinct mines and precomputed adjacency counts
    pub fn generate<R: Rng + ?Sized>(
        size: usize,
        mine_count: usize,
        placement: MinePlacement,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        check_dimensions(size, mine_count)?;
        let mut board = Board {
            size,
            cells: vec![Cell::default(); size * size],
        };
        match placement {
            MinePlacement::Shuffle => board.place_shuffled(mine_count, rng),
            MinePlacement::Rejection => board.place_rejection(mine_count, rng),
        }
        board.count_adjacent();
        tracing::debug!(size, mine_count, ?placement, "board generated");
        Ok(board)
    }

    fn place_shuffled<R: Rng + ?Sized>(&mut self, mines: usize, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.cells.len()).collect();
        order.shuffle(rng);
        for &i in &order[..mines] {
            self.cells[i].is_mine = true;
        }
    }

    fn place_rejection<R: Rng + ?Sized>(&mut self, mines: usize, rng: &mut R) {
        let mut placed = 0;
        while placed < mines {
            let x = rng.gen_range(0..self.size);
            let y = rng.gen_range(0..self.size);
            let idx = self.index(y, x);
            if !self.cells[idx].is_mine {
                self.cells[idx].is_mine = true;
                placed += 1;
            }
        }
    }

    fn count_adjacent(&mut self) {
        for y in 0..self.size {
            for x in 0..self.size {
                let idx = self.index(y, x);
                if self.cells[idx].is_mine {
                    continue;
                }
                let adj = self
                    .neighbors(y, x)
                    .filter(|&(ny, nx)| self.cells[self.index(ny, nx)].is_mine)
                    .count();
                self.cells[idx].adjacent_mines = adj as u8;
            }
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn index(&self, y: usize, x: usize) -> usize {
        y * self.size + x
    }

    pub fn cell(&self, y: usize, x: usize) -> Option<&Cell> {
        if y < self.size && x < self.size {
            self.cells.get(self.index(y, x))
        } else {
            None
        }
    }

    /// Rows of cells, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.size)
    }

    #[cfg(test)]
    pub fn mine_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_mine).count()
    }

    #[cfg(test)]
    pub fn revealed_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_revealed).count()
    }

    /// Coordinates of the up-to-8 neighbors of (y, x), clipped at the edges
    pub fn neighbors(&self, y: usize, x: usize) -> impl Iterator<Item = (usize, usize)> {
        let last = self.size - 1;
        let (xmin, xmax) = (x.saturating_sub(1), (x + 1).min(last));
        (y.saturating_sub(1)..=(y + 1).min(last))
            .flat_map(move |ny| (xmin..=xmax).map(move |nx| (ny, nx)))
            .filter(move |&pos| pos != (y, x))
    }

    /// Open exactly one cell; never cascades into neighbors
    pub fn reveal(&mut self, y: usize, x: usize) -> Result<Reveal, GameError> {
        if y >= self.size || x >= self.size {
            return Err(GameError::InvalidCoords { y, x, size: self.size });
        }
        let idx = self.index(y, x);
        let cell = &mut self.cells[idx];
        if cell.is_revealed {
            return Ok(Reveal::Ignored);
        }
        cell.is_revealed = true;
        Ok(if cell.is_mine { Reveal::HitMine } else { Reveal::Revealed })
    }

    /// Board with mines at fixed (y, x) positions
    #[cfg(test)]
    pub(crate) fn with_mines(size: usize, mines: &[(usize, usize)]) -> Self {
        let mut board = Board {
            size,
            cells: vec![Cell::default(); size * size],
        };
        for &(y, x) in mines {
            let idx = board.index(y, x);
            board.cells[idx].is_mine = true;
        }
        board.count_adjacent();
        board
    }
}

/// Main game state
pub struct Game {
    pub size: usize,
    pub mines: usize,
    pub placement: MinePlacement,
    pub board: Board,
    pub game_over: bool,        // Set by a mine hit, blocks further reveals
    pub cursor: (usize, usize), // Keyboard cursor as (y, x)
    rng: StdRng,
}

impl Game {
    pub fn new(
        size: usize,
        mines: usize,
        placement: MinePlacement,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let board = Board::generate(size, mines, placement, &mut rng)?;
        Ok(Game {
            size,
            mines,
            placement,
            board,
            game_over: false,
            cursor: (0, 0),
            rng,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        Game::new(cfg.size, cfg.mine_count, cfg.placement, cfg.seed)
    }

    /// Discard the current board and sample a fresh layout from the same RNG stream
    pub fn new_game(&mut self) -> Result<(), ConfigError> {
        self.board = Board::generate(self.size, self.mines, self.placement, &mut self.rng)?;
        self.game_over = false;
        self.cursor = (0, 0);
        tracing::info!("new game started");
        Ok(())
    }

    /// Reveal a cell at (y, x)
    /// - No-op once the game is over or the cell is already open
    /// - Ends the game on a mine hit
    pub fn reveal(&mut self, y: usize, x: usize) -> Result<Reveal, GameError> {
        if self.game_over {
            return Ok(Reveal::Ignored);
        }
        let outcome = self.board.reveal(y, x)?;
        if outcome.hit_mine() {
            tracing::info!(y, x, "mine hit, game over");
            self.game_over = true;
        }
        Ok(outcome)
    }

    pub fn step_cursor(&mut self, dy: isize, dx: isize) {
        let last = (self.size - 1) as isize;
        let ny = (self.cursor.0 as isize + dy).clamp(0, last) as usize;
        let nx = (self.cursor.1 as isize + dx).clamp(0, last) as usize;
        self.cursor = (ny, nx);
    }

    pub fn reveal_at_cursor(&mut self) -> Result<Reveal, GameError> {
        let (y, x) = self.cursor;
        self.reveal(y, x)
    }
}

/// Per-user directory holding the config and log files
/// Falls back to the current directory if ProjectDirs is unavailable
fn app_dir() -> Option<PathBuf> {
    if let Some(proj) = ProjectDirs::from("com", "xhbl", "mineframe") {
        return Some(proj.config_dir().to_path_buf());
    }
    env::current_dir().ok()
}

/// Get the configuration file path (e.g., ~/.config/mineframe/mineframe.toml on Linux)
pub fn config_path() -> Option<PathBuf> {
    app_dir().map(|dir| dir.join("mineframe.toml"))
}

pub fn log_path() -> Option<PathBuf> {
    app_dir().map(|dir| dir.join("mineframe.log"))
}

/// Load configuration from disk, or create default if not found
/// Logging is not up yet at this point, so a load problem is handed back as a warning
pub fn load_or_create_config() -> (Config, Option<String>) {
    let Some(path) = config_path() else {
        return (Config::default(), None);
    };
    if path.exists() {
        return match fs::read_to_string(&path) {
            Ok(s) => match toml::from_str::<Config>(&s) {
                Ok(cfg) => (cfg, None),
                Err(e) => (
                    Config::default(),
                    Some(format!("ignoring unparsable config {}: {}", path.display(), e)),
                ),
            },
            Err(e) => (
                Config::default(),
                Some(format!("cannot read config {}: {}", path.display(), e)),
            ),
        };
    }
    let cfg = Config::default();
    save_config(&cfg);
    (cfg, None)
}

/// Save configuration to disk as TOML
pub fn save_config(cfg: &Config) {
    if let Some(path) = config_path() {
        if let Ok(s) = toml::to_string(cfg) {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let _ = fs::write(&path, s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    fn assert_adjacency_exact(board: &Board) {
        for y in 0..board.size() {
            for x in 0..board.size() {
                let cell = board.cell(y, x).unwrap();
                if cell.is_mine() {
                    continue;
                }
                let mut expected = 0;
                for ny in y.saturating_sub(1)..=(y + 1).min(board.size() - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(board.size() - 1) {
                        if (ny, nx) != (y, x) && board.cell(ny, nx).unwrap().is_mine() {
                            expected += 1;
                        }
                    }
                }
                assert_eq!(cell.adjacent_mines(), expected, "cell ({}, {})", y, x);
            }
        }
    }

    #[test]
    fn generated_boards_hold_exact_mine_count_and_adjacency() {
        for placement in [MinePlacement::Shuffle, MinePlacement::Rejection] {
            for seed in 0..20 {
                let board = Board::generate(8, 10, placement, &mut rng(seed)).unwrap();
                assert_eq!(board.mine_count(), 10);
                assert_adjacency_exact(&board);
            }
        }
    }

    #[test]
    fn fresh_board_is_fully_hidden() {
        let board = Board::generate(8, 10, MinePlacement::Shuffle, &mut rng(7)).unwrap();
        assert_eq!(board.revealed_count(), 0);
        assert!(board.rows().flatten().all(|c| !c.is_revealed()));
    }

    #[test]
    fn zero_cells_have_no_mine_neighbors() {
        let mut board = Board::generate(8, 10, MinePlacement::Shuffle, &mut rng(3)).unwrap();
        let zeros: Vec<(usize, usize)> = (0..8)
            .flat_map(|y| (0..8).map(move |x| (y, x)))
            .filter(|&(y, x)| {
                let c = board.cell(y, x).unwrap();
                !c.is_mine() && c.adjacent_mines() == 0
            })
            .collect();
        assert!(!zeros.is_empty());
        for &(y, x) in &zeros {
            assert_eq!(board.reveal(y, x).unwrap(), Reveal::Revealed);
            assert!(board.neighbors(y, x).all(|(ny, nx)| !board.cell(ny, nx).unwrap().is_mine()));
        }
    }

    #[test]
    fn densest_valid_board_leaves_one_safe_cell() {
        for placement in [MinePlacement::Shuffle, MinePlacement::Rejection] {
            let board = Board::generate(3, 8, placement, &mut rng(11)).unwrap();
            assert_eq!(board.mine_count(), 8);
            let safe: Vec<&Cell> = board.rows().flatten().filter(|c| !c.is_mine()).collect();
            assert_eq!(safe.len(), 1);
        }
    }

    #[test]
    fn single_cell_board_without_mines() {
        let board = Board::generate(1, 0, MinePlacement::Shuffle, &mut rng(1)).unwrap();
        assert_eq!(board.mine_count(), 0);
        assert_eq!(board.cell(0, 0).unwrap().adjacent_mines(), 0);
        assert_eq!(board.neighbors(0, 0).count(), 0);
    }

    #[test]
    fn generate_rejects_impossible_configs() {
        assert_eq!(
            Board::generate(4, 16, MinePlacement::Rejection, &mut rng(0)),
            Err(ConfigError::TooManyMines { size: 4, mines: 16, max: 15 })
        );
        assert_eq!(
            Board::generate(0, 0, MinePlacement::Shuffle, &mut rng(0)),
            Err(ConfigError::EmptyBoard)
        );
    }

    #[test]
    fn oversized_boards_fail_fast() {
        assert_eq!(
            Board::generate(MAX_SIZE + 1, 10, MinePlacement::Shuffle, &mut rng(0)),
            Err(ConfigError::BoardTooLarge { size: MAX_SIZE + 1, max: MAX_SIZE })
        );
        let cfg = Config { size: usize::MAX, mine_count: 10, ..Config::default() };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::BoardTooLarge { size: usize::MAX, max: MAX_SIZE })
        );
        let board = Board::generate(MAX_SIZE, 10, MinePlacement::Shuffle, &mut rng(0)).unwrap();
        assert_eq!(board.mine_count(), 10);
    }

    #[test]
    fn same_seed_same_layout() {
        let a = Board::generate(8, 10, MinePlacement::Shuffle, &mut rng(42)).unwrap();
        let b = Board::generate(8, 10, MinePlacement::Shuffle, &mut rng(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn neighbors_clip_at_edges() {
        let board = Board::with_mines(3, &[]);
        assert_eq!(board.neighbors(0, 0).count(), 3);
        assert_eq!(board.neighbors(0, 1).count(), 5);
        assert_eq!(board.neighbors(1, 1).count(), 8);
        assert_eq!(board.neighbors(2, 2).collect::<Vec<_>>(), vec![(1, 1), (1, 2), (2, 1)]);
    }

    #[test]
    fn reveal_opens_single_cell_only() {
        let mut board = Board::with_mines(3, &[(2, 2)]);
        assert_eq!(board.reveal(0, 0).unwrap(), Reveal::Revealed);
        assert_eq!(board.revealed_count(), 1);
        assert!(!board.cell(0, 1).unwrap().is_revealed());
    }

    #[test]
    fn reveal_twice_is_a_noop() {
        let mut board = Board::with_mines(3, &[(0, 0)]);
        assert_eq!(board.reveal(1, 1).unwrap(), Reveal::Revealed);
        let before = board.clone();
        assert_eq!(board.reveal(1, 1).unwrap(), Reveal::Ignored);
        assert_eq!(board, before);
    }

    #[test]
    fn reveal_out_of_bounds_fails() {
        let mut board = Board::with_mines(3, &[]);
        assert_eq!(
            board.reveal(3, 0),
            Err(GameError::InvalidCoords { y: 3, x: 0, size: 3 })
        );
        assert_eq!(board.revealed_count(), 0);
    }

    fn game_with_mines(size: usize, mines: &[(usize, usize)]) -> Game {
        let mut game = Game::new(size, mines.len(), MinePlacement::Shuffle, Some(0)).unwrap();
        game.board = Board::with_mines(size, mines);
        game
    }

    #[test]
    fn mine_hit_ends_game_and_blocks_reveals() {
        let mut game = game_with_mines(3, &[(1, 1)]);
        let outcome = game.reveal(1, 1).unwrap();
        assert!(outcome.hit_mine());
        assert!(game.game_over);

        let before = game.board.clone();
        assert_eq!(game.reveal(0, 0).unwrap(), Reveal::Ignored);
        assert_eq!(game.board, before);
    }

    #[test]
    fn safe_reveal_keeps_game_running() {
        let mut game = game_with_mines(3, &[(1, 1)]);
        assert_eq!(game.reveal(0, 0).unwrap(), Reveal::Revealed);
        assert!(!game.game_over);
        assert_eq!(game.board.cell(0, 0).unwrap().adjacent_mines(), 1);
    }

    #[test]
    fn new_game_after_mine_hit_resets() {
        let mut game = Game::new(8, 10, MinePlacement::Shuffle, Some(5)).unwrap();
        let mine = (0..8)
            .flat_map(|y| (0..8).map(move |x| (y, x)))
            .find(|&(y, x)| game.board.cell(y, x).unwrap().is_mine())
            .unwrap();
        game.reveal(mine.0, mine.1).unwrap();
        assert!(game.game_over);

        game.new_game().unwrap();
        assert!(!game.game_over);
        assert_eq!(game.board.mine_count(), 10);
        assert_eq!(game.board.revealed_count(), 0);
        assert_adjacency_exact(&game.board);
    }

    #[test]
    fn cursor_stays_on_board() {
        let mut game = game_with_mines(4, &[]);
        game.step_cursor(-1, -1);
        assert_eq!(game.cursor, (0, 0));
        game.step_cursor(10, 2);
        assert_eq!(game.cursor, (3, 2));
        assert_eq!(game.reveal_at_cursor().unwrap(), Reveal::Revealed);
        assert!(game.board.cell(3, 2).unwrap().is_revealed());
    }

    #[test]
    fn config_defaults_match_panel() {
        let cfg = Config::default();
        assert_eq!((cfg.size, cfg.mine_count), (8, 10));
        assert_eq!(cfg.placement, MinePlacement::Shuffle);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.tracing_level(), tracing::Level::INFO);
    }

    #[test]
    fn config_parses_partial_toml() {
        let cfg: Config = toml::from_str(
            "size = 5\nmine_count = 25\nplacement = \"rejection\"\nlog_level = \"debug\"\n",
        )
        .unwrap();
        assert_eq!(cfg.placement, MinePlacement::Rejection);
        assert_eq!(cfg.tracing_level(), tracing::Level::DEBUG);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::TooManyMines { size: 5, mines: 25, max: 24 })
        );
    }

    #[test]
    fn config_survives_toml_round_trip() {
        let mut cfg = Config::default();
        cfg.seed = Some(9);
        cfg.host.added = true;
        let text = toml::to_string(&cfg).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }
}
