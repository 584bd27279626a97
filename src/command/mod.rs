//! Command grammar for the move mini-language the game server accepts.
//!
//! Three forms, selected by game phase:
//! - Placement (inventory > 0): `G<type>@P<col><row>(b=<init>)<turn>`
//! - Simple rotation (inventory empty): `G@P<col><row><turn>`
//! - Pre-move + rotation (inventory empty): `G@P<col><row>:b=<n> ; G@P<col><row><turn>`
//!
//! The server parses commands with zero tolerance, so the codec is strict:
//! any text outside the grammar rejects the whole value. Only syntax is
//! checked here; the server owns legality.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

/// Separator between the pre-move clause and the rotation clause.
pub const PRE_MOVE_SEPARATOR: &str = " ; ";

static COORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^P([1-9])([1-9])$").expect("static coordinate pattern"));

static TURN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-])90$").expect("static turn pattern"));

/// Errors produced while parsing or phase-checking a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("empty command")]
    Empty,

    #[error("not a recognised command form: {0:?}")]
    Unrecognized(String),

    #[error("unknown gear type: {0:?}")]
    BadGearType(String),

    #[error("malformed coordinate token: {0:?}")]
    BadCoordinate(String),

    #[error("initial rotation must be 0..=3, got {0:?}")]
    BadBase(String),

    #[error("turn must be +90 or -90, got {0:?}")]
    BadTurn(String),

    #[error("malformed pre-move clause: {0}")]
    BadPreMove(Box<FormatError>),

    #[error("{form} command is not legal in the {phase} phase")]
    WrongPhase { form: CommandForm, phase: Phase },
}

/// Game phase, derived from the remaining inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Some gear remains in inventory; only placements are legal.
    Placement,
    /// Inventory exhausted; only rotations (with optional pre-move) are legal.
    Rotation,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Placement => write!(f, "placement"),
            Phase::Rotation => write!(f, "rotation"),
        }
    }
}

/// Which of the three grammatical forms a command uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandForm {
    Placement,
    Rotation,
    PreMoveRotation,
}

impl fmt::Display for CommandForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandForm::Placement => write!(f, "placement"),
            CommandForm::Rotation => write!(f, "rotation"),
            CommandForm::PreMoveRotation => write!(f, "pre-move rotation"),
        }
    }
}

/// Gear types G1..G4 (number of bases).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GearType {
    G1,
    G2,
    G3,
    G4,
}

impl GearType {
    fn from_digit(s: &str) -> Result<Self, FormatError> {
        match s {
            "1" => Ok(GearType::G1),
            "2" => Ok(GearType::G2),
            "3" => Ok(GearType::G3),
            "4" => Ok(GearType::G4),
            other => Err(FormatError::BadGearType(other.to_string())),
        }
    }

    fn digit(self) -> u8 {
        match self {
            GearType::G1 => 1,
            GearType::G2 => 2,
            GearType::G3 => 3,
            GearType::G4 => 4,
        }
    }
}

/// A board coordinate, encoded as the fixed-width token `P<col><row>`.
///
/// Columns and rows are single digits starting at 1 (`P11` is bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    pub col: u8,
    pub row: u8,
}

impl Coord {
    pub fn new(col: u8, row: u8) -> Option<Self> {
        ((1..=9).contains(&col) && (1..=9).contains(&row)).then_some(Self { col, row })
    }
}

impl FromStr for Coord {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = COORD_RE
            .captures(s)
            .ok_or_else(|| FormatError::BadCoordinate(s.to_string()))?;
        // Both groups are a single [1-9] digit.
        let digit = |i: usize| caps[i].as_bytes()[0] - b'0';
        Ok(Coord {
            col: digit(1),
            row: digit(2),
        })
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}{}", self.col, self.row)
    }
}

/// Where a gear's "base 0" points: `b=0` up, `b=1` left, `b=2` down, `b=3` right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseOrientation {
    Up,
    Left,
    Down,
    Right,
}

impl BaseOrientation {
    fn from_digit(s: &str) -> Result<Self, FormatError> {
        match s {
            "0" => Ok(BaseOrientation::Up),
            "1" => Ok(BaseOrientation::Left),
            "2" => Ok(BaseOrientation::Down),
            "3" => Ok(BaseOrientation::Right),
            other => Err(FormatError::BadBase(other.to_string())),
        }
    }

    fn digit(self) -> u8 {
        match self {
            BaseOrientation::Up => 0,
            BaseOrientation::Left => 1,
            BaseOrientation::Down => 2,
            BaseOrientation::Right => 3,
        }
    }
}

/// Network rotation: `+90` counter-clockwise, `-90` clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Turn {
    CounterClockwise,
    Clockwise,
}

impl FromStr for Turn {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = TURN_RE
            .captures(s)
            .ok_or_else(|| FormatError::BadTurn(s.to_string()))?;
        Ok(if &caps[1] == "+" {
            Turn::CounterClockwise
        } else {
            Turn::Clockwise
        })
    }
}

impl fmt::Display for Turn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Turn::CounterClockwise => write!(f, "+90"),
            Turn::Clockwise => write!(f, "-90"),
        }
    }
}

/// A syntactically valid move command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Place a gear from inventory, then rotate the network.
    Placement {
        gear: GearType,
        at: Coord,
        base: BaseOrientation,
        turn: Turn,
    },
    /// Rotate the network from the gear at `at`.
    Rotation { at: Coord, turn: Turn },
    /// Re-label the base of the gear at `pre_move`, then rotate from `at`.
    PreMoveRotation {
        pre_move: Coord,
        base: BaseOrientation,
        at: Coord,
        turn: Turn,
    },
}

impl Command {
    /// Parse `text` strictly, with no phase check.
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        text.parse()
    }

    /// Parse `text` and check that its form is legal in `phase`.
    pub fn validate(text: &str, phase: Phase) -> Result<Self, FormatError> {
        let command = Self::parse(text)?;
        command.check_phase(phase)?;
        Ok(command)
    }

    pub fn form(&self) -> CommandForm {
        match self {
            Command::Placement { .. } => CommandForm::Placement,
            Command::Rotation { .. } => CommandForm::Rotation,
            Command::PreMoveRotation { .. } => CommandForm::PreMoveRotation,
        }
    }

    /// Whether this command's form is legal in `phase`.
    pub fn check_phase(&self, phase: Phase) -> Result<(), FormatError> {
        let legal = match phase {
            Phase::Placement => self.form() == CommandForm::Placement,
            Phase::Rotation => self.form() != CommandForm::Placement,
        };
        if legal {
            Ok(())
        } else {
            Err(FormatError::WrongPhase {
                form: self.form(),
                phase,
            })
        }
    }
}

impl FromStr for Command {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(FormatError::Empty);
        }

        if let Some((pre, rotation)) = s.split_once(PRE_MOVE_SEPARATOR) {
            let (pre_move, base) =
                parse_pre_move(pre).map_err(|e| FormatError::BadPreMove(Box::new(e)))?;
            let (at, turn) = parse_rotation(rotation)?;
            return Ok(Command::PreMoveRotation {
                pre_move,
                base,
                at,
                turn,
            });
        }

        if s.starts_with("G@") {
            let (at, turn) = parse_rotation(s)?;
            return Ok(Command::Rotation { at, turn });
        }

        if let Some(rest) = s.strip_prefix('G') {
            return parse_placement(s, rest);
        }

        Err(FormatError::Unrecognized(s.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Placement {
                gear,
                at,
                base,
                turn,
            } => write!(f, "G{}@{at}(b={}){turn}", gear.digit(), base.digit()),
            Command::Rotation { at, turn } => write!(f, "G@{at}{turn}"),
            Command::PreMoveRotation {
                pre_move,
                base,
                at,
                turn,
            } => write!(
                f,
                "G@{pre_move}:b={}{PRE_MOVE_SEPARATOR}G@{at}{turn}",
                base.digit()
            ),
        }
    }
}

/// `G<type>@P<col><row>(b=<init>)<turn>`; `rest` is `whole` without the leading `G`.
fn parse_placement(whole: &str, rest: &str) -> Result<Command, FormatError> {
    let unrecognized = || FormatError::Unrecognized(whole.to_string());

    let (gear, rest) = rest.split_once('@').ok_or_else(unrecognized)?;
    let gear = GearType::from_digit(gear)?;

    let (coord, rest) = rest.split_once("(b=").ok_or_else(unrecognized)?;
    let at = coord.parse()?;

    let (base, turn) = rest.split_once(')').ok_or_else(unrecognized)?;
    let base = BaseOrientation::from_digit(base)?;
    let turn = turn.parse()?;

    Ok(Command::Placement {
        gear,
        at,
        base,
        turn,
    })
}

/// `G@P<col><row><turn>`.
fn parse_rotation(clause: &str) -> Result<(Coord, Turn), FormatError> {
    let body = clause
        .strip_prefix("G@")
        .ok_or_else(|| FormatError::Unrecognized(clause.to_string()))?;
    let split = body
        .find(['+', '-'])
        .ok_or_else(|| FormatError::BadTurn(String::new()))?;
    let (coord, turn) = body.split_at(split);
    Ok((coord.parse()?, turn.parse()?))
}

/// `G@P<col><row>:b=<n>`.
fn parse_pre_move(clause: &str) -> Result<(Coord, BaseOrientation), FormatError> {
    let body = clause
        .strip_prefix("G@")
        .ok_or_else(|| FormatError::Unrecognized(clause.to_string()))?;
    let (coord, base) = body
        .split_once(":b=")
        .ok_or_else(|| FormatError::Unrecognized(clause.to_string()))?;
    Ok((coord.parse()?, BaseOrientation::from_digit(base)?))
}
