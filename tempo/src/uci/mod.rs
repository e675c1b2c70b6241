use std::{fmt::Display, str::FromStr};

use tempo_lib::options::*;

#[macro_use]
mod macros;

spin_options![
    Hash: usize = TT_SIZE_MB, 1..=32768 => tt_size_mb,
    MaxDepth: u8 = MAX_DEPTH, 1..=127 => max_depth,
    NmpDepth: i8 = NMP_DEPTH, 1..=10 => nmp_depth,
    NmpReduction: i8 = NMP_REDUCTION, 1..=6 => nmp_reduction,
    PvsFulldepth: i8 = PVS_FULLDEPTH, 0..=10 => pvs_fulldepth,
    LmrDepth: i8 = LMR_DEPTH, 1..=10 => lmr_depth,
    LmrProtectedMoves: usize = LMR_PROTECTED_MOVES, 1..=10 => lmr_protected_moves,
];

#[derive(Debug, PartialEq, Eq)]
pub enum UciCommand {
    Uci,
    IsReady,
    SetOption(UciOption),
    UciNewGame,
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    Go {
        wtime: Option<u64>,
        btime: Option<u64>,
        winc: Option<u64>,
        binc: Option<u64>,
        depth: Option<u8>,
        movetime: Option<u64>,
        infinite: bool,
        perft: Option<u8>,
    },
    Fen,
    Status,
    Stop,
    Quit,
}

struct Spin<T> {
    default: T,
    min: T,
    max: T,
}

impl<T: FromStr + PartialOrd + Display> Spin<T> {
    fn validate(&self, text: &str) -> Result<T, String> {
        let value = text
            .parse::<T>()
            .map_err(|_| format!("{text} is not a number"))?;
        if value < self.min || value > self.max {
            return Err(format!("{value} is outside [{}, {}]", self.min, self.max));
        }
        Ok(value)
    }
}

/// The `type spin ...` tail of an `option` line.
impl<T: Display> Display for Spin<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "type spin default {} min {} max {}",
            self.default, self.min, self.max
        )
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum UciParseError {
    Empty,
    Other(String),
}

impl Display for UciParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UciParseError::Empty => Ok(()),
            UciParseError::Other(reason) => write!(f, "{reason}"),
        }
    }
}
impl std::error::Error for UciParseError {}

fn parse_setoption(words: &[&str]) -> Result<UciCommand, UciParseError> {
    match words.get(1) {
        Some(&"name") => {}
        Some(other) => {
            return Err(UciParseError::Other(format!(
                "Unexpected token in UCI setoption command: expected 'name', found {other}"
            )))
        }
        None => {
            return Err(UciParseError::Other(String::from(
                "Missing token in UCI setoption command: 'name' not found",
            )))
        }
    }
    let name = words.get(2).ok_or_else(|| {
        UciParseError::Other(String::from(
            "Missing token in UCI setoption command: no name specified",
        ))
    })?;
    match words.get(3) {
        Some(&"value") => {}
        Some(other) => {
            return Err(UciParseError::Other(format!(
                "Unexpected token in UCI setoption command: expected 'value', found {other}"
            )))
        }
        None => {
            return Err(UciParseError::Other(String::from(
                "Missing token in UCI setoption command: 'value' not found",
            )))
        }
    }
    let value = words.get(4).ok_or_else(|| {
        UciParseError::Other(String::from(
            "Missing token in UCI setoption command: no value specified",
        ))
    })?;
    UciOption::parse(name, value).map(UciCommand::SetOption)
}

/// Splits `position` into a FEN and move list. Both are validated when the
/// engine applies them.
fn parse_position(words: &[&str]) -> Result<UciCommand, UciParseError> {
    let (fen, rest) = match words.get(1) {
        Some(&"startpos") => (None, &words[2..]),
        Some(&"fen") => {
            let end = words
                .iter()
                .position(|&w| w == "moves")
                .unwrap_or(words.len());
            if end <= 2 {
                return Err(UciParseError::Other(String::from(
                    "Incomplete or missing FEN string in UCI position command",
                )));
            }
            (Some(words[2..end].join(" ")), &words[end..])
        }
        Some(p) => {
            return Err(UciParseError::Other(format!(
                "Invalid argument in UCI position command: {p}\n\t \
                Valid arguments are: 'startpos', 'fen [FEN]'"
            )))
        }
        None => {
            return Err(UciParseError::Other(String::from(
                "Missing arguments in UCI position command, expected 'startpos' or 'fen'",
            )))
        }
    };

    let moves = match rest.first() {
        Some(&"moves") => rest[1..].iter().map(|m| m.to_string()).collect(),
        Some(other) => {
            return Err(UciParseError::Other(format!(
                "Expected 'moves' in UCI position command, found {other}"
            )))
        }
        None => Vec::new(),
    };
    Ok(UciCommand::Position { fen, moves })
}

/// The value after `name` in a `go` command, if `name` appears at all.
fn go_value<T: FromStr>(words: &[&str], name: &str) -> Result<Option<T>, UciParseError> {
    let Some(at) = words.iter().position(|&w| w == name) else {
        return Ok(None);
    };
    let text = words.get(at + 1).ok_or_else(|| {
        UciParseError::Other(format!(
            "Missing token in UCI go command: no value specified for {name}"
        ))
    })?;
    text.parse().map(Some).map_err(|_| {
        UciParseError::Other(format!("Invalid value for {name} in UCI go command: {text}"))
    })
}

fn parse_go(words: &[&str]) -> Result<UciCommand, UciParseError> {
    let wtime = go_value::<u64>(words, "wtime")?;
    let btime = go_value::<u64>(words, "btime")?;
    let winc = go_value::<u64>(words, "winc")?;
    let binc = go_value::<u64>(words, "binc")?;
    let depth = go_value::<u8>(words, "depth")?;
    let movetime = go_value::<u64>(words, "movetime")?;
    let perft = go_value::<u8>(words, "perft")?;
    let infinite = words.contains(&"infinite");

    let limited = wtime.is_some()
        || btime.is_some()
        || depth.is_some()
        || movetime.is_some();
    if infinite && (limited || perft.is_some()) {
        return Err(UciParseError::Other(String::from(
            "Error in UCI go command: 'infinite' specified along with other search directives",
        )));
    }
    if perft.is_some() && limited {
        return Err(UciParseError::Other(String::from(
            "Error in UCI go command: 'perft' specified along with other directives",
        )));
    }

    Ok(UciCommand::Go {
        wtime,
        btime,
        winc,
        binc,
        depth,
        movetime,
        infinite,
        perft,
    })
}

pub fn parse_uci_command<T: AsRef<str>>(cmd: T) -> Result<UciCommand, UciParseError> {
    let words = cmd.as_ref().split_whitespace().collect::<Vec<&str>>();

    use UciCommand::*;

    match words.first() {
        Some(word) => match word.to_lowercase().as_str() {
            "uci" => Ok(Uci),
            "isready" => Ok(IsReady),
            "setoption" => parse_setoption(&words),
            "ucinewgame" => Ok(UciNewGame),
            "position" => parse_position(&words),
            "go" => parse_go(&words),
            "fen" => Ok(Fen),
            "status" => Ok(Status),
            "stop" => Ok(Stop),
            "quit" => Ok(Quit),
            other => Err(UciParseError::Other(format!("Unknown UCI command: {other}"))),
        },
        None => Err(UciParseError::Empty),
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn parses_position_commands() -> Result<(), Box<dyn Error>> {
        assert_eq!(
            parse_uci_command("position startpos moves e2e4 e7e5")?,
            UciCommand::Position {
                fen: None,
                moves: vec!["e2e4".into(), "e7e5".into()],
            }
        );
        assert_eq!(
            parse_uci_command("position fen 4k3/8/8/8/8/8/8/4K3 w - - 0 1")?,
            UciCommand::Position {
                fen: Some("4k3/8/8/8/8/8/8/4K3 w - - 0 1".into()),
                moves: vec![],
            }
        );
        assert!(parse_uci_command("position fen").is_err());
        assert!(parse_uci_command("position startpos e2e4").is_err());
        Ok(())
    }

    #[test]
    fn parses_go_commands() -> Result<(), Box<dyn Error>> {
        match parse_uci_command("go wtime 60000 btime 55000 winc 1000 binc 1000")? {
            UciCommand::Go {
                wtime, btime, winc, infinite, ..
            } => {
                assert_eq!(wtime, Some(60000));
                assert_eq!(btime, Some(55000));
                assert_eq!(winc, Some(1000));
                assert!(!infinite);
            }
            _ => panic!("expected go"),
        }
        assert!(matches!(
            parse_uci_command("go infinite")?,
            UciCommand::Go { infinite: true, .. }
        ));
        assert!(parse_uci_command("go depth x").is_err());
        assert!(parse_uci_command("go depth").is_err());
        assert!(parse_uci_command("go infinite depth 5").is_err());
        Ok(())
    }

    #[test]
    fn validates_option_ranges() -> Result<(), Box<dyn Error>> {
        assert_eq!(
            parse_uci_command("setoption name Hash value 64")?,
            UciCommand::SetOption(UciOption::Hash(64))
        );
        assert_eq!(
            parse_uci_command("setoption name nmpdepth value 2")?,
            UciCommand::SetOption(UciOption::NmpDepth(2))
        );
        assert!(parse_uci_command("setoption name Hash value 0").is_err());
        assert!(parse_uci_command("setoption name Bogus value 1").is_err());

        let mut options = SearchOptions::default();
        UciOption::LmrDepth(5).apply(&mut options);
        assert_eq!(options.lmr_depth, 5);
        Ok(())
    }

    #[test]
    fn empty_and_unknown_lines() {
        assert_eq!(parse_uci_command("   "), Err(UciParseError::Empty));
        assert!(matches!(
            parse_uci_command("fly"),
            Err(UciParseError::Other(_))
        ));
    }

    #[test]
    fn options_write_their_fields_and_list_their_ranges() -> Result<(), Box<dyn Error>> {
        let mut options = SearchOptions::default();
        for line in [
            "setoption name hash value 8",
            "setoption name MaxDepth value 12",
            "setoption name LmrProtectedMoves value 4",
        ] {
            match parse_uci_command(line)? {
                UciCommand::SetOption(opt) => opt.apply(&mut options),
                other => panic!("expected setoption, got {other:?}"),
            }
        }
        assert_eq!(options.tt_size_mb, 8);
        assert_eq!(options.max_depth, 12);
        assert_eq!(options.lmr_protected_moves, 4);

        let spin = Spin::<i8> { default: 3, min: 1, max: 10 };
        assert_eq!(spin.to_string(), "type spin default 3 min 1 max 10");
        assert_eq!(spin.validate("10"), Ok(10));
        assert!(spin.validate("11").is_err());
        assert!(spin.validate("-").is_err());
        Ok(())
    }
}
