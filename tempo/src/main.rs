use std::{
    error::Error,
    io::{prelude::*, stdin},
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use clap::{Parser, Subcommand};
use tempo_lib::{
    board::{Position, START_FEN},
    engine::{Engine, SearchLimit},
    evaluate::PieceSquareEvaluator,
    options::SearchOptions,
    search::Search,
    types::Color,
    Tables,
};
use tempo_pregen::{generate_magic_tables, DEFAULT_SEED};

mod uci;

/// Kept back from the clock for communication delays.
const MOVE_OVERHEAD_MS: u64 = 50;

const BENCH_POSITIONS: [&str; 6] = [
    START_FEN,
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
];

#[derive(Parser, Debug)]
#[command(name = "tempo", version, about = "A UCI chess engine", long_about = None)]
struct Cli {
    /// Load magic attack tables from this file instead of the built-in ones
    #[arg(long, global = true)]
    tables: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search a fixed set of positions and report nodes per second
    Bench {
        #[arg(long, default_value_t = 8)]
        depth: u8,
    },
    /// Count leaf nodes of the legal move tree
    Perft {
        #[arg(long, default_value_t = 5)]
        depth: u8,
        #[arg(long)]
        fen: Option<String>,
        /// Print the count below every root move
        #[arg(long)]
        divide: bool,
    },
    /// Search new magic numbers and write the table file
    GenTables {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    if let Some(Command::GenTables { out, seed }) = &cli.command {
        return gen_tables(out, *seed);
    }

    let tables = match &cli.tables {
        Some(path) => Tables::load(path),
        None => Tables::embedded(),
    };
    let tables = match tables {
        Ok(tables) => tables,
        Err(e) => {
            log::error!("refusing to start without verified attack tables: {e}");
            return Err(e.into());
        }
    };

    match cli.command {
        Some(Command::Bench { depth }) => bench(tables, depth),
        Some(Command::Perft { depth, fen, divide }) => {
            let fen = fen.as_deref().unwrap_or(START_FEN);
            perft(Position::from_fen(tables, fen)?, depth, divide);
            Ok(())
        }
        Some(Command::GenTables { .. }) => Ok(()),
        None => uci_loop(tables),
    }
}

fn gen_tables(out: &PathBuf, seed: u64) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let magics = generate_magic_tables(seed)?;
    magics.verify()?;
    magics.save(out)?;
    log::info!(
        "wrote {} attack entries to {} in {}ms",
        magics.attack_buffer().len(),
        out.display(),
        start.elapsed().as_millis()
    );
    Ok(())
}

fn bench(tables: Arc<Tables>, depth: u8) -> Result<(), Box<dyn Error>> {
    let options = SearchOptions::default();
    let mut nodes = 0;
    let start = Instant::now();
    for fen in BENCH_POSITIONS {
        let position = Position::from_fen(tables.clone(), fen)?;
        let mut search =
            Search::new(position, PieceSquareEvaluator::new(), options).max_depth(depth);
        let result = search.run();
        log::debug!("{fen}: {} after {} nodes", result.best_move, result.nodes);
        nodes += result.nodes;
    }
    let time = start.elapsed();
    let nps = (nodes as f64 / time.as_secs_f64()) as u64;
    println!("{nodes} nodes {nps} nps");
    Ok(())
}

fn perft(mut position: Position, depth: u8, divide: bool) {
    let start = Instant::now();
    let nodes = if divide {
        let split = position.divide(depth);
        for (mv, count) in &split {
            println!("{mv}: {count}");
        }
        split.iter().map(|(_, count)| count).sum()
    } else {
        position.perft(depth)
    };
    let time = start.elapsed();
    let nps = (nodes as f64 / time.as_secs_f64().max(1e-6)) as u64;
    println!("\nNodes searched: {nodes}");
    println!("{}ms, {nps} nps", time.as_millis());
}

fn search_limit(
    engine: &Engine,
    clock: (Option<u64>, Option<u64>, Option<u64>, Option<u64>),
    depth: Option<u8>,
    movetime: Option<u64>,
    infinite: bool,
) -> SearchLimit {
    let (wtime, btime, winc, binc) = clock;
    let (time, inc) = match engine.position().side_to_move() {
        Color::White => (wtime, winc),
        Color::Black => (btime, binc),
    };
    if infinite {
        SearchLimit::Infinite
    } else if let Some(ms) = movetime {
        SearchLimit::MoveTime(Duration::from_millis(ms.saturating_sub(MOVE_OVERHEAD_MS)))
    } else if let Some(ms) = time {
        let remaining = ms.saturating_sub(MOVE_OVERHEAD_MS) + inc.unwrap_or(0);
        SearchLimit::Clock {
            remaining: Duration::from_millis(remaining),
        }
    } else if let Some(depth) = depth {
        SearchLimit::Depth(depth)
    } else {
        SearchLimit::Infinite
    }
}

fn uci_loop(tables: Arc<Tables>) -> Result<(), Box<dyn Error>> {
    let mut engine = Engine::new(tables, SearchOptions::default());
    engine.set_uci_output(true);

    for line in stdin().lock().lines() {
        let cmd = match uci::parse_uci_command(line?) {
            Ok(cmd) => cmd,
            Err(uci::UciParseError::Empty) => {
                continue;
            }
            Err(uci::UciParseError::Other(e)) => {
                eprintln!("{e}");
                continue;
            }
        };

        // the searcher has printed bestmove but may not have exited yet
        if matches!(
            cmd,
            uci::UciCommand::SetOption(_)
                | uci::UciCommand::UciNewGame
                | uci::UciCommand::Position { .. }
                | uci::UciCommand::Go { .. }
        ) {
            if let Err(e) = engine.finish() {
                eprintln!("{e}");
            }
        }

        let outcome = match cmd {
            uci::UciCommand::Uci => {
                println!("id name Tempo");
                println!("id author the Tempo developers");
                uci::print_uci_options();
                println!("uciok");
                Ok(())
            }
            uci::UciCommand::IsReady => {
                println!("readyok");
                Ok(())
            }
            uci::UciCommand::SetOption(uci::UciOption::Hash(mb)) => engine.resize_tt(mb),
            uci::UciCommand::SetOption(opt) => {
                let mut options = *engine.options();
                opt.apply(&mut options);
                engine.set_options(options)
            }
            uci::UciCommand::UciNewGame => engine.new_game(),
            uci::UciCommand::Position { fen, moves } => {
                let set = match fen {
                    Some(fen) => engine.set_position(&fen),
                    None => engine.set_start_position(),
                };
                set.and_then(|_| engine.apply_moves(&moves))
            }
            uci::UciCommand::Go {
                wtime,
                btime,
                winc,
                binc,
                depth,
                movetime,
                infinite,
                perft: perft_depth,
            } => {
                if let Some(depth) = perft_depth {
                    perft(engine.position().clone(), depth, true);
                    continue;
                }
                let limit = search_limit(&engine, (wtime, btime, winc, binc), depth, movetime, infinite);
                // a depth given alongside a clock still caps the search
                engine.search_capped(limit, depth)
            }
            uci::UciCommand::Fen => {
                println!("{}", engine.position().fen());
                Ok(())
            }
            uci::UciCommand::Status => {
                println!("{}", engine.game_status());
                Ok(())
            }
            uci::UciCommand::Stop => {
                engine.stop();
                Ok(())
            }
            uci::UciCommand::Quit => {
                engine.stop();
                break;
            }
        };

        if let Err(e) = outcome {
            eprintln!("{e}");
        }
    }
    Ok(())
}
