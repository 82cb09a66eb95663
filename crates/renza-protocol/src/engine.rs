//! The protocol session and its event-driven front-end loop.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use tracing::{debug, info, warn};

use renza_core::{Board, GameRules, Loc, Move, PatternCalculator, Sign};
use renza_engine::{
    EngineConfig, SearchControl, SearchDriver, SearchReport, UniformEvaluator,
};

use crate::command::{parse_command, Command};
use crate::error::ProtocolError;
use crate::message::Response;

/// Result of feeding one input line to the session.
#[derive(Debug)]
pub enum Outcome {
    /// Plain replies; print and continue.
    Replies(Vec<Response>),
    /// Replies to print, then a search must run for the side to move.
    StartSearch(Vec<Response>),
    /// Replies to print, then exit cleanly.
    Quit(Vec<Response>),
}

/// Everything a worker thread needs to run one search.
pub struct SearchJob {
    pub driver: SearchDriver,
    pub board: Board,
    pub to_move: Sign,
    pub control: SearchControl,
    pub show_detail: bool,
}

/// Which kind of board upload is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadKind {
    /// `BOARD`: answer with a move when done.
    Reply,
    /// `yxboard`: just set the position.
    Silent,
}

/// Protocol-visible engine state: board, configuration, and the
/// search driver (absent while a worker thread owns it).
pub struct Session {
    config: EngineConfig,
    board: Option<Board>,
    driver: Option<SearchDriver>,
    stop_flag: Arc<AtomicBool>,
    upload: Option<(UploadKind, Vec<(Loc, u8)>)>,
    timeout_turn_ms: u64,
    show_detail: bool,
}

impl Session {
    pub fn new() -> Session {
        Session {
            config: EngineConfig::default(),
            board: None,
            driver: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            upload: None,
            timeout_turn_ms: 0,
            show_detail: false,
        }
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_flag)
    }

    /// Side to move: cross starts and strict alternation holds.
    fn to_move(&self) -> Sign {
        match &self.board {
            Some(board) if board.stone_count() % 2 == 1 => Sign::Circle,
            _ => Sign::Cross,
        }
    }

    fn rebuild_driver(&mut self) {
        self.driver = Some(SearchDriver::new(self.config.clone(), Box::new(UniformEvaluator)));
    }

    /// Feed one input line. Parse failures become `ERROR` replies;
    /// nothing here can take the session down.
    pub fn handle(&mut self, line: &str) -> Outcome {
        let command = match parse_command(line, self.upload.is_some()) {
            Ok(command) => command,
            Err(error) => {
                self.upload = None;
                return Outcome::Replies(vec![Response::Error(error.to_string())]);
            }
        };
        match command {
            Command::Start { size } => self.handle_start(size, size),
            Command::RectStart { cols, rows } => self.handle_start(rows, cols),
            Command::Begin => {
                if self.board.is_none() {
                    return Outcome::Replies(vec![Response::Error(ProtocolError::NoGame.to_string())]);
                }
                Outcome::StartSearch(Vec::new())
            }
            Command::Turn(loc) => self.handle_turn(loc),
            Command::Board => {
                self.upload = Some((UploadKind::Reply, Vec::new()));
                Outcome::Replies(Vec::new())
            }
            Command::YxBoard => {
                self.upload = Some((UploadKind::Silent, Vec::new()));
                Outcome::Replies(Vec::new())
            }
            Command::BoardEntry { loc, field } => {
                match &mut self.upload {
                    Some((_, entries)) => {
                        entries.push((loc, field));
                        Outcome::Replies(Vec::new())
                    }
                    None => Outcome::Replies(vec![Response::Error(
                        ProtocolError::BadBoardEntry { text: line.trim().to_string() }.to_string(),
                    )]),
                }
            }
            Command::BoardDone => self.handle_board_done(),
            Command::Info { key, value } => Outcome::Replies(self.handle_info(&key, &value)),
            Command::Restart => {
                match &self.board {
                    Some(board) => {
                        let (rows, cols) = (board.rows(), board.cols());
                        self.board = Some(Board::empty(rows, cols).expect("known-good size"));
                        if let Some(driver) = &mut self.driver {
                            driver.reset();
                        }
                        Outcome::Replies(vec![Response::Ok])
                    }
                    None => Outcome::Replies(vec![Response::Error(ProtocolError::NoGame.to_string())]),
                }
            }
            Command::About => Outcome::Replies(vec![Response::About]),
            Command::End => Outcome::Quit(Vec::new()),
            Command::YxStop => {
                self.stop_flag.store(true, Ordering::Release);
                Outcome::Replies(Vec::new())
            }
            Command::YxShowForbid => Outcome::Replies(vec![self.show_forbidden()]),
            Command::YxHashClear => {
                if let Some(driver) = &mut self.driver {
                    driver.reset();
                }
                Outcome::Replies(Vec::new())
            }
            Command::YxSwap2 { step } => Outcome::Replies(self.handle_swap2(step)),
            Command::Unknown(text) => {
                debug!(command = %text, "ignoring unknown command");
                Outcome::Replies(vec![Response::Message(format!("unknown command {text}"))])
            }
        }
    }

    fn handle_start(&mut self, rows: usize, cols: usize) -> Outcome {
        // Gomocup plays 15 or 20; rectangular setups allow the full
        // supported range
        let square_ok = rows == cols && (rows == 15 || rows == 20);
        let rect_ok = rows != cols
            && (renza_core::MIN_BOARD_SIZE..=renza_core::MAX_BOARD_SIZE).contains(&rows)
            && (renza_core::MIN_BOARD_SIZE..=renza_core::MAX_BOARD_SIZE).contains(&cols);
        if !square_ok && !rect_ok {
            return Outcome::Replies(vec![Response::Error(
                ProtocolError::UnsupportedSize { size: rows.max(cols) }.to_string(),
            )]);
        }
        self.config.set_board_size(rows, cols);
        self.board = Some(Board::empty(rows, cols).expect("validated size"));
        self.rebuild_driver();
        info!(rows, cols, rules = %self.config.rules, "game started");
        Outcome::Replies(vec![Response::Ok])
    }

    fn handle_turn(&mut self, loc: Loc) -> Outcome {
        let Some(board) = &mut self.board else {
            return Outcome::Replies(vec![Response::Error(ProtocolError::NoGame.to_string())]);
        };
        if !board.contains(loc.row as i32, loc.col as i32) {
            return Outcome::Replies(vec![Response::Error(
                ProtocolError::OutOfBoard { x: loc.col as i32, y: loc.row as i32 }.to_string(),
            )]);
        }
        let opponent = match board.stone_count() % 2 {
            0 => Sign::Cross,
            _ => Sign::Circle,
        };
        if board.put(Move::new(opponent, loc)).is_err() {
            return Outcome::Replies(vec![Response::Error(format!(
                "cell {},{} is occupied",
                loc.col, loc.row
            ))]);
        }
        Outcome::StartSearch(Vec::new())
    }

    fn handle_board_done(&mut self) -> Outcome {
        let Some((kind, entries)) = self.upload.take() else {
            return Outcome::Replies(vec![Response::Error("DONE without BOARD".to_string())]);
        };
        let Some(board) = &self.board else {
            return Outcome::Replies(vec![Response::Error(ProtocolError::NoGame.to_string())]);
        };

        let mut fresh = Board::empty(board.rows(), board.cols()).expect("known-good size");
        let stones = entries.iter().filter(|(_, field)| *field != 3).count();
        // field 1 belongs to the side that moves after the upload
        let to_move_after = if stones % 2 == 0 { Sign::Cross } else { Sign::Circle };
        for (loc, field) in entries {
            let sign = match field {
                1 => to_move_after,
                2 => to_move_after.invert(),
                _ => {
                    warn!(%loc, "blocked cells are not supported; ignoring");
                    continue;
                }
            };
            if fresh.put(Move::new(sign, loc)).is_err() {
                return Outcome::Replies(vec![Response::Error(
                    ProtocolError::BadBoardEntry { text: loc.to_string() }.to_string(),
                )]);
            }
        }
        self.board = Some(fresh);
        match kind {
            UploadKind::Reply => Outcome::StartSearch(Vec::new()),
            UploadKind::Silent => Outcome::Replies(Vec::new()),
        }
    }

    fn handle_info(&mut self, key: &str, value: &str) -> Vec<Response> {
        let bad = |key: &str, value: &str| {
            vec![Response::Error(
                ProtocolError::BadOptionValue { key: key.to_string(), value: value.to_string() }
                    .to_string(),
            )]
        };
        match key {
            "timeout_turn" => match value.parse::<u64>() {
                Ok(ms) => {
                    self.timeout_turn_ms = ms;
                    Vec::new()
                }
                Err(_) => bad(key, value),
            },
            "time_increment" => match value.parse::<u64>() {
                Ok(ms) => {
                    self.config.time_increment_ms = ms;
                    Vec::new()
                }
                Err(_) => bad(key, value),
            },
            "max_depth" => match value.parse::<usize>() {
                Ok(depth) => {
                    self.config.max_depth = depth;
                    Vec::new()
                }
                Err(_) => bad(key, value),
            },
            "max_node" => match value.parse::<u64>() {
                Ok(nodes) => {
                    self.config.max_nodes = nodes;
                    self.rebuild_driver_if_started();
                    Vec::new()
                }
                Err(_) => bad(key, value),
            },
            "max_memory" => match value.parse::<usize>() {
                Ok(bytes) if bytes > 0 => {
                    self.config.max_memory = bytes;
                    Vec::new()
                }
                _ => bad(key, value),
            },
            "hash_size" => match value.parse::<usize>() {
                Ok(mb) => {
                    let (accepted, clamped) = self.config.set_hash_size_mb(mb);
                    self.rebuild_driver_if_started();
                    if clamped {
                        vec![Response::Message(format!(
                            "hash_size clamped to {accepted} MB"
                        ))]
                    } else {
                        Vec::new()
                    }
                }
                Err(_) => bad(key, value),
            },
            "rule" => match value.parse::<u32>().map_err(|_| ()).and_then(|n| {
                GameRules::from_protocol(n).map_err(|_| ())
            }) {
                Ok(rules) => {
                    self.config.rules = rules;
                    self.rebuild_driver_if_started();
                    Vec::new()
                }
                Err(()) => bad(key, value),
            },
            "thread_num" => match value.parse::<usize>() {
                Ok(threads) => {
                    self.config.set_thread_num(threads);
                    Vec::new()
                }
                Err(_) => bad(key, value),
            },
            "pondering" => {
                self.config.auto_pondering = value == "1" || value.eq_ignore_ascii_case("true");
                Vec::new()
            }
            "usedatabase" => {
                self.config.use_database = value == "1" || value.eq_ignore_ascii_case("true");
                Vec::new()
            }
            "show_detail" => {
                self.show_detail = value == "1" || value.eq_ignore_ascii_case("true");
                Vec::new()
            }
            // accepted but irrelevant to this engine
            "timeout_match" | "time_left" | "game_type" | "folder" | "caution_factor"
            | "nbest_sym" | "checkmate" => Vec::new(),
            _ => {
                debug!(key, value, "ignoring unknown option");
                Vec::new()
            }
        }
    }

    fn rebuild_driver_if_started(&mut self) {
        if self.board.is_some() {
            self.rebuild_driver();
        }
    }

    /// Forbidden cells for cross under the current rules.
    fn show_forbidden(&self) -> Response {
        let Some(board) = &self.board else {
            return Response::Error(ProtocolError::NoGame.to_string());
        };
        let mut cells = Vec::new();
        if self.config.rules == GameRules::Renju {
            let mut calc = PatternCalculator::new(self.config.rules, board.rows(), board.cols());
            calc.set_board(board, Sign::Cross);
            for loc in board.locations() {
                if board.is_empty_at(loc) && calc.is_forbidden(Sign::Cross, loc) {
                    cells.push(loc);
                }
            }
        }
        Response::Forbid(cells)
    }

    /// Swap2 negotiation. Decisions come from a short search of the
    /// current position; proposals reuse the driver's best moves.
    fn handle_swap2(&mut self, step: u8) -> Vec<Response> {
        let Some(board) = self.board.clone() else {
            return vec![Response::Error(ProtocolError::NoGame.to_string())];
        };
        match step {
            1 => {
                // propose a balanced three-stone opening
                let r = (board.rows() / 2) as u8;
                let c = (board.cols() / 2) as u8;
                vec![
                    Response::Swap2Move { index: 1, loc: Loc::new(r, c) },
                    Response::Swap2Move { index: 2, loc: Loc::new(r - 1, c + 1) },
                    Response::Swap2Move { index: 3, loc: Loc::new(r + 3, c.saturating_sub(3) ) },
                ]
            }
            2 => {
                let value = self.quick_value(&board);
                if value < 0.5 {
                    // the placed opening favours the opponent; take it
                    vec![Response::Swap2Decision { stage: 1, accept: true }]
                } else {
                    let mut replies = vec![Response::Swap2Decision { stage: 1, accept: false }];
                    for (index, loc) in self.quick_moves(&board, 2).into_iter().enumerate() {
                        replies.push(Response::Swap2Move { index: 4 + index as u8, loc });
                    }
                    replies
                }
            }
            3 => {
                let value = self.quick_value(&board);
                vec![Response::Swap2Decision { stage: 2, accept: value < 0.5 }]
            }
            _ => vec![Response::Error(format!("unknown swap2 step {step}"))],
        }
    }

    /// Short fixed-budget probe of the position's value for the side
    /// to move.
    fn quick_value(&mut self, board: &Board) -> f32 {
        let Some(driver) = &mut self.driver else { return 0.5 };
        let to_move = if board.stone_count() % 2 == 0 { Sign::Cross } else { Sign::Circle };
        let control =
            SearchControl::bounded(Arc::new(AtomicBool::new(false)), None, Some(64));
        let report = driver.search(board, to_move, &control, |_| {});
        report.value.expectation()
    }

    /// A couple of candidate continuations for swap2 proposals.
    fn quick_moves(&mut self, board: &Board, count: usize) -> Vec<Loc> {
        let mut out = Vec::new();
        let mut scratch = board.clone();
        for _ in 0..count {
            let Some(driver) = &mut self.driver else { break };
            let to_move = if scratch.stone_count() % 2 == 0 { Sign::Cross } else { Sign::Circle };
            let control =
                SearchControl::bounded(Arc::new(AtomicBool::new(false)), None, Some(64));
            let report = driver.search(&scratch, to_move, &control, |_| {});
            let Some(best) = report.best_move else { break };
            let _ = scratch.put(Move::new(to_move, best));
            out.push(best);
        }
        out
    }

    /// Package the pending search for a worker thread.
    pub fn take_search_job(&mut self) -> Option<SearchJob> {
        let board = self.board.clone()?;
        if self.driver.is_none() {
            self.rebuild_driver();
        }
        let driver = self.driver.take()?;
        self.stop_flag.store(false, Ordering::Release);
        let time_limit = (self.timeout_turn_ms > 0)
            .then(|| Duration::from_millis(self.timeout_turn_ms));
        let simulations = (self.config.max_nodes > 0).then_some(self.config.max_nodes);
        let control = SearchControl::bounded(self.stop_flag(), time_limit, simulations);
        Some(SearchJob {
            driver,
            to_move: self.to_move(),
            board,
            control,
            show_detail: self.show_detail,
        })
    }

    /// Reinstall the driver, place the chosen move, and produce the
    /// reply line.
    pub fn finish_search(&mut self, driver: SearchDriver, report: &SearchReport) -> Vec<Response> {
        self.driver = Some(driver);
        let Some(best) = report.best_move else {
            return vec![Response::Error("no legal move available".to_string())];
        };
        let to_move = self.to_move();
        if let Some(board) = &mut self.board {
            if board.put(Move::new(to_move, best)).is_err() {
                return vec![Response::Error("search returned an occupied cell".to_string())];
            }
        }
        vec![Response::Move(best)]
    }

    /// Run the pending search on the current thread. The event loop
    /// prefers a worker thread; tests and simple hosts use this.
    pub fn run_search_sync(&mut self) -> Vec<Response> {
        let Some(mut job) = self.take_search_job() else {
            return vec![Response::Error(ProtocolError::NoGame.to_string())];
        };
        let mut replies = Vec::new();
        let show_detail = job.show_detail;
        let report = job.driver.search(&job.board, job.to_move, &job.control, |event| {
            if show_detail {
                replies.push(Response::Realtime(event));
            }
        });
        replies.extend(self.finish_search(job.driver, &report));
        replies
    }
}

impl Default for Session {
    fn default() -> Session {
        Session::new()
    }
}

/// Events handled by the front-end loop.
enum EngineEvent {
    Input(String),
    SearchDone(Box<(SearchDriver, SearchReport)>),
    Emit(Response),
    InputClosed,
}

/// Event-driven front-end: stdin reader thread, search worker thread,
/// replies in program order on stdout.
pub struct ProtocolEngine {
    session: Session,
}

impl ProtocolEngine {
    pub fn new() -> ProtocolEngine {
        ProtocolEngine { session: Session::new() }
    }

    /// Serve until `END` or input closes. Returns cleanly on `END`;
    /// I/O failures bubble up as errors.
    pub fn run(mut self) -> Result<(), ProtocolError> {
        let stdout = io::stdout();
        let (tx, rx) = mpsc::channel::<EngineEvent>();

        let input_tx = tx.clone();
        std::thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        if input_tx.send(EngineEvent::Input(line)).is_err() {
                            return;
                        }
                    }
                    Err(_) => break,
                }
            }
            let _ = input_tx.send(EngineEvent::InputClosed);
        });

        let mut searching = false;
        let mut quit_after_search = false;
        let mut queued: VecDeque<String> = VecDeque::new();

        let emit = |responses: &[Response]| {
            let mut out = stdout.lock();
            for response in responses {
                let _ = writeln!(out, "{response}");
            }
            let _ = out.flush();
        };

        for event in &rx {
            match event {
                EngineEvent::Input(line) => {
                    if searching {
                        // only stop and quit cut through a running search
                        let upper = line.trim().to_ascii_uppercase();
                        if upper == "YXSTOP" {
                            self.session.stop_flag().store(true, Ordering::Release);
                        } else if upper == "END" {
                            self.session.stop_flag().store(true, Ordering::Release);
                            quit_after_search = true;
                        } else {
                            queued.push_back(line);
                        }
                        continue;
                    }
                    match self.dispatch(&line, &tx, &emit) {
                        Dispatch::Continue => {}
                        Dispatch::Searching => searching = true,
                        Dispatch::Quit => return Ok(()),
                    }
                }
                EngineEvent::Emit(response) => emit(&[response]),
                EngineEvent::SearchDone(done) => {
                    let (driver, report) = *done;
                    let replies = self.session.finish_search(driver, &report);
                    emit(&replies);
                    searching = false;
                    if quit_after_search {
                        return Ok(());
                    }
                    while !searching {
                        let Some(line) = queued.pop_front() else { break };
                        match self.dispatch(&line, &tx, &emit) {
                            Dispatch::Continue => {}
                            Dispatch::Searching => searching = true,
                            Dispatch::Quit => return Ok(()),
                        }
                    }
                }
                EngineEvent::InputClosed => break,
            }
        }
        info!("renza shutting down");
        Ok(())
    }

    fn dispatch<F>(&mut self, line: &str, tx: &mpsc::Sender<EngineEvent>, emit: &F) -> Dispatch
    where
        F: Fn(&[Response]),
    {
        match self.session.handle(line) {
            Outcome::Replies(replies) => {
                emit(&replies);
                Dispatch::Continue
            }
            Outcome::Quit(replies) => {
                emit(&replies);
                Dispatch::Quit
            }
            Outcome::StartSearch(replies) => {
                emit(&replies);
                let Some(mut job) = self.session.take_search_job() else {
                    emit(&[Response::Error(ProtocolError::NoGame.to_string())]);
                    return Dispatch::Continue;
                };
                let tx = tx.clone();
                std::thread::spawn(move || {
                    let show_detail = job.show_detail;
                    let events_tx = tx.clone();
                    let report =
                        job.driver.search(&job.board, job.to_move, &job.control, |event| {
                            if show_detail {
                                let _ = events_tx.send(EngineEvent::Emit(Response::Realtime(event)));
                            }
                        });
                    let _ = tx.send(EngineEvent::SearchDone(Box::new((job.driver, report))));
                });
                Dispatch::Searching
            }
        }
    }
}

enum Dispatch {
    Continue,
    Searching,
    Quit,
}

impl Default for ProtocolEngine {
    fn default() -> ProtocolEngine {
        ProtocolEngine::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive a session synchronously, collecting every reply line.
    fn play(session: &mut Session, line: &str) -> Vec<String> {
        match session.handle(line) {
            Outcome::Replies(replies) | Outcome::Quit(replies) => {
                replies.iter().map(Response::to_string).collect()
            }
            Outcome::StartSearch(replies) => {
                let mut out: Vec<String> = replies.iter().map(Response::to_string).collect();
                out.extend(session.run_search_sync().iter().map(Response::to_string));
                out
            }
        }
    }

    #[test]
    fn start_begin_turn_flow() {
        let mut session = Session::new();
        assert_eq!(play(&mut session, "START 15"), vec!["OK"]);
        assert!(play(&mut session, "INFO max_node 30").is_empty());

        let reply = play(&mut session, "BEGIN");
        assert_eq!(reply.len(), 1);
        let parts: Vec<&str> = reply[0].split(',').collect();
        assert_eq!(parts.len(), 2, "BEGIN must answer with a move, got {reply:?}");

        // opponent answers somewhere free, engine responds again
        let reply = play(&mut session, "TURN 0,0");
        assert_eq!(reply.len(), 1);
        assert!(reply[0].contains(','));
    }

    #[test]
    fn unsupported_square_size_is_an_error() {
        let mut session = Session::new();
        let reply = play(&mut session, "START 13");
        assert!(reply[0].starts_with("ERROR"));
        // the session survives and accepts a valid start afterwards
        assert_eq!(play(&mut session, "START 20"), vec!["OK"]);
    }

    #[test]
    fn turn_on_occupied_cell_is_an_error() {
        let mut session = Session::new();
        play(&mut session, "START 15");
        play(&mut session, "INFO max_node 20");
        play(&mut session, "BEGIN");
        // the engine opened in the centre; stepping on it must fail
        let reply = play(&mut session, "TURN 7,7");
        assert!(reply[0].starts_with("ERROR"), "expected ERROR, got {reply:?}");
    }

    #[test]
    fn board_upload_and_reply() {
        let mut session = Session::new();
        play(&mut session, "START 15");
        play(&mut session, "INFO max_node 20");
        assert!(play(&mut session, "BOARD").is_empty());
        assert!(play(&mut session, "7,7,2").is_empty());
        assert!(play(&mut session, "8,8,1").is_empty());
        assert!(play(&mut session, "6,6,2").is_empty());
        let reply = play(&mut session, "DONE");
        assert_eq!(reply.len(), 1);
        assert!(reply[0].contains(','), "DONE must answer with a move, got {reply:?}");
    }

    #[test]
    fn hash_size_below_minimum_is_clamped_with_notice() {
        let mut session = Session::new();
        play(&mut session, "START 15");
        let reply = play(&mut session, "INFO hash_size 2");
        assert_eq!(reply, vec!["MESSAGE hash_size clamped to 8 MB"]);
        assert!(play(&mut session, "INFO hash_size 64").is_empty());
    }

    #[test]
    fn showforbid_lists_exactly_the_forbidden_cells() {
        let mut session = Session::new();
        play(&mut session, "START 15");
        play(&mut session, "INFO rule 2");
        play(&mut session, "INFO max_node 20");
        play(&mut session, "BEGIN");
        play(&mut session, "TURN 8,8");
        let reply = play(&mut session, "yxshowforbid");
        assert_eq!(reply.len(), 1);
        assert!(reply[0].starts_with("FORBID"), "got {reply:?}");
        assert!(reply[0].ends_with('.'));

        // cross-check against a direct scan of the session's board
        let board = session.board.as_ref().unwrap();
        let mut calc = PatternCalculator::new(GameRules::Renju, 15, 15);
        calc.set_board(board, Sign::Cross);
        let mut expected = String::from("FORBID ");
        for loc in board.locations() {
            if board.is_empty_at(loc) && calc.is_forbidden(Sign::Cross, loc) {
                expected.push_str(&format!("{:02}{:02}", loc.row, loc.col));
            }
        }
        expected.push('.');
        assert_eq!(reply[0], expected);
    }

    #[test]
    fn restart_resets_the_board() {
        let mut session = Session::new();
        play(&mut session, "START 15");
        play(&mut session, "INFO max_node 20");
        play(&mut session, "BEGIN");
        assert_eq!(play(&mut session, "RESTART"), vec!["OK"]);
        assert_eq!(session.board.as_ref().unwrap().stone_count(), 0);
    }

    #[test]
    fn swap2_step1_proposes_three_moves() {
        let mut session = Session::new();
        play(&mut session, "START 15");
        let reply = play(&mut session, "yxswap2step1");
        assert_eq!(reply.len(), 3);
        assert!(reply[0].starts_with("MESSAGE SWAP2 MOVE1"));
        assert!(reply[2].starts_with("MESSAGE SWAP2 MOVE3"));
    }

    #[test]
    fn swap2_step3_decides() {
        let mut session = Session::new();
        play(&mut session, "START 15");
        play(&mut session, "INFO max_node 20");
        let reply = play(&mut session, "yxswap2step3");
        assert_eq!(reply.len(), 1);
        assert!(reply[0].starts_with("MESSAGE SWAP2 SWAP2"), "got {reply:?}");
    }

    #[test]
    fn malformed_input_never_kills_the_session() {
        let mut session = Session::new();
        play(&mut session, "START 15");
        for garbage in ["TURN", "TURN a,b", "INFO rule banana", "RECTSTART x"] {
            let reply = play(&mut session, garbage);
            assert!(
                reply.first().is_some_and(|r| r.starts_with("ERROR")),
                "{garbage:?} should produce ERROR, got {reply:?}"
            );
        }
        // still alive
        assert_eq!(play(&mut session, "RESTART"), vec!["OK"]);
    }

    #[test]
    fn about_identifies_the_engine() {
        let mut session = Session::new();
        let reply = play(&mut session, "ABOUT");
        assert!(reply[0].contains("renza"));
    }
}
