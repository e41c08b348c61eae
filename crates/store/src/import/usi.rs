use book_core::{Position, UsiMove};

use super::record::{GameRecord, RecordError};

/// Parses `[position] (startpos | sfen <board> <turn> <hands> [<ply>]) [moves ...]`.
pub fn parse_usi_line(line: &str) -> Result<GameRecord, RecordError> {
    let syntax = |message: &str| RecordError::Syntax {
        line: 1,
        message: format!("{message}: {line:?}"),
    };

    let mut tokens = line.split_whitespace().peekable();
    tokens.next_if_eq(&"position");

    let start = match tokens.next() {
        Some("startpos") => Position::startpos(),
        Some("sfen") => {
            let mut fields = Vec::with_capacity(4);
            while fields.len() < 4
                && let Some(field) = tokens.next_if(|token| *token != "moves")
            {
                fields.push(field);
            }
            Position::from_sfen(&fields.join(" "))?
        }
        _ => return Err(syntax("expected startpos or sfen")),
    };

    let usis: Vec<String> = match tokens.next() {
        None => Vec::new(),
        Some("moves") => tokens.map(str::to_string).collect(),
        Some(_) => return Err(syntax("expected moves")),
    };
    for usi in &usis {
        usi.parse::<UsiMove>()?;
    }

    Ok(GameRecord::main_line(start, usis))
}
