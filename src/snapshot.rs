//! Immutable game snapshots and their on-disk form.
//!
//! Layout: a 20-byte header (`OTSV`, version, payload length, CRC32 of the
//! payload, reserved) followed by the payload:
//!
//! | field | size |
//! |---|---|
//! | black mask | u64 LE |
//! | white mask | u64 LE |
//! | phase (0 black to move, 1 white to move, 2 over) | u8 |
//! | consecutive passes | u8 |
//! | black owned count, then one square index each | u8 + n·u8 |
//! | white owned count, then one square index each | u8 + n·u8 |

use std::path::Path;

use crate::board::Board;
use crate::error::SnapshotError;
use crate::game::Phase;
use crate::types::{Cell, Color, Position};

const MAGIC: &[u8; 4] = b"OTSV";
const VERSION: u32 = 1;
const HEADER_SIZE: usize = 20;

/// A frozen copy of everything needed to resume a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    board: Board,
    black_owned: Vec<Position>,
    white_owned: Vec<Position>,
    phase: Phase,
    consecutive_passes: u8,
}

impl Snapshot {
    pub fn new(
        board: Board,
        black_owned: &[Position],
        white_owned: &[Position],
        phase: Phase,
        consecutive_passes: u8,
    ) -> Self {
        Self {
            board,
            black_owned: black_owned.to_vec(),
            white_owned: white_owned.to_vec(),
            phase,
            consecutive_passes,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn owned(&self, color: Color) -> &[Position] {
        match color {
            Color::Black => &self.black_owned,
            Color::White => &self.white_owned,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn consecutive_passes(&self) -> u8 {
        self.consecutive_passes
    }

    /// Whether each owned list holds exactly the board's discs of its colour,
    /// without repeats.
    pub fn is_consistent(&self) -> bool {
        [Color::Black, Color::White].into_iter().all(|color| {
            let owned = self.owned(color);
            let mut sorted = owned.to_vec();
            sorted.sort();
            sorted.dedup();
            sorted.len() == owned.len() && sorted == self.board.positions_of(color)
        })
    }

    /// Returns `(board, black_owned, white_owned)`.
    pub fn into_parts(self) -> (Board, Vec<Position>, Vec<Position>) {
        (self.board, self.black_owned, self.white_owned)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let (black, white) = self.board.bitboards();
        let mut payload = Vec::with_capacity(20 + self.black_owned.len() + self.white_owned.len());
        payload.extend_from_slice(&black.to_le_bytes());
        payload.extend_from_slice(&white.to_le_bytes());
        payload.push(phase_to_byte(self.phase));
        payload.push(self.consecutive_passes);
        for owned in [&self.black_owned, &self.white_owned] {
            payload.push(owned.len() as u8);
            payload.extend(owned.iter().map(|pos| pos.index() as u8));
        }

        let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&payload);
        out
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, SnapshotError> {
        if data.len() < HEADER_SIZE {
            return Err(SnapshotError::TooShort {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        if &data[0..4] != MAGIC {
            return Err(SnapshotError::BadMagic);
        }

        let mut header = Reader::new(&data[4..HEADER_SIZE]);
        let version = header.u32()?;
        if version != VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                expected: VERSION,
                actual: version,
            });
        }
        let payload_len = header.u32()? as usize;
        let expected_crc = header.u32()?;

        let payload = &data[HEADER_SIZE..];
        if payload.len() != payload_len {
            return Err(SnapshotError::LengthMismatch {
                expected: payload_len,
                actual: payload.len(),
            });
        }
        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            return Err(SnapshotError::ChecksumMismatch {
                expected: expected_crc,
                actual: actual_crc,
            });
        }

        let mut reader = Reader::new(payload);
        let black = reader.u64()?;
        let white = reader.u64()?;
        let board = Board::from_bitboards(black, white)
            .ok_or_else(|| SnapshotError::Corrupt("black and white masks overlap".to_string()))?;
        let phase = phase_from_byte(reader.u8()?)?;
        let consecutive_passes = reader.u8()?;
        let black_owned = read_owned(&mut reader, &board, Color::Black)?;
        let white_owned = read_owned(&mut reader, &board, Color::White)?;
        if !reader.is_at_end() {
            return Err(SnapshotError::Corrupt("snapshot payload has trailing bytes".to_string()));
        }

        Ok(Self {
            board,
            black_owned,
            white_owned,
            phase,
            consecutive_passes,
        })
    }
}

pub fn save_to_file(snapshot: &Snapshot, path: &Path) -> Result<(), SnapshotError> {
    std::fs::write(path, snapshot.to_bytes())?;
    Ok(())
}

pub fn load_from_file(path: &Path) -> Result<Snapshot, SnapshotError> {
    let data = std::fs::read(path)?;
    Snapshot::from_bytes(&data)
}

fn read_owned(reader: &mut Reader<'_>, board: &Board, color: Color) -> Result<Vec<Position>, SnapshotError> {
    let count = reader.u8()? as usize;
    let mut owned = Vec::with_capacity(count);
    for _ in 0..count {
        let index = reader.u8()?;
        let pos = Position::from_index(index as usize)
            .ok_or_else(|| SnapshotError::Corrupt(format!("square index {index} out of range")))?;
        if board.cell(pos) != Cell::from(color) {
            return Err(SnapshotError::Corrupt(format!("{color} owns {pos}, which is not {color}")));
        }
        if owned.contains(&pos) {
            return Err(SnapshotError::Corrupt(format!("{color} owns {pos} twice")));
        }
        owned.push(pos);
    }
    if owned.len() != board.count_of(color) as usize {
        return Err(SnapshotError::Corrupt(format!(
            "{color} owns {} squares but the board holds {} {color} discs",
            owned.len(),
            board.count_of(color)
        )));
    }
    Ok(owned)
}

fn phase_to_byte(phase: Phase) -> u8 {
    match phase {
        Phase::Turn(Color::Black) => 0,
        Phase::Turn(Color::White) => 1,
        Phase::GameOver => 2,
    }
}

fn phase_from_byte(byte: u8) -> Result<Phase, SnapshotError> {
    match byte {
        0 => Ok(Phase::Turn(Color::Black)),
        1 => Ok(Phase::Turn(Color::White)),
        2 => Ok(Phase::GameOver),
        other => Err(SnapshotError::Corrupt(format!("unknown phase byte {other}"))),
    }
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], SnapshotError> {
        if self.offset + N > self.data.len() {
            return Err(SnapshotError::Corrupt("unexpected EOF".to_string()));
        }
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.data[self.offset..self.offset + N]);
        self.offset += N;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, SnapshotError> {
        Ok(self.take::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32, SnapshotError> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn u64(&mut self) -> Result<u64, SnapshotError> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    fn is_at_end(&self) -> bool {
        self.offset == self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opening_snapshot() -> Snapshot {
        let board = Board::new();
        Snapshot::new(
            board,
            &board.positions_of(Color::Black),
            &board.positions_of(Color::White),
            Phase::Turn(Color::Black),
            0,
        )
    }

    #[test]
    fn bytes_round_trip_preserves_everything() {
        let mut board = Board::new();
        let pos = Position::new(2, 3).unwrap();
        let moves = board.available_moves(Color::Black);
        board.apply_move(Color::Black, pos, moves.get(pos).unwrap());
        // Owned order deliberately not row-major.
        let black: Vec<_> = board.positions_of(Color::Black).into_iter().rev().collect();
        let snapshot = Snapshot::new(board, &black, &board.positions_of(Color::White), Phase::Turn(Color::White), 1);

        let restored = Snapshot::from_bytes(&snapshot.to_bytes()).unwrap();

        assert_eq!(restored, snapshot);
        assert_eq!(restored.owned(Color::Black), black.as_slice());
    }

    #[test]
    fn rejects_short_data() {
        let err = Snapshot::from_bytes(b"OTSV").unwrap_err();

        assert!(matches!(err, SnapshotError::TooShort { .. }));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = opening_snapshot().to_bytes();
        bytes[0] = b'X';

        assert!(matches!(Snapshot::from_bytes(&bytes), Err(SnapshotError::BadMagic)));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut bytes = opening_snapshot().to_bytes();
        bytes[4..8].copy_from_slice(&9u32.to_le_bytes());

        assert!(matches!(
            Snapshot::from_bytes(&bytes),
            Err(SnapshotError::UnsupportedVersion { actual: 9, .. })
        ));
    }

    #[test]
    fn rejects_flipped_payload_bit() {
        let mut bytes = opening_snapshot().to_bytes();
        bytes[HEADER_SIZE] ^= 0x01;

        assert!(matches!(
            Snapshot::from_bytes(&bytes),
            Err(SnapshotError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn rejects_truncated_payload() {
        let mut bytes = opening_snapshot().to_bytes();
        bytes.pop();

        assert!(matches!(
            Snapshot::from_bytes(&bytes),
            Err(SnapshotError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn rejects_owned_square_of_wrong_color() {
        let board = Board::new();
        let snapshot = Snapshot::new(
            board,
            &board.positions_of(Color::White),
            &board.positions_of(Color::White),
            Phase::Turn(Color::Black),
            0,
        );

        let err = Snapshot::from_bytes(&snapshot.to_bytes()).unwrap_err();

        assert!(err.to_string().contains("owns"));
    }

    #[test]
    fn rejects_owned_list_missing_a_disc() {
        let board = Board::new();
        let black = board.positions_of(Color::Black);
        let snapshot = Snapshot::new(
            board,
            &black[..1],
            &board.positions_of(Color::White),
            Phase::Turn(Color::Black),
            0,
        );
        assert!(!snapshot.is_consistent());

        let err = Snapshot::from_bytes(&snapshot.to_bytes()).unwrap_err();

        assert!(matches!(err, SnapshotError::Corrupt(_)));
        assert!(err.to_string().contains("holds 2 black discs"));
    }

    #[test]
    fn consistency_ignores_owned_order() {
        let mut snapshot = opening_snapshot();
        snapshot.black_owned.reverse();

        assert!(snapshot.is_consistent());
        assert!(opening_snapshot().is_consistent());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.otsav");
        let snapshot = opening_snapshot();

        save_to_file(&snapshot, &path).unwrap();

        assert_eq!(load_from_file(&path).unwrap(), snapshot);
    }

    #[test]
    fn loading_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();

        let err = load_from_file(&dir.path().join("missing.otsav")).unwrap_err();

        assert!(matches!(err, SnapshotError::Io(_)));
    }
}
