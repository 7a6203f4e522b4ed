//! Binary parser and address-indexed lookup for the debug database (§4.5,
//! §6: "Debug database file").
//!
//! The whole buffer is loaded once and kept around (§5: "owned by the
//! caller and must outlive the VM invocation; the VM treats it as
//! immutable"); every lookup re-parses the one record it needs out of that
//! buffer rather than pre-exploding everything into owned structures.

use crate::debug_db::entry::{Comment, DebugRecord, StorageClass, TypeTag, VariableLocation};
use thiserror::Error;

/// The only database format version this reader understands (§6: "The only
/// supported version is 4").
pub const SUPPORTED_VERSION: u64 = 4;

/// Failure modes specific to parsing a debug database (§7: "Debug DB
/// mismatch").
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DebugDbError {
    /// Fewer bytes than the fixed header requires.
    #[error("debug database truncated: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    /// `version != SUPPORTED_VERSION`.
    #[error("incompatible debug database: version {found}, only {SUPPORTED_VERSION} is supported")]
    IncompatibleVersion { found: u64 },
    /// An offset or count inside the file pointed outside the buffer.
    #[error("debug database corrupt: offset {offset} out of range")]
    CorruptOffset { offset: usize },
}

struct ByteReader<'b> {
    buf: &'b [u8],
    pos: usize,
}

impl<'b> ByteReader<'b> {
    fn new(buf: &'b [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn at(buf: &'b [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    fn u8(&mut self) -> Result<u8, DebugDbError> {
        let b = *self.buf.get(self.pos).ok_or(DebugDbError::CorruptOffset { offset: self.pos })?;
        self.pos += 1;
        Ok(b)
    }

    fn u64(&mut self) -> Result<u64, DebugDbError> {
        let end = self.pos + 8;
        let bytes = self
            .buf
            .get(self.pos..end)
            .ok_or(DebugDbError::CorruptOffset { offset: self.pos })?;
        self.pos = end;
        Ok(u64::from_le_bytes(bytes.try_into().expect("slice is exactly 8 bytes")))
    }

    fn c_string(&mut self) -> Result<String, DebugDbError> {
        let start = self.pos;
        let nul = self.buf[start..]
            .iter()
            .position(|b| *b == 0)
            .ok_or(DebugDbError::CorruptOffset { offset: start })?;
        let s = String::from_utf8_lossy(&self.buf[start..start + nul]).into_owned();
        self.pos = start + nul + 1;
        Ok(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EntryIdx {
    instruction_addr: u64,
    start_offset: u64,
}

/// A parsed, address-searchable debug database (§4.5).
pub struct DebugDatabase {
    buf: Vec<u8>,
    index: Vec<EntryIdx>,
    entries_base: usize,
}

impl DebugDatabase {
    /// Parse a database image. Only the fixed header and sorted index are
    /// validated eagerly; per-instruction records are parsed lazily on
    /// [`Self::lookup`].
    pub fn parse(buf: Vec<u8>) -> Result<Self, DebugDbError> {
        if buf.len() < 16 {
            return Err(DebugDbError::Truncated {
                expected: 16,
                actual: buf.len(),
            });
        }
        let mut r = ByteReader::new(&buf);
        let version = r.u64()?;
        if version != SUPPORTED_VERSION {
            return Err(DebugDbError::IncompatibleVersion { found: version });
        }
        let entry_count = r.u64()? as usize;

        let mut index = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            let instruction_addr = r.u64()?;
            let start_offset = r.u64()?;
            index.push(EntryIdx {
                instruction_addr,
                start_offset,
            });
        }
        let entries_base = r.pos;

        Ok(Self { buf, index, entries_base })
    }

    /// Parse a database image, emitting a one-shot `tracing::warn!` instead
    /// of a hard error on an incompatible version (§4.5: "produce a clear
    /// 'incompatible database' diagnostic once (not per-instruction)").
    /// Returns `None` when the version is unsupported; execution then
    /// proceeds without debug info (§7).
    pub fn load_or_warn(buf: Vec<u8>) -> Option<Self> {
        match Self::parse(buf) {
            Ok(db) => Some(db),
            Err(DebugDbError::IncompatibleVersion { found }) => {
                tracing::warn!(found, supported = SUPPORTED_VERSION, "incompatible debug database");
                None
            }
            Err(err) => {
                tracing::warn!(%err, "failed to load debug database");
                None
            }
        }
    }

    /// Binary-search the sorted index for `addr` and parse its record.
    pub fn lookup(&self, addr: u64) -> Result<Option<DebugRecord>, DebugDbError> {
        let found = self
            .index
            .binary_search_by_key(&addr, |e| e.instruction_addr)
            .ok();
        let Some(slot) = found else {
            return Ok(None);
        };
        let start = self.entries_base + self.index[slot].start_offset as usize;
        self.parse_record(start).map(Some)
    }

    fn parse_record(&self, start: usize) -> Result<DebugRecord, DebugDbError> {
        let mut r = ByteReader::at(&self.buf, start);
        let code_count = r.u64()? as usize;
        let comment_count = r.u64()? as usize;
        let variable_count = r.u64()? as usize;
        let total = code_count + comment_count + variable_count;

        let mut offsets = Vec::with_capacity(total);
        for _ in 0..total {
            offsets.push(r.u64()? as usize);
        }

        // Each record's string/variable offsets are relative to that
        // record's own data section, not the database-global entries
        // region (confirmed against `llshost.c`'s
        // `pEntry + entryDataOffset + pEntry->offsets[i]`): `data_base` is
        // this record's start plus its own three counts and offsets array.
        let data_base = r.pos;

        let mut code_fragments = Vec::with_capacity(code_count);
        for &off in &offsets[..code_count] {
            let mut field = ByteReader::at(&self.buf, data_base + off);
            code_fragments.push(field.c_string()?);
        }

        let mut comments = Vec::with_capacity(comment_count);
        for &off in &offsets[code_count..code_count + comment_count] {
            let mut field = ByteReader::at(&self.buf, data_base + off);
            comments.push(Comment::classify(field.c_string()?));
        }

        let mut variables = Vec::with_capacity(variable_count);
        for &off in &offsets[code_count + comment_count..] {
            let mut field = ByteReader::at(&self.buf, data_base + off);
            let type_tag = TypeTag::decode(field.u8()?);
            let position_type = field.u8()?;
            let storage_class = StorageClass::decode(position_type)
                .ok_or(DebugDbError::CorruptOffset { offset: data_base + off })?;
            let is_variable = field.u8()? != 0;
            let is_const = field.u8()? != 0;
            let is_static = field.u8()? != 0;
            let position = field.u64()?;
            let name = field.c_string()?;
            variables.push(VariableLocation {
                name,
                type_tag,
                storage_class,
                position,
                is_variable,
                is_const,
                is_static,
            });
        }

        Ok(DebugRecord {
            code_fragments,
            comments,
            variables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_db::entry::{CommentKind, Primitive};

    fn le(v: u64) -> [u8; 8] {
        v.to_le_bytes()
    }

    /// Build one self-contained record: three counts, three offsets (each
    /// relative to this record's own data section, i.e. to the position
    /// right after the offsets array — not to the record's start, and not
    /// to the database-global entries region), then the data itself.
    fn build_record(code: &str, comment: &str, var_name: &str, var_position: u64) -> Vec<u8> {
        let mut data = Vec::new();
        let code_off = data.len();
        data.extend_from_slice(code.as_bytes());
        data.push(0);

        let comment_off = data.len();
        data.extend_from_slice(comment.as_bytes());
        data.push(0);

        let var_off = data.len();
        data.push(6); // type_tag: Scalar(U64)
        data.push(1); // position_type: InRegister
        data.push(1); // is_variable
        data.push(0); // is_const
        data.push(0); // is_static
        data.extend(le(var_position));
        data.extend_from_slice(var_name.as_bytes());
        data.push(0);

        let mut record = Vec::new();
        record.extend(le(1)); // code_count
        record.extend(le(1)); // comment_count
        record.extend(le(1)); // variable_count
        record.extend(le(code_off as u64));
        record.extend(le(comment_off as u64));
        record.extend(le(var_off as u64));
        record.extend(data);
        record
    }

    fn build_minimal_db() -> Vec<u8> {
        // header
        let mut buf = Vec::new();
        buf.extend(le(SUPPORTED_VERSION));
        buf.extend(le(1)); // entry_count
                            // index: one entry at instruction_addr=100, start_offset=0
        buf.extend(le(100));
        buf.extend(le(0));

        buf.extend(build_record("x = 1;", "# a note", "counter", 3));
        buf
    }

    /// Two records back to back, the second at a nonzero `start_offset`
    /// (§4.5, the case the buggy `entries_base`-based resolver masked).
    fn build_two_entry_db() -> Vec<u8> {
        let record_a = build_record("x = 1;", "# a note", "counter", 3);
        let record_b = build_record("y = 2;", "# another note", "total", 7);

        let mut buf = Vec::new();
        buf.extend(le(SUPPORTED_VERSION));
        buf.extend(le(2)); // entry_count
        buf.extend(le(100));
        buf.extend(le(0));
        buf.extend(le(200));
        buf.extend(le(record_a.len() as u64));

        buf.extend(record_a);
        buf.extend(record_b);
        buf
    }

    #[test]
    fn parses_header_and_locates_entry_by_binary_search() {
        let db = DebugDatabase::parse(build_minimal_db()).unwrap();
        let record = db.lookup(100).unwrap().unwrap();
        assert_eq!(record.code_fragments, vec!["x = 1;".to_string()]);
        assert_eq!(record.comments[0].kind, CommentKind::Note);
        assert_eq!(record.variables[0].name, "counter");
        assert_eq!(record.variables[0].type_tag, TypeTag::Scalar(Primitive::U64));
        assert!(record.is_line_end());
    }

    #[test]
    fn second_entry_at_nonzero_start_offset_resolves_its_own_fields() {
        let db = DebugDatabase::parse(build_two_entry_db()).unwrap();

        let first = db.lookup(100).unwrap().unwrap();
        assert_eq!(first.code_fragments, vec!["x = 1;".to_string()]);
        assert_eq!(first.variables[0].name, "counter");

        let second = db.lookup(200).unwrap().unwrap();
        assert_eq!(second.code_fragments, vec!["y = 2;".to_string()]);
        assert_eq!(second.comments[0].text, "# another note");
        assert_eq!(second.variables[0].name, "total");
        assert_eq!(second.variables[0].position, 7);
    }

    #[test]
    fn missing_address_is_a_clean_miss_not_an_error() {
        let db = DebugDatabase::parse(build_minimal_db()).unwrap();
        assert_eq!(db.lookup(999).unwrap(), None);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut buf = Vec::new();
        buf.extend(le(3));
        buf.extend(le(0));
        assert_eq!(
            DebugDatabase::parse(buf),
            Err(DebugDbError::IncompatibleVersion { found: 3 })
        );
    }

    #[test]
    fn load_or_warn_returns_none_on_incompatible_version() {
        let mut buf = Vec::new();
        buf.extend(le(1));
        buf.extend(le(0));
        assert!(DebugDatabase::load_or_warn(buf).is_none());
    }
}
