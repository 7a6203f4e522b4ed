//! The parsed shape of one debug-database record (§6: "Debug database
//! file").

/// One scalar/pointer/array data-type tag a [`VariableLocation`] can carry
/// (§3: "Data-type tag enumerates scalar, pointer-to-scalar, and
/// array-of-scalar for the set {u8,i8,...,f64} plus a fallback Other").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum TypeTag {
    /// A plain scalar of the named primitive.
    Scalar(Primitive),
    /// A pointer to a scalar of the named primitive.
    PointerToScalar(Primitive),
    /// An array of scalars of the named primitive.
    ArrayOfScalar(Primitive),
    /// Anything the database doesn't tag more specifically.
    Other,
}

/// The primitive element type underlying a [`TypeTag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[allow(missing_docs)]
pub enum Primitive {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl TypeTag {
    pub(super) fn decode(raw: u8) -> Self {
        use Primitive::*;
        let primitive = |p: u8| match p {
            0 => U8,
            1 => I8,
            2 => U16,
            3 => I16,
            4 => U32,
            5 => I32,
            6 => U64,
            7 => I64,
            8 => F32,
            _ => F64,
        };
        match raw {
            0..=9 => Self::Scalar(primitive(raw)),
            10..=19 => Self::PointerToScalar(primitive(raw - 10)),
            20..=29 => Self::ArrayOfScalar(primitive(raw - 20)),
            _ => Self::Other,
        }
    }
}

/// Where a variable's storage lives (§3: "Variable storage class").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// `position` is a register index `0..16`.
    InRegister,
    /// `position` is a `sp`-relative offset, meaningful at the current call
    /// depth only.
    OnStack,
    /// `position` is an offset from the stack's base address, valid at any
    /// depth.
    GlobalStackOffset,
    /// `position` is an offset from the code image's base address.
    CodeBaseOffset,
}

impl StorageClass {
    pub(super) fn decode(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::InRegister),
            2 => Some(Self::OnStack),
            3 => Some(Self::GlobalStackOffset),
            4 => Some(Self::CodeBaseOffset),
            _ => None,
        }
    }
}

/// A single variable descriptor attached to an instruction (§3, §6).
#[derive(Debug, Clone, PartialEq)]
pub struct VariableLocation {
    pub name: String,
    pub type_tag: TypeTag,
    pub storage_class: StorageClass,
    pub position: u64,
    pub is_variable: bool,
    pub is_const: bool,
    pub is_static: bool,
}

/// A rendered comment line (§4.5: "first character '#' => indented note;
/// else => label banner").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    /// An indented note (source began with `#`).
    Note,
    /// A label banner, rendered differently from a note.
    Label,
}

/// One comment string plus how the UI should render it.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub kind: CommentKind,
    pub text: String,
}

impl Comment {
    pub(super) fn classify(text: String) -> Self {
        let kind = if text.starts_with('#') {
            CommentKind::Note
        } else {
            CommentKind::Label
        };
        Self { kind, text }
    }
}

/// The full per-instruction record a database lookup resolves to (§4.5).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DebugRecord {
    pub code_fragments: Vec<String>,
    pub comments: Vec<Comment>,
    pub variables: Vec<VariableLocation>,
}

impl DebugRecord {
    /// Whether this instruction is a line-end for the `l` stepping command
    /// (§4.6: "A line-end instruction is any instruction whose debug record
    /// has at least one source-code fragment").
    pub fn is_line_end(&self) -> bool {
        !self.code_fragments.is_empty()
    }
}
