//! Static type tags and type descriptors.
//!
//! A `DataType` is the bare kind a type checker assigns to a parse node. A
//! `TypeDescr` adds the parameters some kinds carry (precision, scale, codeset,
//! collation, element types) and is what the domain resolver consumes.

use alloc::string::String;
use alloc::vec::Vec;

/// Largest precision a NUMERIC domain may carry.
pub const MAX_NUMERIC_PRECISION: u32 = 38;
/// Precision used for NUMERIC when none is declared.
pub const DEFAULT_NUMERIC_PRECISION: u32 = 15;
/// Scale used for NUMERIC when none is declared.
pub const DEFAULT_NUMERIC_SCALE: u16 = 0;
/// Largest character/bit string length.
pub const MAX_STRING_LENGTH: u32 = 1_073_741_823;

/// Static type tag of a parse node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    /// Type of the NULL literal.
    Null,
    /// Type not yet inferred; must be resolved before lowering.
    Maybe,
    /// Boolean result of a predicate.
    Logical,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Double,
    Numeric,
    Monetary,
    Char,
    VarChar,
    NChar,
    VarNChar,
    Bit,
    VarBit,
    Date,
    Time,
    Timestamp,
    DateTime,
    Set,
    MultiSet,
    Sequence,
    /// Object reference (instance OID).
    Object,
    /// Index key tuple built from several column values.
    KeyTuple,
}

impl DataType {
    /// Returns whether values of this kind are numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::SmallInt
                | DataType::Integer
                | DataType::BigInt
                | DataType::Float
                | DataType::Double
                | DataType::Numeric
                | DataType::Monetary
        )
    }

    /// Returns whether values of this kind are character strings.
    pub fn is_char_string(&self) -> bool {
        matches!(
            self,
            DataType::Char | DataType::VarChar | DataType::NChar | DataType::VarNChar
        )
    }

    /// Returns whether this kind uses the national character set.
    pub fn is_national(&self) -> bool {
        matches!(self, DataType::NChar | DataType::VarNChar)
    }

    /// Returns whether values of this kind are bit strings.
    pub fn is_bit_string(&self) -> bool {
        matches!(self, DataType::Bit | DataType::VarBit)
    }

    /// Returns whether values of this kind are dates or times.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            DataType::Date | DataType::Time | DataType::Timestamp | DataType::DateTime
        )
    }

    /// Returns whether values of this kind are collections.
    pub fn is_collection(&self) -> bool {
        matches!(self, DataType::Set | DataType::MultiSet | DataType::Sequence)
    }

    /// Returns whether this kind carries a precision parameter.
    pub fn is_parameterized(&self) -> bool {
        matches!(self, DataType::Numeric) || self.is_char_string() || self.is_bit_string()
    }

    /// Returns whether this kind is still awaiting inference.
    #[inline]
    pub fn is_unresolved(&self) -> bool {
        matches!(self, DataType::Maybe)
    }

    /// Default precision for a parameterized kind when none is declared.
    pub fn default_precision(&self) -> Option<u32> {
        match self {
            DataType::Numeric => Some(DEFAULT_NUMERIC_PRECISION),
            DataType::Char | DataType::NChar | DataType::Bit => Some(1),
            DataType::VarChar | DataType::VarNChar | DataType::VarBit => Some(MAX_STRING_LENGTH),
            _ => None,
        }
    }

    /// Maximum precision a parameterized kind accepts.
    pub fn max_precision(&self) -> Option<u32> {
        match self {
            DataType::Numeric => Some(MAX_NUMERIC_PRECISION),
            k if k.is_char_string() || k.is_bit_string() => Some(MAX_STRING_LENGTH),
            _ => None,
        }
    }

    /// Returns whether a value of kind `self` can be coerced to `target`
    /// without a run-time failure being certain.
    pub fn is_coercible_to(&self, target: DataType) -> bool {
        if *self == target || *self == DataType::Null || target == DataType::Maybe {
            return true;
        }
        match target {
            t if t.is_numeric() => {
                self.is_numeric() || self.is_char_string() || *self == DataType::Logical
            }
            t if t.is_char_string() => !self.is_collection() && *self != DataType::Object,
            t if t.is_bit_string() => self.is_bit_string() || self.is_char_string(),
            t if t.is_temporal() => self.is_temporal() || self.is_char_string(),
            t if t.is_collection() => self.is_collection(),
            DataType::Logical => self.is_numeric(),
            _ => false,
        }
    }
}

/// Character codeset of a string domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Codeset {
    #[default]
    Iso88591,
    Utf8,
    Ksc5601Euc,
    Binary,
}

/// Collation identifier, as recorded in the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct CollationId(pub u16);

impl CollationId {
    /// Binary collation.
    pub const BINARY: CollationId = CollationId(0);
}

/// Static type descriptor carried on a parse node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeDescr {
    /// Kind of the type.
    pub kind: DataType,
    /// Declared precision (length for strings).
    pub precision: Option<u32>,
    /// Declared scale.
    pub scale: Option<u16>,
    /// Codeset for string kinds.
    pub codeset: Codeset,
    /// Collation for string kinds.
    pub collation: CollationId,
    /// Element types of a collection kind.
    pub elements: Vec<TypeDescr>,
    /// Class name of an object kind.
    pub class_name: Option<String>,
}

impl TypeDescr {
    /// Creates a descriptor with no parameters.
    pub fn new(kind: DataType) -> Self {
        let codeset = if kind.is_national() {
            Codeset::Utf8
        } else {
            Codeset::default()
        };
        Self {
            kind,
            precision: None,
            scale: None,
            codeset,
            collation: CollationId::BINARY,
            elements: Vec::new(),
            class_name: None,
        }
    }

    /// Creates a NUMERIC descriptor.
    pub fn numeric(precision: u32, scale: u16) -> Self {
        Self::new(DataType::Numeric).precision(precision).scale(scale)
    }

    /// Creates a VARCHAR descriptor of the given length.
    pub fn varchar(length: u32) -> Self {
        Self::new(DataType::VarChar).precision(length)
    }

    /// Creates a collection descriptor.
    pub fn collection(kind: DataType, elements: Vec<TypeDescr>) -> Self {
        Self::new(kind).elements(elements)
    }

    /// Sets the precision.
    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Sets the scale.
    pub fn scale(mut self, scale: u16) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Sets the codeset.
    pub fn codeset(mut self, codeset: Codeset) -> Self {
        self.codeset = codeset;
        self
    }

    /// Sets the collation.
    pub fn collation(mut self, collation: CollationId) -> Self {
        self.collation = collation;
        self
    }

    /// Sets the element types.
    pub fn elements(mut self, elements: Vec<TypeDescr>) -> Self {
        self.elements = elements;
        self
    }

    /// Sets the class name for an object kind.
    pub fn class_name(mut self, name: impl Into<String>) -> Self {
        self.class_name = Some(name.into());
        self
    }

    /// Returns whether the descriptor (or any element type) awaits inference.
    pub fn is_unresolved(&self) -> bool {
        self.kind.is_unresolved() || self.elements.iter().any(TypeDescr::is_unresolved)
    }
}

impl From<DataType> for TypeDescr {
    fn from(kind: DataType) -> Self {
        TypeDescr::new(kind)
    }
}
