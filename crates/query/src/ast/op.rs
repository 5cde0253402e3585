//! Operator codes.
//!
//! One code per operator the type checker can leave in an expression, plus
//! the explicit tables the lowerers consult: operand arity, operand-swap
//! inverse (`converse`), logical negation (`negate`) and the mapping onto
//! index range kinds.

use crate::keyrange::RangeKind;
use alloc::vec::Vec;
use core::fmt;

/// Operator code of an expression node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpCode {
    // Logical
    And,
    Or,
    Not,
    Xor,
    // Comparison
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    NullsafeEq,
    // Set relation
    SetEq,
    SetNe,
    Superset,
    SupersetEq,
    Subset,
    SubsetEq,
    // Between family
    Between,
    NotBetween,
    BetweenAnd,
    BetweenGeLe,
    BetweenGeLt,
    BetweenGtLe,
    BetweenGtLt,
    BetweenEqNa,
    BetweenInfLe,
    BetweenInfLt,
    BetweenGeInf,
    BetweenGtInf,
    Range,
    // Membership and existence
    IsIn,
    IsNotIn,
    Exists,
    IsNull,
    IsNotNull,
    // Quantified
    EqSome,
    NeSome,
    GtSome,
    GeSome,
    LtSome,
    LeSome,
    EqAll,
    NeAll,
    GtAll,
    GeAll,
    LtAll,
    LeAll,
    // Pattern matching
    Like,
    NotLike,
    LikeEscape,
    Rlike,
    NotRlike,
    RlikeBinary,
    NotRlikeBinary,
    // Arithmetic
    Plus,
    Minus,
    Times,
    Divide,
    IntDiv,
    Modulus,
    UnaryMinus,
    Power,
    Round,
    Log,
    Ln,
    Log2,
    Log10,
    Exp,
    Sqrt,
    Trunc,
    Abs,
    Floor,
    Ceil,
    Sign,
    Pi,
    Sin,
    Cos,
    Tan,
    Cot,
    Asin,
    Acos,
    Atan,
    Atan2,
    Degrees,
    Radians,
    Rand,
    DRand,
    Random,
    DRandom,
    // Bitwise
    BitNot,
    BitAnd,
    BitOr,
    BitXor,
    BitShiftLeft,
    BitShiftRight,
    BitCount,
    // String
    Position,
    Instr,
    Substring,
    OctetLength,
    BitLength,
    CharLength,
    Lower,
    Upper,
    Trim,
    LTrim,
    RTrim,
    LPad,
    RPad,
    Replace,
    Translate,
    StrCat,
    Chr,
    Repeat,
    Space,
    Reverse,
    Left,
    Right,
    Encrypt,
    Decrypt,
    Md5,
    // Date and time
    AddMonths,
    LastDay,
    MonthsBetween,
    SysDate,
    SysTime,
    SysTimestamp,
    SysDatetime,
    Extract,
    // Conversion
    ToChar,
    ToDate,
    ToTime,
    ToTimestamp,
    ToNumber,
    Cast,
    // Conditional
    Case,
    Decode,
    If,
    IfNull,
    Nvl,
    Nvl2,
    NullIf,
    Coalesce,
    Least,
    Greatest,
    // Serials and counters
    CurrentValue,
    NextValue,
    Incr,
    Decr,
    // Numbering pseudo-columns
    InstNum,
    RowNum,
    OrderByNum,
    GroupByNum,
    // System values
    LocalTransactionId,
    CurrentUser,
}

/// Number of operands a value operator lowers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Nullary,
    Unary,
    Binary,
    Ternary,
}

impl Arity {
    /// Operand count.
    pub fn count(&self) -> usize {
        match self {
            Arity::Nullary => 0,
            Arity::Unary => 1,
            Arity::Binary => 2,
            Arity::Ternary => 3,
        }
    }
}

impl OpCode {
    /// Every operator code.
    pub const ALL: &'static [OpCode] = &[
        OpCode::And,
        OpCode::Or,
        OpCode::Not,
        OpCode::Xor,
        OpCode::Eq,
        OpCode::Ne,
        OpCode::Gt,
        OpCode::Ge,
        OpCode::Lt,
        OpCode::Le,
        OpCode::NullsafeEq,
        OpCode::SetEq,
        OpCode::SetNe,
        OpCode::Superset,
        OpCode::SupersetEq,
        OpCode::Subset,
        OpCode::SubsetEq,
        OpCode::Between,
        OpCode::NotBetween,
        OpCode::BetweenAnd,
        OpCode::BetweenGeLe,
        OpCode::BetweenGeLt,
        OpCode::BetweenGtLe,
        OpCode::BetweenGtLt,
        OpCode::BetweenEqNa,
        OpCode::BetweenInfLe,
        OpCode::BetweenInfLt,
        OpCode::BetweenGeInf,
        OpCode::BetweenGtInf,
        OpCode::Range,
        OpCode::IsIn,
        OpCode::IsNotIn,
        OpCode::Exists,
        OpCode::IsNull,
        OpCode::IsNotNull,
        OpCode::EqSome,
        OpCode::NeSome,
        OpCode::GtSome,
        OpCode::GeSome,
        OpCode::LtSome,
        OpCode::LeSome,
        OpCode::EqAll,
        OpCode::NeAll,
        OpCode::GtAll,
        OpCode::GeAll,
        OpCode::LtAll,
        OpCode::LeAll,
        OpCode::Like,
        OpCode::NotLike,
        OpCode::LikeEscape,
        OpCode::Rlike,
        OpCode::NotRlike,
        OpCode::RlikeBinary,
        OpCode::NotRlikeBinary,
        OpCode::Plus,
        OpCode::Minus,
        OpCode::Times,
        OpCode::Divide,
        OpCode::IntDiv,
        OpCode::Modulus,
        OpCode::UnaryMinus,
        OpCode::Power,
        OpCode::Round,
        OpCode::Log,
        OpCode::Ln,
        OpCode::Log2,
        OpCode::Log10,
        OpCode::Exp,
        OpCode::Sqrt,
        OpCode::Trunc,
        OpCode::Abs,
        OpCode::Floor,
        OpCode::Ceil,
        OpCode::Sign,
        OpCode::Pi,
        OpCode::Sin,
        OpCode::Cos,
        OpCode::Tan,
        OpCode::Cot,
        OpCode::Asin,
        OpCode::Acos,
        OpCode::Atan,
        OpCode::Atan2,
        OpCode::Degrees,
        OpCode::Radians,
        OpCode::Rand,
        OpCode::DRand,
        OpCode::Random,
        OpCode::DRandom,
        OpCode::BitNot,
        OpCode::BitAnd,
        OpCode::BitOr,
        OpCode::BitXor,
        OpCode::BitShiftLeft,
        OpCode::BitShiftRight,
        OpCode::BitCount,
        OpCode::Position,
        OpCode::Instr,
        OpCode::Substring,
        OpCode::OctetLength,
        OpCode::BitLength,
        OpCode::CharLength,
        OpCode::Lower,
        OpCode::Upper,
        OpCode::Trim,
        OpCode::LTrim,
        OpCode::RTrim,
        OpCode::LPad,
        OpCode::RPad,
        OpCode::Replace,
        OpCode::Translate,
        OpCode::StrCat,
        OpCode::Chr,
        OpCode::Repeat,
        OpCode::Space,
        OpCode::Reverse,
        OpCode::Left,
        OpCode::Right,
        OpCode::Encrypt,
        OpCode::Decrypt,
        OpCode::Md5,
        OpCode::AddMonths,
        OpCode::LastDay,
        OpCode::MonthsBetween,
        OpCode::SysDate,
        OpCode::SysTime,
        OpCode::SysTimestamp,
        OpCode::SysDatetime,
        OpCode::Extract,
        OpCode::ToChar,
        OpCode::ToDate,
        OpCode::ToTime,
        OpCode::ToTimestamp,
        OpCode::ToNumber,
        OpCode::Cast,
        OpCode::Case,
        OpCode::Decode,
        OpCode::If,
        OpCode::IfNull,
        OpCode::Nvl,
        OpCode::Nvl2,
        OpCode::NullIf,
        OpCode::Coalesce,
        OpCode::Least,
        OpCode::Greatest,
        OpCode::CurrentValue,
        OpCode::NextValue,
        OpCode::Incr,
        OpCode::Decr,
        OpCode::InstNum,
        OpCode::RowNum,
        OpCode::OrderByNum,
        OpCode::GroupByNum,
        OpCode::LocalTransactionId,
        OpCode::CurrentUser,
    ];

    /// Returns whether the operator is AND, OR, NOT or XOR.
    pub fn is_logical(&self) -> bool {
        matches!(self, OpCode::And | OpCode::Or | OpCode::Not | OpCode::Xor)
    }

    /// Returns whether the operator is a scalar comparison.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            OpCode::Eq
                | OpCode::Ne
                | OpCode::Gt
                | OpCode::Ge
                | OpCode::Lt
                | OpCode::Le
                | OpCode::NullsafeEq
        )
    }

    /// Returns whether the operator compares two collections.
    pub fn is_set_relation(&self) -> bool {
        matches!(
            self,
            OpCode::SetEq
                | OpCode::SetNe
                | OpCode::Superset
                | OpCode::SupersetEq
                | OpCode::Subset
                | OpCode::SubsetEq
        )
    }

    /// Returns whether the operator belongs to the BETWEEN family.
    pub fn is_between(&self) -> bool {
        matches!(
            self,
            OpCode::Between
                | OpCode::NotBetween
                | OpCode::BetweenAnd
                | OpCode::Range
        ) || self.is_range_bound()
    }

    /// Returns whether the operator describes one sub-range of a RANGE term.
    pub fn is_range_bound(&self) -> bool {
        matches!(
            self,
            OpCode::BetweenGeLe
                | OpCode::BetweenGeLt
                | OpCode::BetweenGtLe
                | OpCode::BetweenGtLt
                | OpCode::BetweenEqNa
                | OpCode::BetweenInfLe
                | OpCode::BetweenInfLt
                | OpCode::BetweenGeInf
                | OpCode::BetweenGtInf
        )
    }

    /// Returns whether the operator is a SOME/ALL comparison or IN.
    pub fn is_quantified(&self) -> bool {
        matches!(
            self,
            OpCode::EqSome
                | OpCode::NeSome
                | OpCode::GtSome
                | OpCode::GeSome
                | OpCode::LtSome
                | OpCode::LeSome
                | OpCode::EqAll
                | OpCode::NeAll
                | OpCode::GtAll
                | OpCode::GeAll
                | OpCode::LtAll
                | OpCode::LeAll
                | OpCode::IsIn
                | OpCode::IsNotIn
        )
    }

    /// Returns whether the operator is a LIKE or regular-expression match.
    pub fn is_pattern(&self) -> bool {
        matches!(
            self,
            OpCode::Like
                | OpCode::NotLike
                | OpCode::Rlike
                | OpCode::NotRlike
                | OpCode::RlikeBinary
                | OpCode::NotRlikeBinary
        )
    }

    /// Returns whether the operator reads a row-numbering counter.
    pub fn is_numbering(&self) -> bool {
        matches!(
            self,
            OpCode::InstNum | OpCode::RowNum | OpCode::OrderByNum | OpCode::GroupByNum
        )
    }

    /// Returns whether the operator yields a truth value and lowers to a
    /// predicate term.
    pub fn is_predicate(&self) -> bool {
        self.is_logical()
            || self.is_comparison()
            || self.is_set_relation()
            || self.is_between()
            || self.is_quantified()
            || self.is_pattern()
            || matches!(self, OpCode::Exists | OpCode::IsNull | OpCode::IsNotNull)
    }

    /// Operand count of a value operator, or `None` for predicates and
    /// operators with dedicated lowering (numbering, serials, CURRENT_USER).
    pub fn arity(&self) -> Option<Arity> {
        use OpCode::*;
        let arity = match self {
            Pi | Rand | DRand | SysDate | SysTime | SysTimestamp | SysDatetime
            | LocalTransactionId => Arity::Nullary,

            UnaryMinus | Random | DRandom | Floor | Ceil | Sign | Exp | Sqrt | Abs | Ln
            | Log2 | Log10 | Sin | Cos | Tan | Cot | Asin | Acos | Atan | Degrees | Radians
            | BitNot | BitCount | Chr | OctetLength | BitLength | CharLength | Lower | Upper
            | Space | Reverse | Md5 | LastDay | Cast | Extract | Encrypt | Decrypt => Arity::Unary,

            Plus | Minus | Times | Divide | IntDiv | Modulus | Power | Round | Log | Trunc
            | Atan2 | BitAnd | BitOr | BitXor | BitShiftLeft | BitShiftRight | Position
            | Trim | LTrim | RTrim | StrCat | Repeat | Left | Right | AddMonths
            | MonthsBetween | Case | Decode | IfNull | Nvl | NullIf | Coalesce | Least
            | Greatest => Arity::Binary,

            Incr | Decr | Instr | Substring | LPad | RPad | Replace | Translate | ToChar
            | ToDate | ToTime | ToTimestamp | ToNumber | Nvl2 | If => Arity::Ternary,

            _ => return None,
        };
        Some(arity)
    }

    /// Operator obtained by swapping the two operands, if one exists.
    ///
    /// `a op b` holds exactly when `b op.converse() a` holds. For the
    /// range-bound codes the converse mirrors the bound kinds, so a range read
    /// from the other end keeps its meaning.
    pub fn converse(&self) -> Option<OpCode> {
        use OpCode::*;
        let op = match self {
            Eq => Eq,
            Ne => Ne,
            NullsafeEq => NullsafeEq,
            Lt => Gt,
            Le => Ge,
            Gt => Lt,
            Ge => Le,
            SetEq => SetEq,
            SetNe => SetNe,
            Subset => Superset,
            SubsetEq => SupersetEq,
            Superset => Subset,
            SupersetEq => SubsetEq,
            BetweenGeLe => BetweenGeLe,
            BetweenGtLt => BetweenGtLt,
            BetweenGeLt => BetweenGtLe,
            BetweenGtLe => BetweenGeLt,
            BetweenInfLe => BetweenGeInf,
            BetweenGeInf => BetweenInfLe,
            BetweenInfLt => BetweenGtInf,
            BetweenGtInf => BetweenInfLt,
            BetweenEqNa => BetweenEqNa,
            And => And,
            Or => Or,
            Xor => Xor,
            _ => return None,
        };
        Some(op)
    }

    /// Operator whose result is the logical negation of this one, if any.
    pub fn negate(&self) -> Option<OpCode> {
        use OpCode::*;
        let op = match self {
            Eq => Ne,
            Ne => Eq,
            Gt => Le,
            Ge => Lt,
            Lt => Ge,
            Le => Gt,
            SetEq => SetNe,
            SetNe => SetEq,
            Between => NotBetween,
            NotBetween => Between,
            IsIn => IsNotIn,
            IsNotIn => IsIn,
            Like => NotLike,
            NotLike => Like,
            Rlike => NotRlike,
            NotRlike => Rlike,
            RlikeBinary => NotRlikeBinary,
            NotRlikeBinary => RlikeBinary,
            IsNull => IsNotNull,
            IsNotNull => IsNull,
            EqSome => NeAll,
            NeSome => EqAll,
            GtSome => LeAll,
            GeSome => LtAll,
            LtSome => GeAll,
            LeSome => GtAll,
            EqAll => NeSome,
            NeAll => EqSome,
            GtAll => LeSome,
            GeAll => LtSome,
            LtAll => GeSome,
            LeAll => GtSome,
            _ => return None,
        };
        Some(op)
    }

    /// Operators for which no operand-swap inverse exists.
    pub fn without_converse() -> Vec<OpCode> {
        Self::ALL
            .iter()
            .copied()
            .filter(|op| op.converse().is_none())
            .collect()
    }

    /// Index range kind of a key term using this operator.
    ///
    /// Over a multi-column key an open side is closed against the equality
    /// prefix, so `>` becomes `GT_LE` rather than `GT_INF`.
    pub fn range_kind(&self, multi_column: bool) -> Option<RangeKind> {
        use OpCode::*;
        let kind = match (self, multi_column) {
            (Eq | EqSome | IsIn | BetweenEqNa, _) => RangeKind::EqNa,
            (Gt | BetweenGtInf, true) => RangeKind::GtLe,
            (Gt | BetweenGtInf, false) => RangeKind::GtInf,
            (Ge | BetweenGeInf, true) => RangeKind::GeLe,
            (Ge | BetweenGeInf, false) => RangeKind::GeInf,
            (Lt | BetweenInfLt, true) => RangeKind::GeLt,
            (Lt | BetweenInfLt, false) => RangeKind::InfLt,
            (Le | BetweenInfLe, true) => RangeKind::GeLe,
            (Le | BetweenInfLe, false) => RangeKind::InfLe,
            (Between | BetweenAnd | BetweenGeLe, _) => RangeKind::GeLe,
            (BetweenGeLt, _) => RangeKind::GeLt,
            (BetweenGtLe, _) => RangeKind::GtLe,
            (BetweenGtLt, _) => RangeKind::GtLt,
            _ => return None,
        };
        Some(kind)
    }

    /// SQL spelling used in diagnostics.
    pub fn symbol(&self) -> Option<&'static str> {
        use OpCode::*;
        let s = match self {
            And => "AND",
            Or => "OR",
            Not => "NOT",
            Xor => "XOR",
            Eq => "=",
            Ne => "<>",
            Gt => ">",
            Ge => ">=",
            Lt => "<",
            Le => "<=",
            NullsafeEq => "<=>",
            Plus => "+",
            Minus => "-",
            Times => "*",
            Divide => "/",
            Modulus => "%",
            StrCat => "||",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            BitShiftLeft => "<<",
            BitShiftRight => ">>",
            BitNot => "~",
            _ => return None,
        };
        Some(s)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol() {
            Some(s) => f.write_str(s),
            None => write!(f, "{:?}", self),
        }
    }
}
