//! Conversion Error Types
//!
//! Structural errors that abort the translation of a single unit. Advisory
//! conditions (missing optional attributes, out-of-range values) are logged
//! and never surface here.

use thiserror::Error;

/// Result type for hnz-pivot-model operations
pub type Result<T> = std::result::Result<T, ConversionError>;

/// Fatal conversion errors
///
/// Any of these drops the offending unit from the output; the surrounding
/// batch keeps going.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// Unit is not a pivot object (root not named `PIVOT`)
    #[error("no pivot object")]
    NotAPivot,

    /// A node expected to carry an attribute dictionary carries a scalar
    #[error("{0} is not an attribute dictionary")]
    NotADictionary(String),

    /// None of the children of `PIVOT` is a known logical-node class
    #[error("pivot object type not supported: {0}")]
    UnknownPivotClass(String),

    /// None of the children of the logical node is a known common-data-class
    #[error("CDC type unknown: {0}")]
    UnknownCdc(String),

    /// Common-data-class not allowed under this logical-node class
    #[error("CDC type {cdc} not allowed for class {class}")]
    CdcClassMismatch { cdc: String, class: String },

    /// Required child attribute absent
    #[error("no such child: {0}")]
    MissingChild(String),

    /// Attribute present with the wrong payload kind
    #[error("attribute {name} does not carry {expected} value")]
    WrongValueType { name: String, expected: &'static str },

    /// A string-enum attribute carries an unknown value
    #[error("{field} has invalid value: {value}")]
    InvalidEnumValue { field: String, value: String },

    /// Measured value without `mag.i` or `mag.f`
    #[error("MvTyp has no mag.i or mag.f value")]
    MissingMagnitude,

    /// Required legacy attribute absent
    #[error("missing attribute {0}")]
    MissingAttribute(&'static str),

    /// Legacy message type not part of the exchange
    #[error("unknown do_type: {0}")]
    UnknownTypeCode(String),

    /// No exchange definition bound to this message type and address
    #[error("no pivot ID configured for typeid {type_code} and address {address}")]
    UnmappedAddress { type_code: String, address: u32 },

    /// Identifier absent from the exchange directory
    #[error("unknown pivot ID: {pivot_id} (available: {known})")]
    UnknownPivotId { pivot_id: String, known: String },

    /// Configured common-data-class incompatible with the message type
    #[error("invalid pivot type ({pivot_type}) for data object type ({type_code})")]
    PivotTypeMismatch {
        pivot_type: String,
        type_code: String,
    },
}
