//! The cmm type system.
//!
//! Provides the set of types the lowering pass inspects: the scalar integer
//! type, fixed-size arrays (multi-dimensional arrays nest), named structs
//! with insertion-ordered fields, and function signatures.
//!
//! All types use nominal identity via [`TypeId`]. Structs use [`IndexMap`]
//! for their fields so that declaration order — and therefore member byte
//! offsets — is preserved.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::type_id::TypeId;

/// Machine word size in bytes. Scalars occupy one word; aggregate copies
/// proceed one word at a time.
pub const WORD_SIZE: u32 = 4;

/// The cmm type system. Each variant represents a distinct kind of type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Ty {
    /// The scalar integer type (one word).
    Int,

    /// Fixed-size array: `element[length]`. Multi-dimensional arrays are
    /// arrays whose element type is itself an array.
    Array { element: TypeId, length: u32 },

    /// Named struct with ordered fields (nominal typing).
    Struct(StructDef),

    /// Function signature.
    Function {
        params: Vec<TypeId>,
        return_type: TypeId,
    },
}

impl Ty {
    /// Returns `true` for array and struct types — values that live in
    /// reserved storage and are handled by address.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Ty::Array { .. } | Ty::Struct(_))
    }

    /// Returns `true` for the scalar integer type.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Ty::Int)
    }
}

/// Named struct definition with insertion-ordered fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    pub fields: IndexMap<String, TypeId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_predicates() {
        let arr = Ty::Array {
            element: TypeId::INT,
            length: 10,
        };
        let st = Ty::Struct(StructDef {
            name: "Point".into(),
            fields: IndexMap::from([("x".into(), TypeId::INT), ("y".into(), TypeId::INT)]),
        });
        let func = Ty::Function {
            params: vec![TypeId::INT],
            return_type: TypeId::INT,
        };

        assert!(arr.is_aggregate());
        assert!(st.is_aggregate());
        assert!(!Ty::Int.is_aggregate());
        assert!(!func.is_aggregate());
        assert!(Ty::Int.is_scalar());
        assert!(!arr.is_scalar());
    }

    #[test]
    fn struct_def_preserves_field_order() {
        let mut fields = IndexMap::new();
        fields.insert("z".to_string(), TypeId::INT);
        fields.insert("a".to_string(), TypeId::INT);
        fields.insert("m".to_string(), TypeId::INT);

        let sd = StructDef {
            name: "Ordered".into(),
            fields,
        };

        let keys: Vec<&str> = sd.fields.keys().map(|s| s.as_str()).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn serde_roundtrip_struct_def() {
        let ty = Ty::Struct(StructDef {
            name: "Pair".into(),
            fields: IndexMap::from([("first".into(), TypeId::INT), ("second".into(), TypeId::INT)]),
        });

        let json = serde_json::to_string(&ty).unwrap();
        let back: Ty = serde_json::from_str(&json).unwrap();
        assert_eq!(ty, back);
    }
}
