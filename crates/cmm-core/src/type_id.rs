//! TypeId and TypeRegistry for nominal typing, plus the byte-size oracle.
//!
//! Every type has a unique [`TypeId`] providing O(1) identity comparison.
//! The [`TypeRegistry`] manages registration and lookup, pre-registering the
//! scalar integer type on construction, and answers the size questions the
//! lowering pass asks: `size_of` for `DEC` reservations and copy lengths,
//! `field_offset` for struct member addressing.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Ty, WORD_SIZE};

/// Unique identifier for a type in the type registry.
///
/// The inner value is an index into the [`TypeRegistry`]'s type vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Pre-registered TypeId constants for built-in types.
impl TypeId {
    /// The scalar integer type.
    pub const INT: TypeId = TypeId(0);
}

/// Registry of all types in a program, providing nominal identity via
/// [`TypeId`].
///
/// On construction, the registry pre-registers `TypeId(0)` = Int.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRegistry {
    /// Types indexed by TypeId.0
    types: Vec<Ty>,
    /// Named type lookup (for structs)
    names: HashMap<String, TypeId>,
}

impl TypeRegistry {
    /// Creates a new type registry with the scalar integer type
    /// pre-registered as [`TypeId::INT`].
    pub fn new() -> Self {
        TypeRegistry {
            types: vec![Ty::Int],
            names: HashMap::new(),
        }
    }

    /// Registers a type and returns its new [`TypeId`].
    ///
    /// The type is added without a name. Use [`register_named`](Self::register_named)
    /// for named types (structs).
    pub fn register(&mut self, ty: Ty) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    /// Registers a named type, returning its [`TypeId`].
    ///
    /// Returns [`CoreError::DuplicateTypeName`] if a type with the same name
    /// already exists.
    pub fn register_named(&mut self, name: &str, ty: Ty) -> Result<TypeId, CoreError> {
        if self.names.contains_key(name) {
            return Err(CoreError::DuplicateTypeName {
                name: name.to_string(),
            });
        }
        let id = self.register(ty);
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Looks up a type by its [`TypeId`].
    pub fn get(&self, id: TypeId) -> Option<&Ty> {
        self.types.get(id.0 as usize)
    }

    /// Looks up a type, returning [`CoreError::TypeNotFound`] when absent.
    pub fn resolve(&self, id: TypeId) -> Result<&Ty, CoreError> {
        self.get(id).ok_or(CoreError::TypeNotFound { id })
    }

    /// Looks up a named type's [`TypeId`] by name.
    pub fn get_by_name(&self, name: &str) -> Option<TypeId> {
        self.names.get(name).copied()
    }

    /// Returns `true` if `id` names an array or struct type.
    pub fn is_aggregate(&self, id: TypeId) -> bool {
        self.get(id).is_some_and(Ty::is_aggregate)
    }

    /// Byte size of a type: a scalar is one word, an array is
    /// `length * size_of(element)`, a struct is the sum of its field sizes.
    ///
    /// Function types occupy no storage and report size 0.
    pub fn size_of(&self, id: TypeId) -> Result<u32, CoreError> {
        match self.resolve(id)? {
            Ty::Int => Ok(WORD_SIZE),
            Ty::Array { element, length } => Ok(length * self.size_of(*element)?),
            Ty::Struct(def) => {
                let mut total = 0;
                for field_ty in def.fields.values() {
                    total += self.size_of(*field_ty)?;
                }
                Ok(total)
            }
            Ty::Function { .. } => Ok(0),
        }
    }

    /// Byte offset of `field` within the struct type `id`: the sum of the
    /// sizes of all fields declared before it.
    pub fn field_offset(&self, id: TypeId, field: &str) -> Result<u32, CoreError> {
        let Ty::Struct(def) = self.resolve(id)? else {
            return Err(CoreError::NotAStruct { id });
        };
        let mut offset = 0;
        for (name, field_ty) in &def.fields {
            if name == field {
                return Ok(offset);
            }
            offset += self.size_of(*field_ty)?;
        }
        Err(CoreError::FieldNotFound {
            field: field.to_string(),
        })
    }

    /// Type of `field` within the struct type `id`.
    pub fn field_type(&self, id: TypeId, field: &str) -> Result<TypeId, CoreError> {
        let Ty::Struct(def) = self.resolve(id)? else {
            return Err(CoreError::NotAStruct { id });
        };
        def.fields
            .get(field)
            .copied()
            .ok_or_else(|| CoreError::FieldNotFound {
                field: field.to_string(),
            })
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StructDef;
    use indexmap::IndexMap;

    #[test]
    fn int_is_preregistered() {
        let reg = TypeRegistry::new();
        assert_eq!(reg.get(TypeId::INT), Some(&Ty::Int));
        assert_eq!(reg.size_of(TypeId::INT).unwrap(), 4);
    }

    #[test]
    fn array_size_is_length_times_element() {
        let mut reg = TypeRegistry::new();
        let arr = reg.register(Ty::Array {
            element: TypeId::INT,
            length: 10,
        });
        assert_eq!(reg.size_of(arr).unwrap(), 40);

        // int[3][4] as array of arrays
        let inner = reg.register(Ty::Array {
            element: TypeId::INT,
            length: 4,
        });
        let outer = reg.register(Ty::Array {
            element: inner,
            length: 3,
        });
        assert_eq!(reg.size_of(outer).unwrap(), 48);
    }

    #[test]
    fn struct_size_and_field_offsets() {
        let mut reg = TypeRegistry::new();
        let arr = reg.register(Ty::Array {
            element: TypeId::INT,
            length: 2,
        });
        let st = reg
            .register_named(
                "Rec",
                Ty::Struct(StructDef {
                    name: "Rec".into(),
                    fields: IndexMap::from([
                        ("a".into(), TypeId::INT),
                        ("v".into(), arr),
                        ("b".into(), TypeId::INT),
                    ]),
                }),
            )
            .unwrap();

        assert_eq!(reg.size_of(st).unwrap(), 16);
        assert_eq!(reg.field_offset(st, "a").unwrap(), 0);
        assert_eq!(reg.field_offset(st, "v").unwrap(), 4);
        assert_eq!(reg.field_offset(st, "b").unwrap(), 12);
        assert_eq!(reg.field_type(st, "v").unwrap(), arr);
        assert!(matches!(
            reg.field_offset(st, "missing"),
            Err(CoreError::FieldNotFound { .. })
        ));
        assert!(matches!(
            reg.field_offset(TypeId::INT, "a"),
            Err(CoreError::NotAStruct { .. })
        ));
    }

    #[test]
    fn duplicate_named_type_is_rejected() {
        let mut reg = TypeRegistry::new();
        let def = Ty::Struct(StructDef {
            name: "S".into(),
            fields: IndexMap::new(),
        });
        reg.register_named("S", def.clone()).unwrap();
        assert!(matches!(
            reg.register_named("S", def),
            Err(CoreError::DuplicateTypeName { .. })
        ));
    }

    #[test]
    fn aggregate_predicate_on_registry() {
        let mut reg = TypeRegistry::new();
        let arr = reg.register(Ty::Array {
            element: TypeId::INT,
            length: 1,
        });
        assert!(reg.is_aggregate(arr));
        assert!(!reg.is_aggregate(TypeId::INT));
        assert!(!reg.is_aggregate(TypeId(999)));
    }

    #[test]
    fn serde_roundtrip_registry() {
        let mut reg = TypeRegistry::new();
        reg.register(Ty::Array {
            element: TypeId::INT,
            length: 5,
        });
        let json = serde_json::to_string(&reg).unwrap();
        let back: TypeRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(reg, back);
    }
}
